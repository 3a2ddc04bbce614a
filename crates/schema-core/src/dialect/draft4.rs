use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    types::{NodeType, TypeSet},
    Error,
};

use super::{common, Dialect, KeywordChecker};

pub(super) const LOCATOR: &str = "http://json-schema.org/draft-04/schema#";

/// The draft 4 core dialect.
///
/// Builder calls cannot fail here: the keyword set is static and free of
/// duplicates, so the panic paths are unreachable.
#[must_use]
pub fn draft4() -> Dialect {
    core(LOCATOR)
        .and_then(super::DialectBuilder::build)
        .expect("draft 4 keyword table is statically well-formed")
}

/// The draft 4 keyword table under an arbitrary dialect locator, so the
/// hyper-schema dialect can extend it.
pub(super) fn core(locator: &str) -> Result<super::DialectBuilder, Error> {
    let any = KeywordChecker::new(TypeSet::any());
    let string = KeywordChecker::new(TypeSet::of(NodeType::String));
    let boolean = KeywordChecker::new(TypeSet::of(NodeType::Boolean));
    let number = KeywordChecker::with_refinement(
        TypeSet::of(NodeType::Number),
        common::refine_positive_number,
    );
    let bound = KeywordChecker::new(TypeSet::of(NodeType::Number));
    let size = KeywordChecker::with_refinement(
        TypeSet::of(NodeType::Integer),
        common::refine_non_negative_integer,
    );
    let schema = KeywordChecker::with_refinement(TypeSet::of(NodeType::Object), common::refine_self);
    let schema_map =
        KeywordChecker::with_refinement(TypeSet::of(NodeType::Object), common::refine_member_map);
    let schema_array =
        KeywordChecker::with_refinement(TypeSet::of(NodeType::Array), common::refine_schema_array);

    Dialect::builder(locator)
        .keyword("$ref", string.clone())?
        .keyword("$schema", string.clone())?
        .keyword("id", string.clone())?
        .keyword("title", string.clone())?
        .keyword("description", string.clone())?
        .keyword("default", any)?
        .keyword("format", string.clone())?
        .keyword("multipleOf", number)?
        .keyword("maximum", bound.clone())?
        .keyword("minimum", bound)?
        .keyword("exclusiveMaximum", boolean.clone())?
        .keyword("exclusiveMinimum", boolean.clone())?
        .keyword("maxLength", size.clone())?
        .keyword("minLength", size.clone())?
        .keyword("maxItems", size.clone())?
        .keyword("minItems", size.clone())?
        .keyword("maxProperties", size.clone())?
        .keyword("minProperties", size)?
        .keyword("uniqueItems", boolean)?
        .keyword(
            "pattern",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::String), common::refine_regex),
        )?
        .keyword(
            "enum",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::Array), common::refine_enum),
        )?
        .keyword("required", KeywordChecker::with_refinement(
            TypeSet::of(NodeType::Array),
            refine_required,
        ))?
        .keyword("type", KeywordChecker::with_refinement(
            TypeSet::of(NodeType::String).and(NodeType::Array),
            refine_type,
        ))?
        .keyword_with_collector(
            "items",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object).and(NodeType::Array),
                common::refine_schema_or_array,
            ),
            common::schema_or_array_collector(),
        )?
        .keyword_with_collector(
            "additionalItems",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Boolean).and(NodeType::Object),
                common::refine_additional_items,
            ),
            common::additional_items_collector(),
        )?
        .keyword_with_collector(
            "additionalProperties",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Boolean).and(NodeType::Object),
                common::refine_self_when_object,
            ),
            common::object_collector(),
        )?
        .keyword_with_collector("not", schema, common::self_collector())?
        .keyword_with_collector("properties", schema_map.clone(), common::member_collector())?
        .keyword_with_collector("definitions", schema_map, common::member_collector())?
        .keyword_with_collector(
            "patternProperties",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object),
                common::refine_pattern_properties,
            ),
            common::member_collector(),
        )?
        .keyword_with_collector("allOf", schema_array.clone(), common::array_collector())?
        .keyword_with_collector("anyOf", schema_array.clone(), common::array_collector())?
        .keyword_with_collector("oneOf", schema_array, common::array_collector())?
        .keyword_with_collector(
            "dependencies",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object),
                refine_dependencies,
            ),
            common::object_member_collector(),
        )
}

fn refine_required(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Array(elements)) = tree.current().get(keyword) else {
        return Ok(());
    };
    if elements.is_empty() {
        return report.error(
            ProcessingMessage::new("array must have at least one element").with("keyword", keyword),
        );
    }
    for (index, element) in elements.iter().enumerate() {
        if !element.is_string() {
            report.error(
                ProcessingMessage::new("array element has incorrect type")
                    .with("keyword", keyword)
                    .with("index", index)
                    .with("found", NodeType::of(element).as_str())
                    .with("expected", vec!["string"]),
            )?;
        } else if elements[..index].contains(element) {
            report.error(
                ProcessingMessage::new("array must not contain duplicate elements")
                    .with("keyword", keyword),
            )?;
        }
    }
    Ok(())
}

fn refine_type(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    match tree.current().get(keyword) {
        Some(Value::String(name)) => check_type_name(keyword, name, report),
        Some(Value::Array(elements)) => {
            for (index, element) in elements.iter().enumerate() {
                match element.as_str() {
                    Some(name) => {
                        if elements[..index].contains(element) {
                            report.error(
                                ProcessingMessage::new(
                                    "array must not contain duplicate elements",
                                )
                                .with("keyword", keyword),
                            )?;
                        } else {
                            check_type_name(keyword, name, report)?;
                        }
                    }
                    None => report.error(
                        ProcessingMessage::new("array element has incorrect type")
                            .with("keyword", keyword)
                            .with("index", index)
                            .with("found", NodeType::of(element).as_str())
                            .with("expected", vec!["string"]),
                    )?,
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_type_name(
    keyword: &str,
    name: &str,
    report: &mut ProcessingReport,
) -> Result<(), Error> {
    // "any" is draft 3 only
    if name == "any" || !common::is_type_name(name) {
        report.error(
            ProcessingMessage::new("unknown primitive type")
                .with("keyword", keyword)
                .with("found", name),
        )?;
    }
    Ok(())
}

fn refine_dependencies(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Object(map)) = tree.current().get(keyword) else {
        return Ok(());
    };
    let mut members: Vec<_> = map.iter().collect();
    members.sort_by_key(|(member, _)| member.as_str());
    for (member, value) in members {
        match value {
            Value::Object(_) => {
                pointers.push(JsonPointer::root().append(keyword).append(member.clone()));
            }
            Value::Array(names) => {
                if names.is_empty() {
                    report.error(
                        ProcessingMessage::new("array must have at least one element")
                            .with("keyword", keyword)
                            .with("property", member.as_str()),
                    )?;
                }
                for (index, name) in names.iter().enumerate() {
                    if !name.is_string() {
                        report.error(
                            ProcessingMessage::new("array element has incorrect type")
                                .with("keyword", keyword)
                                .with("property", member.as_str())
                                .with("index", index)
                                .with("found", NodeType::of(name).as_str())
                                .with("expected", vec!["string"]),
                        )?;
                    } else if names[..index].contains(name) {
                        report.error(
                            ProcessingMessage::new("array must not contain duplicate elements")
                                .with("keyword", keyword)
                                .with("property", member.as_str()),
                        )?;
                    }
                }
            }
            other => report.error(
                ProcessingMessage::new("dependency value has incorrect type")
                    .with("keyword", keyword)
                    .with("property", member.as_str())
                    .with("found", NodeType::of(other).as_str())
                    .with("expected", vec!["array", "object"]),
            )?,
        }
    }
    Ok(())
}
