use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    types::{NodeType, TypeSet},
    Error,
};

use super::{common, Dialect, KeywordChecker};

pub(super) const LOCATOR: &str = "http://json-schema.org/draft-03/schema#";

/// The draft 3 core dialect.
#[must_use]
pub fn draft3() -> Dialect {
    build().expect("draft 3 keyword table is statically well-formed")
}

fn build() -> Result<Dialect, Error> {
    let any = KeywordChecker::new(TypeSet::any());
    let string = KeywordChecker::new(TypeSet::of(NodeType::String));
    let boolean = KeywordChecker::new(TypeSet::of(NodeType::Boolean));
    let bound = KeywordChecker::new(TypeSet::of(NodeType::Number));
    let size = KeywordChecker::with_refinement(
        TypeSet::of(NodeType::Integer),
        common::refine_non_negative_integer,
    );
    let schema_map =
        KeywordChecker::with_refinement(TypeSet::of(NodeType::Object), common::refine_member_map);
    let union_type = KeywordChecker::with_refinement(
        TypeSet::of(NodeType::String).and(NodeType::Array),
        refine_union_type,
    );

    Dialect::builder(LOCATOR)
        .keyword("$ref", string.clone())?
        .keyword("$schema", string.clone())?
        .keyword("id", string.clone())?
        .keyword("title", string.clone())?
        .keyword("description", string.clone())?
        .keyword("default", any)?
        .keyword("format", string)?
        .keyword(
            "divisibleBy",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Number),
                common::refine_positive_number,
            ),
        )?
        .keyword("maximum", bound.clone())?
        .keyword("minimum", bound)?
        .keyword("exclusiveMaximum", boolean.clone())?
        .keyword("exclusiveMinimum", boolean.clone())?
        .keyword("maxLength", size.clone())?
        .keyword("minLength", size.clone())?
        .keyword("maxItems", size.clone())?
        .keyword("minItems", size)?
        .keyword("uniqueItems", boolean.clone())?
        .keyword("required", boolean)?
        .keyword(
            "pattern",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::String), common::refine_regex),
        )?
        .keyword(
            "enum",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::Array), common::refine_enum),
        )?
        .keyword_with_collector(
            "type",
            union_type.clone(),
            common::object_element_collector(),
        )?
        .keyword_with_collector("disallow", union_type, common::object_element_collector())?
        .keyword_with_collector(
            "items",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object).and(NodeType::Array),
                common::refine_schema_or_array,
            ),
            common::schema_or_array_collector(),
        )?
        .keyword_with_collector(
            "extends",
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
        .keyword_with_collector("properties", schema_map, common::member_collector())?
        .keyword_with_collector(
            "patternProperties",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object),
                common::refine_pattern_properties,
            ),
            common::member_collector(),
        )?
        .keyword_with_collector(
            "dependencies",
            KeywordChecker::with_refinement(
                TypeSet::of(NodeType::Object),
                refine_dependencies,
            ),
            common::object_member_collector(),
        )?
        .build()
}

/// Draft 3 union types: a primitive type name, or an array mixing type
/// names and embedded schemas.
fn refine_union_type(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    match tree.current().get(keyword) {
        Some(Value::String(name)) => check_type_name(keyword, name, report),
        Some(Value::Array(elements)) => {
            for (index, element) in elements.iter().enumerate() {
                match element {
                    Value::String(name) => check_type_name(keyword, name, report)?,
                    Value::Object(_) => {
                        pointers.push(JsonPointer::root().append(keyword).append_index(index));
                    }
                    other => report.error(
                        ProcessingMessage::new("array element has incorrect type")
                            .with("keyword", keyword)
                            .with("index", index)
                            .with("found", NodeType::of(other).as_str())
                            .with("expected", vec!["object", "string"]),
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
    if !common::is_type_name(name) {
        report.error(
            ProcessingMessage::new("unknown primitive type")
                .with("keyword", keyword)
                .with("found", name),
        )?;
    }
    Ok(())
}

/// Draft 3 dependencies: a property name, an array of property names, or
/// an embedded schema, per member.
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
            Value::String(_) => {}
            Value::Object(_) => {
                pointers.push(JsonPointer::root().append(keyword).append(member.clone()));
            }
            Value::Array(names) => {
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
                    }
                }
            }
            other => report.error(
                ProcessingMessage::new("dependency value has incorrect type")
                    .with("keyword", keyword)
                    .with("property", member.as_str())
                    .with("found", NodeType::of(other).as_str())
                    .with("expected", vec!["array", "object", "string"]),
            )?,
        }
    }
    Ok(())
}
