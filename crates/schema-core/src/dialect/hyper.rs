use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    types::{NodeType, TypeSet},
    Error,
};

use super::{draft4, Dialect, KeywordChecker, PointerCollector};

pub(super) const LOCATOR: &str = "http://json-schema.org/draft-04/hyper-schema#";

/// Link-description object members holding subschemas.
const LDO_SCHEMAS: [&str; 2] = ["schema", "targetSchema"];

/// The draft 4 hyper-schema dialect: the draft 4 core keywords plus the
/// hyperlink extension (`links`, `media`, `readOnly`).
#[must_use]
pub fn draft4_hyper_schema() -> Dialect {
    build().expect("hyper-schema keyword table is statically well-formed")
}

fn build() -> Result<Dialect, Error> {
    draft4::core(LOCATOR)?
        .keyword(
            "readOnly",
            KeywordChecker::new(TypeSet::of(NodeType::Boolean)),
        )?
        .keyword(
            "media",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::Object), refine_media),
        )?
        .keyword_with_collector(
            "links",
            KeywordChecker::with_refinement(TypeSet::of(NodeType::Array), refine_links),
            links_collector(),
        )?
        .build()
}

fn links_collector() -> PointerCollector {
    std::sync::Arc::new(|keyword: &str, tree: &SchemaTree| {
        let Some(Value::Array(links)) = tree.current().get(keyword) else {
            return Vec::new();
        };
        let mut pointers = Vec::new();
        for (index, link) in links.iter().enumerate() {
            for member in LDO_SCHEMAS {
                if link.get(member).is_some_and(Value::is_object) {
                    pointers.push(
                        JsonPointer::root()
                            .append(keyword)
                            .append_index(index)
                            .append(member),
                    );
                }
            }
        }
        pointers
    })
}

/// Checks each link-description object: `href` and `rel` are required
/// strings, `href` must be a URI template, and the MIME-typed members
/// must hold media types.
fn refine_links(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Array(links)) = tree.current().get(keyword) else {
        return Ok(());
    };
    for (index, link) in links.iter().enumerate() {
        let Value::Object(ldo) = link else {
            report.error(
                ProcessingMessage::new("array element has incorrect type")
                    .with("keyword", keyword)
                    .with("index", index)
                    .with("found", NodeType::of(link).as_str())
                    .with("expected", vec!["object"]),
            )?;
            continue;
        };
        for required in ["href", "rel"] {
            match ldo.get(required) {
                None => report.error(
                    ProcessingMessage::new("link description object misses a required member")
                        .with("keyword", keyword)
                        .with("index", index)
                        .with("required", required),
                )?,
                Some(Value::String(value)) => {
                    if required == "href" && !is_uri_template(value) {
                        report.error(
                            ProcessingMessage::new("href is not a valid URI template")
                                .with("keyword", keyword)
                                .with("index", index)
                                .with("found", value.as_str()),
                        )?;
                    }
                }
                Some(other) => report.error(
                    ProcessingMessage::new("link description member has incorrect type")
                        .with("keyword", keyword)
                        .with("index", index)
                        .with("member", required)
                        .with("found", NodeType::of(other).as_str())
                        .with("expected", vec!["string"]),
                )?,
            }
        }
        for mime in ["mediaType", "encType"] {
            check_media_type(keyword, ldo.get(mime), mime, report)?;
        }
        for member in LDO_SCHEMAS {
            if ldo.get(member).is_some_and(Value::is_object) {
                pointers.push(
                    JsonPointer::root()
                        .append(keyword)
                        .append_index(index)
                        .append(member),
                );
            }
        }
    }
    Ok(())
}

fn refine_media(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Object(media)) = tree.current().get(keyword) else {
        return Ok(());
    };
    check_media_type(keyword, media.get("type"), "type", report)?;
    if let Some(encoding) = media.get("binaryEncoding") {
        if !encoding.is_string() {
            report.error(
                ProcessingMessage::new("media member has incorrect type")
                    .with("keyword", keyword)
                    .with("member", "binaryEncoding")
                    .with("found", NodeType::of(encoding).as_str())
                    .with("expected", vec!["string"]),
            )?;
        }
    }
    Ok(())
}

fn check_media_type(
    keyword: &str,
    value: Option<&Value>,
    member: &str,
    report: &mut ProcessingReport,
) -> Result<(), Error> {
    match value {
        None => Ok(()),
        Some(Value::String(media_type)) => {
            if !is_media_type(media_type) {
                report.error(
                    ProcessingMessage::new("value is not a valid media type")
                        .with("keyword", keyword)
                        .with("member", member)
                        .with("found", media_type.as_str()),
                )?;
            }
            Ok(())
        }
        Some(other) => report.error(
            ProcessingMessage::new("media type member has incorrect type")
                .with("keyword", keyword)
                .with("member", member)
                .with("found", NodeType::of(other).as_str())
                .with("expected", vec!["string"]),
        ),
    }
}

/// RFC 6570 shape check: balanced, non-nested braces with non-empty
/// template expressions.
fn is_uri_template(candidate: &str) -> bool {
    let mut expression = false;
    let mut length = 0usize;
    for ch in candidate.chars() {
        match ch {
            '{' => {
                if expression {
                    return false;
                }
                expression = true;
                length = 0;
            }
            '}' => {
                if !expression || length == 0 {
                    return false;
                }
                expression = false;
            }
            _ => length += 1,
        }
    }
    !expression
}

/// `type/subtype` with both parts non-empty HTTP token text.
fn is_media_type(candidate: &str) -> bool {
    let Some((main, sub)) = candidate.split_once('/') else {
        return false;
    };
    let token = |part: &str| {
        !part.is_empty()
            && part.chars().all(|ch| {
                ch.is_ascii_alphanumeric()
                    || matches!(
                        ch,
                        '!' | '#' | '$' | '&' | '\'' | '*' | '+' | '-' | '.' | '^' | '_' | '`'
                            | '|' | '~'
                    )
            })
    };
    token(main) && token(sub)
}
