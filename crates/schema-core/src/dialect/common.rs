//! Keyword shapes shared between the shipped dialects.
//!
//! Each refinement stays shape-consistent with the matching collector:
//! both emit the same pointers for a well-formed value, and a refinement
//! never emits pointers for positions the collector would not visit.

use std::sync::Arc;

use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    Error,
};

use super::PointerCollector;

fn value_of<'a>(keyword: &str, tree: &'a SchemaTree) -> Option<&'a Value> {
    tree.current().get(keyword)
}

fn self_pointer(keyword: &str) -> JsonPointer {
    JsonPointer::root().append(keyword)
}

fn sorted_members(map: &serde_json::Map<String, Value>) -> Vec<&String> {
    let mut members: Vec<_> = map.keys().collect();
    members.sort();
    members
}

/// Deep equality with numeric-type-insensitive number comparison, so
/// `1` and `1.0` count as equal.
pub(super) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| json_equal(a, b)))
        }
        _ => a == b,
    }
}

/// Integral numbers compare exactly; doubles lose precision past 2^53,
/// so `as_f64` is only a fallback when a genuine float is involved.
fn numbers_equal(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        a == b
    } else if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        a == b
    } else if x.is_f64() || y.is_f64() {
        x.as_f64() == y.as_f64()
    } else {
        // Integers of opposite sign outside the shared i64 range.
        false
    }
}

// Collectors

/// The keyword value is itself a subschema.
pub(super) fn self_collector() -> PointerCollector {
    Arc::new(|keyword: &str, _: &SchemaTree| vec![self_pointer(keyword)])
}

/// The keyword value is a subschema only when object-shaped
/// (boolean-or-schema keywords).
pub(super) fn object_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Object(_)) => vec![self_pointer(keyword)],
        _ => Vec::new(),
    })
}

/// One subschema per array element.
pub(super) fn array_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Array(elements)) => (0..elements.len())
            .map(|index| self_pointer(keyword).append_index(index))
            .collect(),
        _ => Vec::new(),
    })
}

/// One subschema per object member, in lexicographic member-name order.
pub(super) fn member_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Object(map)) => sorted_members(map)
            .into_iter()
            .map(|member| self_pointer(keyword).append(member.clone()))
            .collect(),
        _ => Vec::new(),
    })
}

/// Schema-or-array-of-schemas keywords: the emitted shape depends on the
/// value's runtime type.
pub(super) fn schema_or_array_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Object(_)) => vec![self_pointer(keyword)],
        Some(Value::Array(elements)) => (0..elements.len())
            .map(|index| self_pointer(keyword).append_index(index))
            .collect(),
        _ => Vec::new(),
    })
}

/// One subschema per object-valued member (dependencies keywords, where
/// the other member shapes are not schemas).
pub(super) fn object_member_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Object(map)) => sorted_members(map)
            .into_iter()
            .filter(|member| map[member.as_str()].is_object())
            .map(|member| self_pointer(keyword).append(member.clone()))
            .collect(),
        _ => Vec::new(),
    })
}

/// One subschema per object-valued array element (draft 3 union types
/// with embedded schemas).
pub(super) fn object_element_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| match value_of(keyword, tree) {
        Some(Value::Array(elements)) => elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.is_object())
            .map(|(index, _)| self_pointer(keyword).append_index(index))
            .collect(),
        _ => Vec::new(),
    })
}

/// The additional-items subschema counts only when the value is a schema
/// and the sibling `items` is object-shaped rather than an array.
pub(super) fn additional_items_collector() -> PointerCollector {
    Arc::new(|keyword: &str, tree: &SchemaTree| {
        let node = tree.current();
        let applicable = node.get(keyword).is_some_and(Value::is_object)
            && node.get("items").is_some_and(Value::is_object);
        if applicable {
            vec![self_pointer(keyword)]
        } else {
            Vec::new()
        }
    })
}

// Refinements

pub(super) fn refine_self(
    keyword: &str,
    _tree: &SchemaTree,
    _report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    pointers.push(self_pointer(keyword));
    Ok(())
}

pub(super) fn refine_self_when_object(
    keyword: &str,
    tree: &SchemaTree,
    _report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    if value_of(keyword, tree).is_some_and(Value::is_object) {
        pointers.push(self_pointer(keyword));
    }
    Ok(())
}

pub(super) fn refine_positive_number(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let positive = value_of(keyword, tree)
        .and_then(Value::as_f64)
        .is_some_and(|divisor| divisor > 0.0);
    if !positive {
        report.error(
            ProcessingMessage::new("divisor must be strictly positive").with("keyword", keyword),
        )?;
    }
    Ok(())
}

pub(super) fn refine_non_negative_integer(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    // as_u64 covers integral bounds past i64::MAX and is never Some for
    // a negative value.
    let non_negative = value_of(keyword, tree)
        .and_then(Value::as_u64)
        .is_some();
    if !non_negative {
        report.error(
            ProcessingMessage::new("bound must not be negative").with("keyword", keyword),
        )?;
    }
    Ok(())
}

pub(super) fn refine_regex(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    if let Some(pattern) = value_of(keyword, tree).and_then(Value::as_str) {
        if fancy_regex::Regex::new(pattern).is_err() {
            report.error(
                ProcessingMessage::new("value is not a valid regular expression")
                    .with("keyword", keyword)
                    .with("pattern", pattern),
            )?;
        }
    }
    Ok(())
}

pub(super) fn refine_enum(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    _pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Array(elements)) = value_of(keyword, tree) else {
        return Ok(());
    };
    if elements.is_empty() {
        return report.error(
            ProcessingMessage::new("array must have at least one element").with("keyword", keyword),
        );
    }
    for (index, element) in elements.iter().enumerate() {
        if elements[..index].iter().any(|seen| json_equal(seen, element)) {
            return report.error(
                ProcessingMessage::new("array must not contain duplicate elements")
                    .with("keyword", keyword),
            );
        }
    }
    Ok(())
}

/// Disjunction-list keywords: a non-empty array with one subschema per
/// element. Non-object elements surface as not-a-schema errors when the
/// walker recurses into them.
pub(super) fn refine_schema_array(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let Some(Value::Array(elements)) = value_of(keyword, tree) else {
        return Ok(());
    };
    if elements.is_empty() {
        return report.error(
            ProcessingMessage::new("array must have at least one element").with("keyword", keyword),
        );
    }
    for index in 0..elements.len() {
        pointers.push(self_pointer(keyword).append_index(index));
    }
    Ok(())
}

/// Named-subschema-map keywords: one subschema per member, sorted, with
/// no further checks.
pub(super) fn refine_member_map(
    keyword: &str,
    tree: &SchemaTree,
    _report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    if let Some(Value::Object(map)) = value_of(keyword, tree) {
        for member in sorted_members(map) {
            pointers.push(self_pointer(keyword).append(member.clone()));
        }
    }
    Ok(())
}

pub(super) fn refine_pattern_properties(
    keyword: &str,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    if let Some(Value::Object(map)) = value_of(keyword, tree) {
        for member in sorted_members(map) {
            if fancy_regex::Regex::new(member).is_err() {
                report.error(
                    ProcessingMessage::new("member name is not a valid regular expression")
                        .with("keyword", keyword)
                        .with("pattern", member.as_str()),
                )?;
            }
            pointers.push(self_pointer(keyword).append(member.clone()));
        }
    }
    Ok(())
}

pub(super) fn refine_schema_or_array(
    keyword: &str,
    tree: &SchemaTree,
    _report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    match value_of(keyword, tree) {
        Some(Value::Object(_)) => pointers.push(self_pointer(keyword)),
        Some(Value::Array(elements)) => {
            for index in 0..elements.len() {
                pointers.push(self_pointer(keyword).append_index(index));
            }
        }
        _ => {}
    }
    Ok(())
}

pub(super) fn refine_additional_items(
    keyword: &str,
    tree: &SchemaTree,
    _report: &mut ProcessingReport,
    pointers: &mut Vec<JsonPointer>,
) -> Result<(), Error> {
    let node = tree.current();
    if node.get(keyword).is_some_and(Value::is_object)
        && node.get("items").is_some_and(Value::is_object)
    {
        pointers.push(self_pointer(keyword));
    }
    Ok(())
}

pub(super) const TYPE_NAMES: [&str; 8] = [
    "any", "array", "boolean", "integer", "null", "number", "object", "string",
];

pub(super) fn is_type_name(candidate: &str) -> bool {
    TYPE_NAMES.contains(&candidate)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::json_equal;

    #[test]
    fn numbers_compare_by_value() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!([1, "a"]), &json!([1.0, "a"])));
        assert!(json_equal(&json!({"a": 2}), &json!({"a": 2.0})));
        assert!(!json_equal(&json!(1), &json!(2)));
        assert!(!json_equal(&json!({"a": 1}), &json!({"b": 1})));
    }

    #[test]
    fn large_integers_compare_exactly() {
        // Adjacent integers past 2^53 collapse to the same double.
        assert!(!json_equal(
            &json!(9_007_199_254_740_993_i64),
            &json!(9_007_199_254_740_992_i64)
        ));
        assert!(json_equal(
            &json!(9_007_199_254_740_993_i64),
            &json!(9_007_199_254_740_993_i64)
        ));
        assert!(!json_equal(&json!(-1), &json!(18_446_744_073_709_551_615_u64)));
        assert!(json_equal(
            &json!(18_446_744_073_709_551_615_u64),
            &json!(18_446_744_073_709_551_615_u64)
        ));
    }
}
