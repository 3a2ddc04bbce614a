use std::sync::Arc;

use ahash::AHashSet;
use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    dialect::{Dialect, DialectRegistry},
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    types::NodeType,
    walker::{SchemaListener, SchemaWalker},
    Error,
};

/// Structural validation of a schema document.
///
/// Per node the state machine is: if the node is not an object, report a
/// not-a-schema error and stop recursing into that subtree only; if it
/// is, warn once about unknown members (sorted), run every supported
/// keyword's checker in lexicographic order, then recurse into the
/// subschema pointers those checkers accumulated. Traversal is driven by
/// the generic walker with the checkers as the child-enumeration
/// strategy, so ill-typed keywords are never recursed into.
pub struct SyntaxProcessor {
    registry: Arc<DialectRegistry>,
}

impl SyntaxProcessor {
    #[must_use]
    pub fn new(registry: Arc<DialectRegistry>) -> SyntaxProcessor {
        SyntaxProcessor { registry }
    }

    /// A processor over the shipped dialects.
    #[must_use]
    pub fn with_default_dialects() -> SyntaxProcessor {
        SyntaxProcessor::new(Arc::new(DialectRegistry::with_defaults()))
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DialectRegistry> {
        &self.registry
    }

    /// Check the subtree rooted at `tree`'s current position, appending
    /// diagnostics to `report`. Returns every document pointer visited.
    ///
    /// The dialect is selected from the document's `$schema` member,
    /// falling back to the registry's default.
    ///
    /// # Errors
    ///
    /// Fails only when a report message reaches the raise threshold.
    pub fn check(
        &self,
        tree: &SchemaTree,
        report: &mut ProcessingReport,
    ) -> Result<AHashSet<JsonPointer>, Error> {
        let dialect = self.registry.select(tree.root()).as_ref();
        let walker = SchemaWalker::with_children(|tree: &SchemaTree, report: &mut ProcessingReport| {
            check_node(dialect, tree, report)
        });
        let mut visited = VisitedPointers::default();
        walker.walk(tree, &mut visited, report)?;
        Ok(visited.into_output())
    }
}

/// Records the document position of every visited subtree.
#[derive(Default)]
struct VisitedPointers {
    pointers: AHashSet<JsonPointer>,
}

impl SchemaListener for VisitedPointers {
    type Output = AHashSet<JsonPointer>;

    fn visiting(&mut self, tree: &SchemaTree, _report: &mut ProcessingReport) -> Result<(), Error> {
        self.pointers.insert(tree.pointer().clone());
        Ok(())
    }

    fn into_output(self) -> AHashSet<JsonPointer> {
        self.pointers
    }
}

/// One step of the state machine: diagnostics for the current node, and
/// the subschema pointers to recurse into.
fn check_node(
    dialect: &Dialect,
    tree: &SchemaTree,
    report: &mut ProcessingReport,
) -> Result<Vec<JsonPointer>, Error> {
    let Value::Object(map) = tree.current() else {
        report.error(
            ProcessingMessage::new("document is not a schema")
                .with("schema", tree.pointer().to_string())
                .with("found", NodeType::of(tree.current()).as_str()),
        )?;
        return Ok(Vec::new());
    };
    let mut unknown: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|member| !dialect.supports(member))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        report.warning(
            ProcessingMessage::new("unknown keywords found; ignored")
                .with("schema", tree.pointer().to_string())
                .with("ignored", unknown),
        )?;
    }
    let mut pointers = Vec::new();
    for (keyword, checker) in dialect.checkers() {
        if map.contains_key(keyword) {
            checker.check(keyword, tree, report, &mut pointers)?;
        }
    }
    Ok(pointers)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::{
        report::{LogLevel, ProcessingReport},
        tree::SchemaTree,
    };

    use super::SyntaxProcessor;

    fn check(document: Value) -> ProcessingReport {
        let processor = SyntaxProcessor::with_default_dialects();
        let tree = SchemaTree::anonymous(document);
        let mut report = ProcessingReport::new();
        processor.check(&tree, &mut report).unwrap();
        report
    }

    #[test]
    fn empty_schema_is_valid() {
        let report = check(json!({}));
        assert!(report.is_success());
        assert!(report.is_empty());
    }

    #[test]
    fn non_object_root_is_rejected_without_recursion() {
        let report = check(json!([1, 2]));
        assert_eq!(report.len(), 1);
        let message = report.iter().next().unwrap();
        assert_eq!(message.level(), LogLevel::Error);
        assert_eq!(message.field("found"), Some(&json!("array")));
    }

    #[test]
    fn unknown_keywords_are_listed_sorted() {
        let report = check(json!({"foo": 1, "bar": 1}));
        assert_eq!(report.len(), 1);
        let message = report.iter().next().unwrap();
        assert_eq!(message.level(), LogLevel::Warning);
        assert_eq!(message.field("ignored"), Some(&json!(["bar", "foo"])));
    }

    #[test]
    fn nested_subschemas_are_checked() {
        let report = check(json!({
            "properties": {
                "a": {"type": "nonsense"},
                "b": {"items": "oops"}
            }
        }));
        assert!(!report.is_success());
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn non_object_subschema_halts_its_subtree_only() {
        let report = check(json!({
            "properties": {
                "bad": [],
                "good": {"not": {"type": "string"}}
            }
        }));
        assert_eq!(report.len(), 1);
        let message = report.iter().next().unwrap();
        assert_eq!(message.field("schema"), Some(&json!("/properties/bad")));
    }

    #[test]
    fn ill_typed_keywords_are_not_recursed_into() {
        // A well-formed subschema under an ill-typed "not" would add a
        // second message if recursed into.
        let report = check(json!({"not": [{"type": 42}]}));
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn dialect_is_selected_from_the_document() {
        let draft3_only = json!({
            "$schema": "http://json-schema.org/draft-03/schema#",
            "divisibleBy": 2
        });
        assert!(check(draft3_only).is_success());
        let under_draft4 = json!({"divisibleBy": 2});
        let report = check(under_draft4);
        assert_eq!(report.len(), 1);
        assert_eq!(report.iter().next().unwrap().level(), LogLevel::Warning);
    }

    #[test]
    fn diagnostics_are_deterministic() {
        let document = json!({
            "zeta": 1,
            "alpha": 1,
            "properties": {"b": {"pattern": "["}, "a": {"enum": []}}
        });
        let first: Vec<String> = check(document.clone())
            .iter()
            .map(|message| message.as_json().to_string())
            .collect();
        let second: Vec<String> = check(document)
            .iter()
            .map(|message| message.as_json().to_string())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn raise_threshold_aborts_checking() {
        let processor = SyntaxProcessor::with_default_dialects();
        let tree = SchemaTree::anonymous(json!({"enum": []}));
        let mut report = ProcessingReport::with_levels(LogLevel::Info, LogLevel::Error);
        assert!(processor.check(&tree, &mut report).is_err());
    }
}
