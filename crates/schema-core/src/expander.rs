use jsonref::JsonPointer;
use serde_json::Value;

use crate::{
    dialect::Dialect,
    report::ProcessingReport,
    resolver::RefResolver,
    tree::{Dereferencing, SchemaTree},
    walker::{SchemaListener, SchemaWalker},
    Error,
};

/// Rewrites a schema into a self-contained document by inlining every
/// resolved reference, producing a tree that dereferences in
/// [`Inline`](Dereferencing::Inline) mode.
///
/// The listener keeps an explicit stack of `(path, node)` pairs: a node
/// is pushed when its path is entered, captured from the resolved tree
/// when visited, and spliced into its parent when the path is exited.
/// The exact enter/exit pairing of the walker is what keeps the stack
/// consistent at any recursion depth.
///
/// Schemas whose reference chains re-enter an expanded subtree do not
/// terminate under expansion; run plain syntax analysis on those.
pub struct SchemaExpander {
    loading_ref: jsonref::JsonRef,
    stack: Vec<(JsonPointer, Value)>,
    result: Value,
}

impl SchemaExpander {
    /// An expander producing a document rooted at `tree`'s current node.
    #[must_use]
    pub fn new(tree: &SchemaTree) -> SchemaExpander {
        SchemaExpander {
            loading_ref: tree.loading_ref().clone(),
            stack: Vec::new(),
            result: tree.current().clone(),
        }
    }

    /// Walk `tree` with a resolving walker and return the expanded,
    /// inline-dereferencing tree.
    ///
    /// # Errors
    ///
    /// Propagates reference-resolution failures and raised report
    /// messages.
    pub fn expand(
        tree: &SchemaTree,
        dialect: &Dialect,
        resolver: &RefResolver,
        report: &mut ProcessingReport,
    ) -> Result<SchemaTree, Error> {
        let mut expander = SchemaExpander::new(tree);
        SchemaWalker::new(dialect)
            .resolving(resolver)
            .walk(tree, &mut expander, report)?;
        Ok(expander.into_output())
    }
}

impl SchemaListener for SchemaExpander {
    type Output = SchemaTree;

    fn entering_path(
        &mut self,
        path: &JsonPointer,
        _report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        self.stack.push((path.clone(), Value::Null));
        Ok(())
    }

    fn visiting(&mut self, tree: &SchemaTree, _report: &mut ProcessingReport) -> Result<(), Error> {
        // Where a reference was followed this captures the resolved
        // node; everywhere else it is the node the parent already holds.
        if let Some((_, node)) = self.stack.last_mut() {
            *node = tree.current().clone();
        }
        Ok(())
    }

    fn exiting_path(
        &mut self,
        path: &JsonPointer,
        _report: &mut ProcessingReport,
    ) -> Result<(), Error> {
        let Some((entered, node)) = self.stack.pop() else {
            return Err(Error::config(format!(
                "unbalanced traversal: exited '{path}' with an empty stack"
            )));
        };
        if entered != *path {
            return Err(Error::config(format!(
                "unbalanced traversal: entered '{entered}' but exited '{path}'"
            )));
        }
        match self.stack.last_mut() {
            None => self.result = node,
            Some((parent_path, parent_node)) => {
                let relative = path
                    .strip_prefix(parent_path)
                    .unwrap_or_else(JsonPointer::root);
                if let Some(slot) = relative.get_mut(parent_node) {
                    *slot = node;
                }
            }
        }
        Ok(())
    }

    fn into_output(self) -> SchemaTree {
        SchemaTree::with_mode(self.result, self.loading_ref, Dereferencing::Inline)
    }
}

#[cfg(test)]
mod tests {
    use jsonref::JsonRef;
    use serde_json::{json, Value};

    use crate::{
        dialect,
        report::ProcessingReport,
        resolver::RefResolver,
        tree::{Dereferencing, SchemaTree},
        Error,
    };

    use super::SchemaExpander;

    fn expand(document: Value) -> Result<SchemaTree, Error> {
        let dialect = dialect::draft4();
        let resolver = RefResolver::default();
        let tree = SchemaTree::new(document, JsonRef::parse("http://example.com/s").unwrap());
        let mut report = ProcessingReport::new();
        SchemaExpander::expand(&tree, &dialect, &resolver, &mut report)
    }

    #[test]
    fn reference_free_documents_are_unchanged() {
        let document = json!({
            "properties": {"a": {"type": "string"}},
            "minProperties": 1
        });
        let expanded = expand(document.clone()).unwrap();
        assert_eq!(expanded.root(), &document);
        assert_eq!(expanded.mode(), Dereferencing::Inline);
    }

    #[test]
    fn local_references_are_inlined() {
        let expanded = expand(json!({
            "properties": {"a": {"$ref": "#/definitions/target"}},
            "definitions": {"target": {"type": "string"}}
        }))
        .unwrap();
        assert_eq!(
            expanded.root().get("properties").unwrap().get("a").unwrap(),
            &json!({"type": "string"})
        );
        // The definition itself stays in place
        assert_eq!(
            expanded
                .root()
                .get("definitions")
                .unwrap()
                .get("target")
                .unwrap(),
            &json!({"type": "string"})
        );
    }

    #[test]
    fn nested_references_are_fully_expanded() {
        let expanded = expand(json!({
            "not": {"$ref": "#/definitions/a"},
            "definitions": {
                "a": {"items": {"$ref": "#/definitions/b"}},
                "b": {"type": "null"}
            }
        }))
        .unwrap();
        assert_eq!(
            expanded.root().get("not").unwrap(),
            &json!({"items": {"type": "null"}})
        );
    }

    #[test]
    fn expansion_failures_propagate() {
        let error = expand(json!({"not": {"$ref": "#/missing"}})).unwrap_err();
        assert!(matches!(error, Error::DanglingRef { .. }));
    }

    #[test]
    fn expanded_trees_satisfy_references_by_pointer() {
        let expanded = expand(json!({"definitions": {"a": {}}})).unwrap();
        assert!(expanded.contains(&JsonRef::parse("http://elsewhere.org/x#/definitions/a").unwrap()));
    }
}
