use std::sync::Arc;

use jsonref::{uri, JsonPointer, JsonRef, UriTranslator};
use serde_json::Value;

use crate::{
    loader::{DefaultLoader, IntoLoader, SchemaLoader},
    tree::SchemaTree,
    Error,
};

/// Follows `$ref` chains from a positioned tree to the schema they
/// ultimately designate.
///
/// The algorithm is iterative so the full ordered chain of references
/// followed so far is available for loop diagnostics. Documents outside
/// the current tree are fetched through the configured loader; the loader
/// is the only potentially blocking step and is treated as a plain
/// synchronous call.
pub struct RefResolver {
    loader: Arc<dyn SchemaLoader>,
    translator: Option<UriTranslator>,
}

impl Default for RefResolver {
    fn default() -> RefResolver {
        RefResolver::new(DefaultLoader)
    }
}

impl RefResolver {
    pub fn new(loader: impl IntoLoader) -> RefResolver {
        RefResolver {
            loader: loader.into_loader(),
            translator: None,
        }
    }

    /// Apply `translator` to every resolved reference before containment
    /// and loading decisions.
    #[must_use]
    pub fn with_translator(mut self, translator: UriTranslator) -> RefResolver {
        self.translator = Some(translator);
        self
    }

    /// Resolve the `$ref` chain starting at `tree`'s current node.
    ///
    /// A node without a `$ref` member, or whose `$ref` is not a textual
    /// legal reference, terminates the chain and is returned as is.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::RefLoop`] when a resolved reference repeats,
    /// [`Error::DanglingRef`] when a reference designates a position that
    /// does not exist, and [`Error::Loader`] when a document outside the
    /// current tree cannot be fetched.
    pub fn resolve(&self, tree: SchemaTree) -> Result<SchemaTree, Error> {
        let mut tree = tree;
        let mut seen: Vec<JsonRef> = Vec::new();
        loop {
            let Some(value) = tree.current().get("$ref").and_then(Value::as_str) else {
                return Ok(tree);
            };
            let Ok(reference) = JsonRef::parse(value) else {
                return Ok(tree);
            };
            let mut resolved = tree.context_ref().resolve(&reference)?;
            if let Some(translator) = &self.translator {
                resolved = translator.translate_ref(&resolved)?;
            }
            if seen.contains(&resolved) {
                return Err(Error::ref_loop(resolved, seen));
            }
            seen.push(resolved.clone());
            if !tree.contains(&resolved) {
                tree = self.load(&resolved, &tree)?;
            }
            match tree.matching_pointer(&resolved) {
                Some(pointer) => tree = tree.set_pointer(pointer),
                None => return Err(Error::dangling(resolved)),
            }
        }
    }

    /// Fetch the document behind `reference` and anchor a fresh tree at
    /// its locator, preserving the dereferencing mode.
    fn load(&self, reference: &JsonRef, current: &SchemaTree) -> Result<SchemaTree, Error> {
        let locator = uri::parse_ref(reference.locator_str())?;
        let document = self
            .loader
            .load(&locator)
            .map_err(|source| Error::loader(reference.locator_str(), source))?;
        let loading_ref = reference.with_pointer(JsonPointer::root());
        Ok(SchemaTree::with_mode(document, loading_ref, current.mode()))
    }
}

#[cfg(test)]
mod tests {
    use jsonref::{JsonPointer, JsonRef, UriRef, UriTranslator};
    use serde_json::{json, Value};

    use crate::{
        loader::{LoadError, SchemaLoader},
        tree::SchemaTree,
        Error,
    };

    use super::RefResolver;

    struct MapLoader(Vec<(&'static str, Value)>);

    impl SchemaLoader for MapLoader {
        fn load(&self, locator: &UriRef<String>) -> Result<Value, LoadError> {
            self.0
                .iter()
                .find(|(key, _)| *key == locator.as_str())
                .map(|(_, document)| document.clone())
                .ok_or_else(|| LoadError::Other("unknown document".into()))
        }
    }

    fn tree(document: Value, locator: &str) -> SchemaTree {
        SchemaTree::new(document, JsonRef::parse(locator).unwrap())
    }

    #[test]
    fn node_without_ref_is_returned_unchanged() {
        let tree = tree(json!({"type": "object"}), "http://example.com/s");
        let resolved = RefResolver::default().resolve(tree).unwrap();
        assert_eq!(resolved.current(), &json!({"type": "object"}));
    }

    #[test]
    fn non_textual_ref_terminates_the_chain() {
        let tree = tree(json!({"$ref": 1}), "http://example.com/s");
        let resolved = RefResolver::default().resolve(tree).unwrap();
        assert_eq!(resolved.current(), &json!({"$ref": 1}));
    }

    #[test]
    fn local_chain_is_followed() {
        let tree = tree(
            json!({
                "$ref": "#/definitions/a",
                "definitions": {
                    "a": {"$ref": "#/definitions/b"},
                    "b": {"type": "string"}
                }
            }),
            "http://example.com/s",
        );
        let resolved = RefResolver::default().resolve(tree).unwrap();
        assert_eq!(resolved.current(), &json!({"type": "string"}));
        assert_eq!(
            resolved.pointer(),
            &JsonPointer::parse("/definitions/b").unwrap()
        );
    }

    #[test]
    fn self_reference_loops_with_chain_of_one() {
        let tree = tree(json!({"$ref": "#"}), "http://example.com/s");
        let error = RefResolver::default().resolve(tree).unwrap_err();
        match error {
            Error::RefLoop { chain, .. } => assert_eq!(chain.len(), 1),
            other => panic!("expected a loop error, got {other}"),
        }
    }

    #[test]
    fn two_step_loop_has_chain_of_two() {
        let tree = tree(
            json!({
                "$ref": "#/a",
                "a": {"$ref": "#/b"},
                "b": {"$ref": "#/a"}
            }),
            "http://example.com/s",
        );
        let error = RefResolver::default().resolve(tree).unwrap_err();
        match error {
            Error::RefLoop { reference, chain } => {
                assert_eq!(chain.len(), 2);
                assert_eq!(
                    reference,
                    JsonRef::parse("http://example.com/s#/a").unwrap()
                );
            }
            other => panic!("expected a loop error, got {other}"),
        }
    }

    #[test]
    fn dangling_reference_is_reported() {
        let tree = tree(json!({"$ref": "#/nonexistent"}), "http://example.com/s");
        let error = RefResolver::default().resolve(tree).unwrap_err();
        assert!(matches!(error, Error::DanglingRef { .. }));
    }

    #[test]
    fn remote_documents_are_loaded() {
        let loader = MapLoader(vec![(
            "http://example.com/other",
            json!({"definitions": {"x": {"type": "integer"}}}),
        )]);
        let tree = tree(
            json!({"$ref": "http://example.com/other#/definitions/x"}),
            "http://example.com/s",
        );
        let resolved = RefResolver::new(loader).resolve(tree).unwrap();
        assert_eq!(resolved.current(), &json!({"type": "integer"}));
        assert_eq!(
            resolved.loading_ref(),
            &JsonRef::parse("http://example.com/other").unwrap()
        );
    }

    #[test]
    fn relative_references_use_the_context() {
        let loader = MapLoader(vec![(
            "http://example.com/a/other.json",
            json!({"type": "null"}),
        )]);
        let tree = tree(
            json!({"id": "http://example.com/a/root.json", "$ref": "other.json"}),
            "http://example.com/loaded.json",
        );
        let resolved = RefResolver::new(loader).resolve(tree).unwrap();
        assert_eq!(resolved.current(), &json!({"type": "null"}));
    }

    #[test]
    fn loader_failures_carry_the_locator() {
        let tree = tree(
            json!({"$ref": "http://example.com/missing"}),
            "http://example.com/s",
        );
        let error = RefResolver::default().resolve(tree).unwrap_err();
        match error {
            Error::Loader { locator, .. } => {
                assert_eq!(locator, "http://example.com/missing");
            }
            other => panic!("expected a loader error, got {other}"),
        }
    }

    #[test]
    fn translation_happens_before_containment() {
        let translator = UriTranslator::builder()
            .schema_redirect("http://example.com/virtual", "http://example.com/real")
            .unwrap()
            .build()
            .unwrap();
        let loader = MapLoader(vec![(
            "http://example.com/real",
            json!({"type": "boolean"}),
        )]);
        let tree = tree(
            json!({"$ref": "http://example.com/virtual"}),
            "http://example.com/s",
        );
        let resolved = RefResolver::new(loader)
            .with_translator(translator)
            .resolve(tree)
            .unwrap();
        assert_eq!(resolved.current(), &json!({"type": "boolean"}));
        assert_eq!(
            resolved.loading_ref(),
            &JsonRef::parse("http://example.com/real").unwrap()
        );
    }
}
