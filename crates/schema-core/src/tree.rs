use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use jsonref::{parse_index, JsonPointer, JsonRef};
use serde_json::Value;

/// Policy governing whether a reference counts as locally satisfiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dereferencing {
    /// A reference is contained iff its locator equals the tree's
    /// loading reference. Matching positions are checked against the
    /// live document.
    Canonical,
    /// A reference is contained iff its pointer resolves within the
    /// same base document, irrespective of locator. Used for documents
    /// that have been fully expanded in memory.
    Inline,
}

/// Cache identity of a loaded document.
///
/// Structurally identical anonymous documents loaded twice are distinct
/// entities; documents loaded from an absolute reference share identity
/// by that reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaKey {
    Anonymous(u64),
    Ref(JsonRef),
}

static ANONYMOUS: AtomicU64 = AtomicU64::new(0);

impl SchemaKey {
    fn for_loading_ref(loading_ref: &JsonRef) -> SchemaKey {
        if loading_ref.is_absolute() {
            SchemaKey::Ref(loading_ref.clone())
        } else {
            SchemaKey::Anonymous(ANONYMOUS.fetch_add(1, Ordering::Relaxed))
        }
    }
}

static NULL: Value = Value::Null;

/// A positioned, immutable view over a schema document.
///
/// The base document is shared; `append` and `set_pointer` return new
/// trees over the same document. The context reference tracks the most
/// specific base URI declared by an `id`/`$id`-bearing node on the path
/// from the root to the current pointer, so relative references resolve
/// correctly wherever the tree is positioned.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    base: Arc<Value>,
    loading_ref: JsonRef,
    context_ref: JsonRef,
    pointer: JsonPointer,
    mode: Dereferencing,
    key: SchemaKey,
}

impl SchemaTree {
    /// A canonical tree over `document`, anchored at `loading_ref`.
    #[must_use]
    pub fn new(document: Value, loading_ref: JsonRef) -> SchemaTree {
        SchemaTree::with_mode(document, loading_ref, Dereferencing::Canonical)
    }

    /// A canonical tree over a document with no known locator.
    #[must_use]
    pub fn anonymous(document: Value) -> SchemaTree {
        SchemaTree::new(document, JsonRef::Empty {
            pointer: JsonPointer::root(),
        })
    }

    #[must_use]
    pub fn with_mode(document: Value, loading_ref: JsonRef, mode: Dereferencing) -> SchemaTree {
        let base = Arc::new(document);
        let key = SchemaKey::for_loading_ref(&loading_ref);
        let pointer = JsonPointer::root();
        let context_ref = compute_context(&base, &loading_ref, &pointer);
        SchemaTree {
            base,
            loading_ref,
            context_ref,
            pointer,
            mode,
            key,
        }
    }

    /// The whole base document.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.base
    }

    /// The node the tree is currently positioned at.
    ///
    /// Positions are only ever produced by `append`/`set_pointer` with
    /// pointers that resolve in the base document, so this does not fail
    /// in practice; a stale pointer yields `null`.
    #[must_use]
    pub fn current(&self) -> &Value {
        self.pointer.get(&self.base).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn loading_ref(&self) -> &JsonRef {
        &self.loading_ref
    }

    #[must_use]
    pub fn context_ref(&self) -> &JsonRef {
        &self.context_ref
    }

    #[must_use]
    pub fn pointer(&self) -> &JsonPointer {
        &self.pointer
    }

    #[must_use]
    pub fn mode(&self) -> Dereferencing {
        self.mode
    }

    #[must_use]
    pub fn key(&self) -> &SchemaKey {
        &self.key
    }

    /// A tree positioned at the current pointer extended by `relative`.
    #[must_use]
    pub fn append(&self, relative: &JsonPointer) -> SchemaTree {
        self.set_pointer(self.pointer.join(relative))
    }

    /// A tree over the same document positioned at `pointer`.
    #[must_use]
    pub fn set_pointer(&self, pointer: JsonPointer) -> SchemaTree {
        let context_ref = compute_context(&self.base, &self.loading_ref, &pointer);
        SchemaTree {
            base: Arc::clone(&self.base),
            loading_ref: self.loading_ref.clone(),
            context_ref,
            pointer,
            mode: self.mode,
            key: self.key.clone(),
        }
    }

    /// Whether `reference` can be satisfied from this tree's document.
    #[must_use]
    pub fn contains(&self, reference: &JsonRef) -> bool {
        match self.mode {
            Dereferencing::Canonical => self.loading_ref.contains(reference),
            Dereferencing::Inline => reference.pointer().get(&self.base).is_some(),
        }
    }

    /// The pointer at which `reference` lands in this document, if that
    /// position exists.
    #[must_use]
    pub fn matching_pointer(&self, reference: &JsonRef) -> Option<JsonPointer> {
        let pointer = reference.pointer();
        pointer.get(&self.base).map(|_| pointer.clone())
    }
}

/// Walk from the root to `pointer`, folding every `id`/`$id` declaration
/// encountered on the way into the running context reference.
fn compute_context(base: &Value, loading_ref: &JsonRef, pointer: &JsonPointer) -> JsonRef {
    let mut context = apply_id(base, loading_ref.clone());
    let mut node = base;
    for token in pointer.iter() {
        let child = match node {
            Value::Object(map) => map.get(token),
            Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
            _ => None,
        };
        let Some(child) = child else {
            break;
        };
        node = child;
        context = apply_id(node, context);
    }
    context
}

fn apply_id(node: &Value, context: JsonRef) -> JsonRef {
    let id = node
        .get("$id")
        .or_else(|| node.get("id"))
        .and_then(Value::as_str);
    if let Some(id) = id {
        if let Ok(declared) = JsonRef::parse(id) {
            if let Ok(resolved) = context.resolve(&declared) {
                return resolved;
            }
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use jsonref::{JsonPointer, JsonRef};
    use serde_json::json;

    use super::{Dereferencing, SchemaKey, SchemaTree};

    fn loaded(document: serde_json::Value, locator: &str) -> SchemaTree {
        SchemaTree::new(document, JsonRef::parse(locator).unwrap())
    }

    #[test]
    fn anonymous_documents_get_distinct_keys() {
        let first = SchemaTree::anonymous(json!({"type": "object"}));
        let second = SchemaTree::anonymous(json!({"type": "object"}));
        assert_ne!(first.key(), second.key());
    }

    #[test]
    fn loaded_documents_are_keyed_by_reference() {
        let first = loaded(json!({}), "http://example.com/s");
        let second = loaded(json!({}), "http://example.com/s");
        assert_eq!(first.key(), second.key());
        assert!(matches!(first.key(), SchemaKey::Ref(_)));
    }

    #[test]
    fn repositioning_shares_the_document() {
        let tree = loaded(json!({"not": {"type": "string"}}), "http://example.com/s");
        let child = tree.append(&JsonPointer::parse("/not").unwrap());
        assert_eq!(child.current(), &json!({"type": "string"}));
        assert_eq!(child.key(), tree.key());
        assert_eq!(tree.current(), tree.root());
    }

    #[test]
    fn canonical_containment_is_locator_equality() {
        let tree = loaded(json!({"a": {}}), "http://example.com/s");
        assert!(tree.contains(&JsonRef::parse("http://example.com/s#/missing").unwrap()));
        assert!(tree.contains(&JsonRef::parse("http://example.com/s").unwrap()));
        assert!(!tree.contains(&JsonRef::parse("http://example.com/other").unwrap()));
    }

    #[test]
    fn inline_containment_is_pointer_existence() {
        let tree = SchemaTree::with_mode(
            json!({"a": {"b": 1}}),
            JsonRef::parse("http://example.com/s").unwrap(),
            Dereferencing::Inline,
        );
        assert!(tree.contains(&JsonRef::parse("http://elsewhere.org/x#/a/b").unwrap()));
        assert!(!tree.contains(&JsonRef::parse("http://example.com/s#/a/c").unwrap()));
    }

    #[test]
    fn matching_pointer_checks_the_document() {
        let tree = loaded(json!({"definitions": {"x": {}}}), "http://example.com/s");
        let hit = JsonRef::parse("http://example.com/s#/definitions/x").unwrap();
        assert_eq!(
            tree.matching_pointer(&hit),
            Some(JsonPointer::parse("/definitions/x").unwrap())
        );
        let miss = JsonRef::parse("http://example.com/s#/definitions/y").unwrap();
        assert_eq!(tree.matching_pointer(&miss), None);
    }

    #[test]
    fn context_follows_id_declarations() {
        let tree = loaded(
            json!({
                "id": "http://example.com/base/root.json",
                "properties": {
                    "inner": {
                        "id": "sub/schema.json",
                        "type": "object"
                    }
                }
            }),
            "http://example.com/loaded.json",
        );
        assert_eq!(
            tree.context_ref().locator_str(),
            "http://example.com/base/root.json"
        );
        let inner = tree.append(&JsonPointer::parse("/properties/inner").unwrap());
        assert_eq!(
            inner.context_ref().locator_str(),
            "http://example.com/base/sub/schema.json"
        );
        // Sibling positions are unaffected
        let properties = tree.append(&JsonPointer::parse("/properties").unwrap());
        assert_eq!(
            properties.context_ref().locator_str(),
            "http://example.com/base/root.json"
        );
    }

    #[test]
    fn dollar_id_is_preferred_over_id() {
        let tree = SchemaTree::anonymous(json!({
            "$id": "http://example.com/new",
            "id": "http://example.com/old"
        }));
        assert_eq!(tree.context_ref().locator_str(), "http://example.com/new");
    }

    #[test]
    fn context_without_ids_is_the_loading_ref() {
        let tree = loaded(json!({"type": "object"}), "http://example.com/s");
        assert_eq!(tree.context_ref(), tree.loading_ref());
    }
}
