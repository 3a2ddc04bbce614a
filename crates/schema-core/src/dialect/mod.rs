use std::{collections::BTreeMap, fmt, sync::Arc};

use ahash::AHashMap;
use jsonref::{JsonPointer, JsonRef};
use serde_json::Value;

use crate::{
    report::{ProcessingMessage, ProcessingReport},
    tree::SchemaTree,
    types::{NodeType, TypeSet},
    Error,
};

mod common;
mod draft3;
mod draft4;
mod hyper;

pub use draft3::draft3;
pub use draft4::draft4;
pub use hyper::draft4_hyper_schema;

/// Keyword-specific validation beyond the value-type whitelist.
///
/// A refinement receives the keyword name, the tree positioned at the
/// node owning the keyword, the report, and the subschema-pointer
/// accumulator. It must stay shape-consistent with the keyword's
/// [`PointerCollector`].
pub type Refinement = Arc<
    dyn Fn(&str, &SchemaTree, &mut ProcessingReport, &mut Vec<JsonPointer>) -> Result<(), Error>
        + Send
        + Sync,
>;

/// Enumerates the immediate child subschema positions contributed by one
/// keyword, as pointers relative to the node owning it. Pure.
pub type PointerCollector = Arc<dyn Fn(&str, &SchemaTree) -> Vec<JsonPointer> + Send + Sync>;

/// The syntax rule for one keyword: a value-type whitelist, then an
/// optional refinement.
///
/// On a type mismatch the refinement is skipped entirely, so an
/// ill-typed keyword never contributes subschema pointers.
#[derive(Clone)]
pub struct KeywordChecker {
    accepted: TypeSet,
    refine: Option<Refinement>,
}

impl KeywordChecker {
    #[must_use]
    pub fn new(accepted: TypeSet) -> KeywordChecker {
        KeywordChecker {
            accepted,
            refine: None,
        }
    }

    #[must_use]
    pub fn with_refinement(
        accepted: TypeSet,
        refine: impl Fn(&str, &SchemaTree, &mut ProcessingReport, &mut Vec<JsonPointer>) -> Result<(), Error>
            + Send
            + Sync
            + 'static,
    ) -> KeywordChecker {
        KeywordChecker {
            accepted,
            refine: Some(Arc::new(refine)),
        }
    }

    pub(crate) fn check(
        &self,
        keyword: &str,
        tree: &SchemaTree,
        report: &mut ProcessingReport,
        pointers: &mut Vec<JsonPointer>,
    ) -> Result<(), Error> {
        let Some(value) = tree.current().get(keyword) else {
            return Ok(());
        };
        let found = NodeType::of(value);
        if !self.accepted.contains(found) {
            return report.error(
                ProcessingMessage::new("keyword value has incorrect type")
                    .with("keyword", keyword)
                    .with("found", found.as_str())
                    .with("expected", self.accepted.names()),
            );
        }
        if let Some(refine) = &self.refine {
            refine(keyword, tree, report, pointers)?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeywordChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeywordChecker")
            .field("accepted", &self.accepted)
            .field("refined", &self.refine.is_some())
            .finish()
    }
}

/// Immutable per-dialect configuration: the recognized keywords, their
/// syntax checkers, and their subschema-pointer collectors.
///
/// Built once at startup and shared by handle; never mutated afterwards.
pub struct Dialect {
    locator: String,
    checkers: BTreeMap<String, KeywordChecker>,
    collectors: BTreeMap<String, PointerCollector>,
}

impl Dialect {
    /// Start building a dialect identified by `locator`.
    #[must_use]
    pub fn builder(locator: &str) -> DialectBuilder {
        DialectBuilder {
            locator: locator.to_owned(),
            checkers: BTreeMap::new(),
            collectors: BTreeMap::new(),
        }
    }

    /// The dialect identifier, fragment-less.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Whether `keyword` is recognized by this dialect.
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.checkers.contains_key(keyword)
    }

    pub(crate) fn checkers(&self) -> impl Iterator<Item = (&str, &KeywordChecker)> {
        self.checkers
            .iter()
            .map(|(keyword, checker)| (keyword.as_str(), checker))
    }

    /// The immediate child subschema positions at the tree's current
    /// node: registered collectors intersected with the members present,
    /// invoked in lexicographic keyword order.
    #[must_use]
    pub fn collect_children(&self, tree: &SchemaTree) -> Vec<JsonPointer> {
        let Value::Object(map) = tree.current() else {
            return Vec::new();
        };
        self.collectors
            .iter()
            .filter(|(keyword, _)| map.contains_key(keyword.as_str()))
            .flat_map(|(keyword, collector)| collector(keyword, tree))
            .collect()
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("locator", &self.locator)
            .field("keywords", &self.checkers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for custom dialects.
pub struct DialectBuilder {
    locator: String,
    checkers: BTreeMap<String, KeywordChecker>,
    collectors: BTreeMap<String, PointerCollector>,
}

impl DialectBuilder {
    /// Register a keyword that contributes no subschema pointers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on duplicate registration.
    pub fn keyword(
        mut self,
        name: impl Into<String>,
        checker: KeywordChecker,
    ) -> Result<DialectBuilder, Error> {
        let name = name.into();
        if self.checkers.contains_key(&name) {
            return Err(Error::config(format!(
                "keyword '{name}' registered twice for dialect '{}'",
                self.locator
            )));
        }
        self.checkers.insert(name, checker);
        Ok(self)
    }

    /// Register a keyword together with its pointer collector.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on duplicate registration.
    pub fn keyword_with_collector(
        mut self,
        name: impl Into<String>,
        checker: KeywordChecker,
        collector: PointerCollector,
    ) -> Result<DialectBuilder, Error> {
        let name = name.into();
        if self.collectors.insert(name.clone(), collector).is_some() {
            return Err(Error::config(format!(
                "keyword '{name}' registered twice for dialect '{}'",
                self.locator
            )));
        }
        self.keyword(name, checker)
    }

    /// Freeze the dialect.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the locator is empty or not a
    /// legal reference.
    pub fn build(self) -> Result<Dialect, Error> {
        if self.locator.is_empty() {
            return Err(Error::config("dialect locator is empty"));
        }
        if JsonRef::parse(&self.locator).is_err() {
            return Err(Error::config(format!(
                "dialect locator '{}' is not a legal reference",
                self.locator
            )));
        }
        Ok(Dialect {
            locator: registry_key(&self.locator),
            checkers: self.checkers,
            collectors: self.collectors,
        })
    }
}

/// The canonical lookup form of a dialect identifier: the fragment-less
/// locator, so `http://x/schema` and `http://x/schema#` select the same
/// dialect.
fn registry_key(locator: &str) -> String {
    match JsonRef::parse(locator) {
        Ok(reference) => reference.locator_str().to_owned(),
        Err(_) => locator.to_owned(),
    }
}

/// Maps self-declared dialect identifiers to descriptors, with a
/// configured fallback.
pub struct DialectRegistry {
    dialects: AHashMap<String, Arc<Dialect>>,
    default: Arc<Dialect>,
}

impl DialectRegistry {
    #[must_use]
    pub fn builder() -> DialectRegistryBuilder {
        DialectRegistryBuilder {
            dialects: AHashMap::new(),
            default: None,
        }
    }

    /// A registry holding the shipped dialects, defaulting to draft 4.
    #[must_use]
    pub fn with_defaults() -> DialectRegistry {
        let draft4 = Arc::new(draft4());
        let mut dialects = AHashMap::new();
        for dialect in [
            Arc::new(draft3()),
            Arc::clone(&draft4),
            Arc::new(draft4_hyper_schema()),
        ] {
            dialects.insert(dialect.locator().to_owned(), dialect);
        }
        DialectRegistry {
            dialects,
            default: draft4,
        }
    }

    #[must_use]
    pub fn get(&self, locator: &str) -> Option<&Arc<Dialect>> {
        self.dialects.get(&registry_key(locator))
    }

    #[must_use]
    pub fn default_dialect(&self) -> &Arc<Dialect> {
        &self.default
    }

    /// Select the dialect a document declares through its `$schema`
    /// member. Falls back to the default when the member is absent,
    /// non-textual, illegal, or unregistered.
    #[must_use]
    pub fn select(&self, document: &Value) -> &Arc<Dialect> {
        document
            .get("$schema")
            .and_then(Value::as_str)
            .filter(|declared| JsonRef::parse(declared).is_ok())
            .and_then(|declared| self.get(declared))
            .unwrap_or(&self.default)
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut locators: Vec<_> = self.dialects.keys().collect();
        locators.sort();
        f.debug_struct("DialectRegistry")
            .field("dialects", &locators)
            .field("default", &self.default.locator())
            .finish()
    }
}

/// Builder for a [`DialectRegistry`].
pub struct DialectRegistryBuilder {
    dialects: AHashMap<String, Arc<Dialect>>,
    default: Option<String>,
}

impl DialectRegistryBuilder {
    /// Register a dialect under its own locator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a dialect with the same locator
    /// is already registered.
    pub fn register(mut self, dialect: Dialect) -> Result<DialectRegistryBuilder, Error> {
        let key = dialect.locator().to_owned();
        if self.dialects.contains_key(&key) {
            return Err(Error::config(format!(
                "dialect '{key}' registered twice"
            )));
        }
        self.dialects.insert(key, Arc::new(dialect));
        Ok(self)
    }

    /// Choose the fallback dialect by locator.
    #[must_use]
    pub fn default_dialect(mut self, locator: &str) -> DialectRegistryBuilder {
        self.default = Some(registry_key(locator));
        self
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no default was chosen or the
    /// chosen default is not registered.
    pub fn build(self) -> Result<DialectRegistry, Error> {
        let Some(default) = self.default else {
            return Err(Error::config("no default dialect configured"));
        };
        let Some(default) = self.dialects.get(&default).cloned() else {
            return Err(Error::config(format!(
                "default dialect '{default}' is not registered"
            )));
        };
        Ok(DialectRegistry {
            dialects: self.dialects,
            default,
        })
    }
}
