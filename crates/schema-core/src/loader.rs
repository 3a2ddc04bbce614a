use std::{fmt, sync::Arc};

use ahash::AHashMap;
use jsonref::UriRef;
use serde_json::Value;

use crate::Error;

/// Failure conditions a loader can report, kept distinguishable so
/// callers can present an actionable message.
#[derive(Debug)]
pub enum LoadError {
    /// No loader is registered for the locator's scheme.
    UnsupportedScheme { scheme: String },
    /// The bytes could not be fetched.
    Io(std::io::Error),
    /// The fetched content is not parseable as a document.
    Parse(serde_json::Error),
    /// Any other loader-specific failure.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedScheme { scheme } => {
                write!(f, "unsupported URI scheme '{scheme}'")
            }
            LoadError::Io(source) => write!(f, "I/O error: {source}"),
            LoadError::Parse(source) => write!(f, "content is not a valid document: {source}"),
            LoadError::Other(source) => source.fmt(f),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::UnsupportedScheme { .. } => None,
            LoadError::Io(source) => Some(source),
            LoadError::Parse(source) => Some(source),
            LoadError::Other(source) => Some(source.as_ref()),
        }
    }
}

/// Fetches the document behind a locator.
///
/// Scheme dispatch, timeouts, and retries are the loader's business; the
/// resolver treats `load` as a plain synchronous call.
pub trait SchemaLoader: Send + Sync {
    /// Load the document at `locator`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] describing why the document is
    /// unavailable.
    fn load(&self, locator: &UriRef<String>) -> Result<Value, LoadError>;
}

/// A loader that refuses to fetch anything. The default: resolution then
/// only succeeds for references contained in already loaded documents.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLoader;

impl SchemaLoader for DefaultLoader {
    fn load(&self, _locator: &UriRef<String>) -> Result<Value, LoadError> {
        Err(LoadError::Other(
            "default loader does not fetch documents".into(),
        ))
    }
}

pub trait IntoLoader {
    fn into_loader(self) -> Arc<dyn SchemaLoader>;
}

impl<T: SchemaLoader + 'static> IntoLoader for T {
    fn into_loader(self) -> Arc<dyn SchemaLoader> {
        Arc::new(self)
    }
}

impl IntoLoader for Arc<dyn SchemaLoader> {
    fn into_loader(self) -> Arc<dyn SchemaLoader> {
        self
    }
}

/// Dispatches loading on the locator's URI scheme.
///
/// Scheme names are validated when registered; registration failures are
/// configuration errors and never occur during resolution.
#[derive(Default)]
pub struct SchemeRegistry {
    loaders: AHashMap<String, Arc<dyn SchemaLoader>>,
}

impl SchemeRegistry {
    #[must_use]
    pub fn new() -> SchemeRegistry {
        SchemeRegistry::default()
    }

    /// Register a loader for a scheme.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the scheme is empty or not a
    /// legal RFC 3986 scheme name.
    pub fn register(
        mut self,
        scheme: &str,
        loader: impl IntoLoader,
    ) -> Result<SchemeRegistry, Error> {
        if scheme.is_empty() {
            return Err(Error::config("scheme name is empty"));
        }
        let mut chars = scheme.chars();
        let legal = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !legal {
            return Err(Error::config(format!("illegal scheme name '{scheme}'")));
        }
        self.loaders
            .insert(scheme.to_ascii_lowercase(), loader.into_loader());
        Ok(self)
    }
}

impl SchemaLoader for SchemeRegistry {
    fn load(&self, locator: &UriRef<String>) -> Result<Value, LoadError> {
        let scheme = locator
            .scheme()
            .map(|s| s.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        match self.loaders.get(&scheme) {
            Some(loader) => loader.load(locator),
            None => Err(LoadError::UnsupportedScheme { scheme }),
        }
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.loaders.keys().collect();
        schemes.sort();
        f.debug_struct("SchemeRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use jsonref::uri;
    use serde_json::{json, Value};

    use crate::Error;

    use super::{DefaultLoader, LoadError, SchemaLoader, SchemeRegistry, UriRef};

    struct FixedLoader(Value);

    impl SchemaLoader for FixedLoader {
        fn load(&self, _locator: &UriRef<String>) -> Result<Value, LoadError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn default_loader_refuses() {
        let locator = uri::parse_ref("http://example.com/s").unwrap();
        assert!(DefaultLoader.load(&locator).is_err());
    }

    #[test]
    fn scheme_dispatch() {
        let registry = SchemeRegistry::new()
            .register("http", FixedLoader(json!({"type": "object"})))
            .unwrap();
        let hit = uri::parse_ref("http://example.com/s").unwrap();
        assert_eq!(registry.load(&hit).unwrap(), json!({"type": "object"}));
        // Scheme matching is case-insensitive
        let upper = uri::parse_ref("HTTP://example.com/s").unwrap();
        assert!(registry.load(&upper).is_ok());
        let miss = uri::parse_ref("ftp://example.com/s").unwrap();
        assert!(matches!(
            registry.load(&miss),
            Err(LoadError::UnsupportedScheme { scheme }) if scheme == "ftp"
        ));
    }

    #[test]
    fn illegal_schemes_are_rejected_at_registration() {
        for scheme in ["", "9http", "ht tp", "ht#p"] {
            let result = SchemeRegistry::new().register(scheme, DefaultLoader);
            assert!(
                matches!(result, Err(Error::Config { .. })),
                "scheme {scheme:?} must be rejected"
            );
        }
    }
}
