use std::{fmt, sync::Arc};

/// Errors produced while parsing or translating references.
///
/// Sources are stored behind `Arc` so errors stay cheap to clone when a
/// shared computation hands the same outcome to several callers.
#[derive(Debug, Clone)]
pub enum Error {
    /// The input could not be parsed as a URI reference.
    InvalidUri {
        input: String,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The input could not be parsed as a JSON Pointer.
    InvalidPointer { input: String, reason: &'static str },
    /// Resolution of a reference against a base failed.
    Resolution {
        base: String,
        reference: String,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// A redirect rule maps a URI onto itself.
    SelfRedirect { uri: String },
}

impl Error {
    pub(crate) fn invalid_uri(
        input: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::InvalidUri {
            input: input.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn invalid_pointer(input: impl Into<String>, reason: &'static str) -> Error {
        Error::InvalidPointer {
            input: input.into(),
            reason,
        }
    }

    pub(crate) fn resolution(
        base: impl Into<String>,
        reference: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::Resolution {
            base: base.into(),
            reference: reference.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn self_redirect(uri: impl Into<String>) -> Error {
        Error::SelfRedirect { uri: uri.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidUri { input, source } => {
                write!(f, "Invalid URI reference '{input}': {source}")
            }
            Error::InvalidPointer { input, reason } => {
                write!(f, "Invalid JSON Pointer '{input}': {reason}")
            }
            Error::Resolution {
                base,
                reference,
                source,
            } => {
                write!(f, "Cannot resolve '{reference}' against '{base}': {source}")
            }
            Error::SelfRedirect { uri } => {
                write!(f, "Redirect source and destination are identical: '{uri}'")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidUri { source, .. } | Error::Resolution { source, .. } => {
                Some(source.as_ref())
            }
            Error::InvalidPointer { .. } | Error::SelfRedirect { .. } => None,
        }
    }
}
