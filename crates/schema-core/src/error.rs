use std::{fmt, sync::Arc};

use jsonref::JsonRef;

use crate::{loader::LoadError, report::ProcessingMessage};

/// Fatal errors raised by reference resolution, analysis, and
/// configuration assembly.
///
/// Syntax and structural problems are not errors: they accumulate in a
/// [`ProcessingReport`](crate::ProcessingReport). What ends up here are
/// the conditions that invalidate any further interpretation of a schema,
/// plus fail-fast configuration mistakes.
///
/// The type is `Clone` so that the analysis cache can hand a single
/// failure to every caller waiting on the same computation.
#[derive(Debug, Clone)]
pub enum Error {
    /// A reference chain revisited an already seen reference.
    RefLoop {
        /// The reference that closed the loop.
        reference: JsonRef,
        /// The ordered chain of references followed so far.
        chain: Vec<JsonRef>,
    },
    /// A reference resolved to a position that does not exist.
    DanglingRef { reference: JsonRef },
    /// The document loader failed for a locator.
    Loader {
        locator: String,
        source: Arc<LoadError>,
    },
    /// A reference string could not be resolved against its context.
    Reference(jsonref::Error),
    /// A report message reached the configured raise threshold.
    Fatal(ProcessingMessage),
    /// Invalid configuration detected while assembling immutable
    /// configuration objects. Never raised during request processing.
    Config { reason: String },
}

impl Error {
    pub(crate) fn ref_loop(reference: JsonRef, chain: Vec<JsonRef>) -> Error {
        Error::RefLoop { reference, chain }
    }

    pub(crate) fn dangling(reference: JsonRef) -> Error {
        Error::DanglingRef { reference }
    }

    pub(crate) fn loader(locator: impl Into<String>, source: LoadError) -> Error {
        Error::Loader {
            locator: locator.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Error {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// The ordered reference chain for loop errors, if any.
    #[must_use]
    pub fn chain(&self) -> Option<&[JsonRef]> {
        match self {
            Error::RefLoop { chain, .. } => Some(chain),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RefLoop { reference, chain } => {
                write!(f, "Reference loop detected at '{reference}'; chain: [")?;
                for (i, entry) in chain.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{entry}'")?;
                }
                f.write_str("]")
            }
            Error::DanglingRef { reference } => {
                write!(f, "Reference '{reference}' resolves to a non-existent position")
            }
            Error::Loader { locator, source } => {
                write!(f, "Cannot load document at '{locator}': {source}")
            }
            Error::Reference(source) => source.fmt(f),
            Error::Fatal(message) => {
                write!(f, "Fatal processing message: {}", message.text())
            }
            Error::Config { reason } => write!(f, "Invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Loader { source, .. } => Some(source.as_ref()),
            Error::Reference(source) => Some(source),
            _ => None,
        }
    }
}

impl From<jsonref::Error> for Error {
    fn from(value: jsonref::Error) -> Self {
        Error::Reference(value)
    }
}
