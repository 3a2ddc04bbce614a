use std::fmt;

use fluent_uri::{Uri, UriRef};
use percent_encoding::percent_decode_str;

use crate::{uri, Error, JsonPointer};

/// An immutable JSON Reference: a URI locator plus a JSON Pointer fragment.
///
/// The variant is fixed at parse time from the syntactic shape of the
/// source URI and drives how [`resolve`](JsonRef::resolve) behaves:
///
/// - [`Empty`](JsonRef::Empty): a pure fragment (no scheme, no path).
///   Resolving anything against it yields that thing unchanged.
/// - [`Hierarchical`](JsonRef::Hierarchical): any legal URI that is
///   relative, or absolute and non-opaque. Standard RFC 3986 resolution.
/// - [`Opaque`](JsonRef::Opaque): absolute but opaque, e.g. an
///   archive-embedded locator of the form `scheme:outer!inner`. Resolution
///   happens against the `!`-delimited inner path and the outer prefix is
///   preserved; plain hierarchical resolution would be wrong here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonRef {
    Empty {
        pointer: JsonPointer,
    },
    Hierarchical {
        locator: UriRef<String>,
        pointer: JsonPointer,
    },
    Opaque {
        locator: UriRef<String>,
        pointer: JsonPointer,
    },
}

impl JsonRef {
    /// Parse a reference string, classifying it into one of the variants.
    ///
    /// The fragment, if present, must be empty or a valid JSON Pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the locator is not a legal URI reference or the
    /// fragment is not a legal JSON Pointer.
    pub fn parse(input: &str) -> Result<JsonRef, Error> {
        let (raw_locator, fragment) = uri::split_fragment(input);
        let pointer = match fragment {
            None => JsonPointer::root(),
            Some(fragment) => {
                let decoded = percent_decode_str(fragment)
                    .decode_utf8()
                    .map_err(|_| Error::invalid_pointer(fragment, "fragment is not valid UTF-8"))?;
                JsonPointer::parse(&decoded)?
            }
        };
        let locator = uri::parse_ref(raw_locator)?;
        Ok(Self::from_parts(locator, pointer))
    }

    /// Build a reference from an already parsed locator and pointer.
    #[must_use]
    pub fn from_parts(locator: UriRef<String>, pointer: JsonPointer) -> JsonRef {
        if locator.as_str().is_empty() {
            JsonRef::Empty { pointer }
        } else if uri::is_opaque(&locator) {
            JsonRef::Opaque { locator, pointer }
        } else {
            JsonRef::Hierarchical { locator, pointer }
        }
    }

    /// The locator part; empty string for the [`Empty`](JsonRef::Empty) variant.
    #[must_use]
    pub fn locator_str(&self) -> &str {
        match self {
            JsonRef::Empty { .. } => "",
            JsonRef::Hierarchical { locator, .. } | JsonRef::Opaque { locator, .. } => {
                locator.as_str()
            }
        }
    }

    /// The pointer part.
    #[must_use]
    pub fn pointer(&self) -> &JsonPointer {
        match self {
            JsonRef::Empty { pointer }
            | JsonRef::Hierarchical { pointer, .. }
            | JsonRef::Opaque { pointer, .. } => pointer,
        }
    }

    /// The same reference with a different pointer.
    #[must_use]
    pub fn with_pointer(&self, pointer: JsonPointer) -> JsonRef {
        match self {
            JsonRef::Empty { .. } => JsonRef::Empty { pointer },
            JsonRef::Hierarchical { locator, .. } => JsonRef::Hierarchical {
                locator: locator.clone(),
                pointer,
            },
            JsonRef::Opaque { locator, .. } => JsonRef::Opaque {
                locator: locator.clone(),
                pointer,
            },
        }
    }

    /// Whether this reference is absolute: a non-empty locator with a
    /// scheme and an empty pointer.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        match self {
            JsonRef::Empty { .. } => false,
            JsonRef::Hierarchical { locator, pointer } => {
                uri::is_absolute(locator) && pointer.is_root()
            }
            // Opaque locators always carry a scheme
            JsonRef::Opaque { pointer, .. } => pointer.is_root(),
        }
    }

    /// Whether `other` has the same locator, ignoring pointers.
    #[must_use]
    pub fn contains(&self, other: &JsonRef) -> bool {
        self.locator_str() == other.locator_str()
    }

    /// Resolve `other` against this reference.
    ///
    /// Resolving a chain of relative references step by step yields the
    /// same result as resolving the fully qualified final URI directly.
    ///
    /// # Errors
    ///
    /// Returns an error if hierarchical URI resolution fails.
    pub fn resolve(&self, other: &JsonRef) -> Result<JsonRef, Error> {
        // A reference with its own scheme is already fully qualified.
        if matches!(other, JsonRef::Opaque { .. })
            || matches!(other, JsonRef::Hierarchical { locator, .. } if uri::is_absolute(locator))
        {
            return Ok(other.clone());
        }
        match self {
            JsonRef::Empty { .. } => Ok(other.clone()),
            JsonRef::Hierarchical { locator, .. } => match other {
                JsonRef::Empty { pointer } => Ok(JsonRef::Hierarchical {
                    locator: locator.clone(),
                    pointer: pointer.clone(),
                }),
                JsonRef::Hierarchical {
                    locator: reference,
                    pointer,
                } => {
                    let resolved = uri::resolve(locator, reference)?;
                    Ok(Self::from_parts(resolved, pointer.clone()))
                }
                JsonRef::Opaque { .. } => Ok(other.clone()),
            },
            JsonRef::Opaque { locator, .. } => match other {
                JsonRef::Empty { pointer } => Ok(JsonRef::Opaque {
                    locator: locator.clone(),
                    pointer: pointer.clone(),
                }),
                JsonRef::Hierarchical {
                    locator: reference,
                    pointer,
                } => resolve_opaque(locator, reference, pointer.clone()),
                JsonRef::Opaque { .. } => Ok(other.clone()),
            },
        }
    }
}

/// Resolve a relative reference against an opaque `scheme:outer!inner`
/// locator: resolve against the inner path, keep the outer prefix.
fn resolve_opaque(
    locator: &UriRef<String>,
    reference: &UriRef<String>,
    pointer: JsonPointer,
) -> Result<JsonRef, Error> {
    let full = locator.as_str();
    let Some((scheme, rest)) = full.split_once(':') else {
        return Ok(JsonRef::from_parts(reference.clone(), pointer));
    };
    let Some((outer, inner)) = rest.split_once('!') else {
        return Ok(JsonRef::from_parts(reference.clone(), pointer));
    };
    if !inner.starts_with('/') {
        return Ok(JsonRef::from_parts(reference.clone(), pointer));
    }
    // Resolve against the inner path under a placeholder scheme, then
    // strip it back off and re-wrap with the preserved outer prefix.
    let base = Uri::parse(format!("x:{inner}"))
        .map_err(|(e, _)| Error::invalid_uri(full, e))?;
    let resolved = reference
        .resolve_against(&base)
        .map_err(|e| Error::resolution(full, reference.as_str(), e))?;
    let resolved_inner = resolved.as_str().strip_prefix("x:").unwrap_or(resolved.as_str());
    let combined = format!("{scheme}:{outer}!{resolved_inner}");
    Ok(JsonRef::Opaque {
        locator: uri::parse_ref(&combined)?,
        pointer,
    })
}

impl fmt::Display for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locator = self.locator_str();
        let pointer = self.pointer();
        if locator.is_empty() || !pointer.is_root() {
            write!(f, "{locator}#{pointer}")
        } else {
            f.write_str(locator)
        }
    }
}
