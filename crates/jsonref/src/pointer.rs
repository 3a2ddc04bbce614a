use std::{borrow::Cow, fmt, slice};

use serde_json::Value;

use crate::Error;

/// An immutable JSON Pointer: an ordered sequence of reference tokens.
///
/// Tokens are stored in cooked (unescaped) form; `Display` re-escapes
/// `~` and `/` to `~0` and `~1`, so `parse` and `to_string` round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    /// The empty pointer, addressing the document root.
    #[must_use]
    pub fn root() -> JsonPointer {
        JsonPointer { tokens: Vec::new() }
    }

    /// Parse a pointer from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is non-empty and does not start with
    /// `/`, or contains a `~` escape other than `~0`/`~1`.
    pub fn parse(input: &str) -> Result<JsonPointer, Error> {
        if input.is_empty() {
            return Ok(JsonPointer::root());
        }
        if !input.starts_with('/') {
            return Err(Error::invalid_pointer(input, "does not start with '/'"));
        }
        let mut tokens = Vec::new();
        for raw in input.split('/').skip(1) {
            tokens.push(unescape_strict(raw).ok_or_else(|| {
                Error::invalid_pointer(input, "invalid '~' escape, expected '~0' or '~1'")
            })?);
        }
        Ok(JsonPointer { tokens })
    }

    /// Build a pointer directly from cooked (unescaped) tokens.
    pub fn from_tokens<I, S>(tokens: I) -> JsonPointer
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JsonPointer {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// A new pointer with one more token appended.
    #[must_use]
    pub fn append(&self, token: impl Into<String>) -> JsonPointer {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        JsonPointer { tokens }
    }

    /// A new pointer with an array index appended.
    #[must_use]
    pub fn append_index(&self, index: usize) -> JsonPointer {
        self.append(index.to_string())
    }

    /// A new pointer with all of `other`'s tokens appended.
    #[must_use]
    pub fn join(&self, other: &JsonPointer) -> JsonPointer {
        let mut tokens = self.tokens.clone();
        tokens.extend(other.tokens.iter().cloned());
        JsonPointer { tokens }
    }

    /// The parent pointer, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<JsonPointer> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(JsonPointer {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// The remainder of `self` after removing the leading tokens of `base`,
    /// or `None` if `base` is not a prefix of `self`.
    #[must_use]
    pub fn strip_prefix(&self, base: &JsonPointer) -> Option<JsonPointer> {
        let rest = self.tokens.strip_prefix(base.tokens.as_slice())?;
        Some(JsonPointer {
            tokens: rest.to_vec(),
        })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterate over the cooked tokens.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.tokens.iter(),
        }
    }

    /// Resolve this pointer inside a document.
    ///
    /// Array indices follow RFC 6901: no leading `+`, no leading zeros.
    #[must_use]
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.tokens
            .iter()
            .try_fold(document, |target, token| match target {
                Value::Object(map) => map.get(token.as_str()),
                Value::Array(list) => parse_index(token).and_then(|x| list.get(x)),
                _ => None,
            })
    }

    /// Mutable counterpart of [`get`](Self::get).
    pub fn get_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        self.tokens
            .iter()
            .try_fold(document, |target, token| match target {
                Value::Object(map) => map.get_mut(token.as_str()),
                Value::Array(list) => parse_index(token).and_then(move |x| list.get_mut(x)),
                _ => None,
            })
    }
}

pub struct Iter<'a> {
    inner: slice::Iter<'a, String>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(String::as_str)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a JsonPointer {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            f.write_str("/")?;
            for ch in token.chars() {
                match ch {
                    '~' => f.write_str("~0")?,
                    '/' => f.write_str("~1")?,
                    _ => fmt::Write::write_char(f, ch)?,
                }
            }
        }
        Ok(())
    }
}

/// Unescape a single raw reference token (`~0` -> `~`, `~1` -> `/`).
///
/// Lenient variant used for pointer strings of unknown provenance; a
/// trailing or malformed `~` is passed through unchanged.
#[must_use]
pub fn unescape_token(token: &str) -> Cow<'_, str> {
    if !token.contains('~') {
        return Cow::Borrowed(token);
    }
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                Some(other) => {
                    out.push('~');
                    out.push(other);
                }
                None => out.push('~'),
            }
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

fn unescape_strict(token: &str) -> Option<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

// Taken from `serde_json`.
#[must_use]
pub fn parse_index(s: &str) -> Option<usize> {
    if s.starts_with('+') || (s.starts_with('0') && s.len() != 1) {
        return None;
    }
    s.parse().ok()
}
