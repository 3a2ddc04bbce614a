use ahash::AHashMap;
use fluent_uri::UriRef;

use crate::{uri, Error, JsonRef};

/// Pure URI translation over a frozen configuration: a default namespace,
/// ordered prefix-based path redirects, and exact-match schema redirects.
///
/// Translation runs before containment and identity checks during
/// reference resolution, so it decides what a reference's locator
/// actually resolves to.
#[derive(Debug, Clone, Default)]
pub struct UriTranslator {
    namespace: Option<UriRef<String>>,
    path_redirects: Vec<(UriRef<String>, UriRef<String>)>,
    schema_redirects: AHashMap<String, UriRef<String>>,
}

impl UriTranslator {
    /// A builder for a new translator configuration.
    #[must_use]
    pub fn builder() -> UriTranslatorBuilder {
        UriTranslatorBuilder::new()
    }

    /// Translate a source URI.
    ///
    /// 1. Resolve against the configured namespace, then normalize
    ///    (case-fold scheme and host, collapse dot segments, drop
    ///    explicit default ports).
    /// 2. Detach the fragment.
    /// 3. Apply the first matching path redirect, if any.
    /// 4. Apply an exact-match schema redirect, if any.
    /// 5. Reattach the fragment unmodified.
    ///
    /// # Errors
    ///
    /// Returns an error if namespace resolution fails.
    pub fn translate(&self, source: &UriRef<String>) -> Result<UriRef<String>, Error> {
        let resolved = match &self.namespace {
            Some(namespace) => uri::resolve(namespace, source)?,
            None => source.clone(),
        };
        let normalized = uri::normalize(&resolved)?;
        let (detached, fragment) = uri::split_fragment(normalized.as_str());
        let mut body = detached.to_string();
        for (from, to) in &self.path_redirects {
            if let Some(rest) = relativize(&body, from.as_str()) {
                body = format!("{}{rest}", to.as_str());
                break;
            }
        }
        if let Some(to) = self.schema_redirects.get(body.as_str()) {
            body = to.as_str().to_string();
        }
        match fragment {
            Some(fragment) => uri::parse_ref(&format!("{body}#{fragment}")),
            None => uri::parse_ref(&body),
        }
    }

    /// Translate the locator of a reference, keeping its pointer.
    ///
    /// References without a locator pass through unchanged.
    ///
    /// # Errors
    ///
    /// See [`translate`](Self::translate).
    pub fn translate_ref(&self, reference: &JsonRef) -> Result<JsonRef, Error> {
        match reference {
            JsonRef::Empty { .. } => Ok(reference.clone()),
            JsonRef::Hierarchical { locator, pointer }
            | JsonRef::Opaque { locator, pointer } => {
                let translated = self.translate(locator)?;
                Ok(JsonRef::from_parts(translated, pointer.clone()))
            }
        }
    }
}

/// `source` relativized against `prefix`: the remainder if `prefix` is a
/// path prefix of `source` at a segment boundary, or `None`.
fn relativize<'a>(source: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = source.strip_prefix(prefix)?;
    if rest.is_empty() || prefix.ends_with('/') || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Builder for a [`UriTranslator`].
///
/// Redirect rules are parsed as they are added; self-redirects are
/// rejected when [`build`](Self::build) freezes the configuration.
#[derive(Debug, Default)]
pub struct UriTranslatorBuilder {
    namespace: Option<UriRef<String>>,
    path_redirects: Vec<(UriRef<String>, UriRef<String>)>,
    schema_redirects: Vec<(UriRef<String>, UriRef<String>)>,
}

impl UriTranslatorBuilder {
    #[must_use]
    pub fn new() -> UriTranslatorBuilder {
        UriTranslatorBuilder::default()
    }

    /// Set the namespace: the base URI against which bare/relative source
    /// URIs are resolved before any redirect rules apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is not a legal URI reference.
    pub fn namespace(mut self, namespace: &str) -> Result<UriTranslatorBuilder, Error> {
        self.namespace = Some(uri::parse_ref(namespace)?);
        Ok(self)
    }

    /// Add a prefix-based path redirect. Rules apply in insertion order;
    /// the first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if either URI is illegal.
    pub fn path_redirect(mut self, from: &str, to: &str) -> Result<UriTranslatorBuilder, Error> {
        self.path_redirects
            .push((uri::parse_ref(from)?, uri::parse_ref(to)?));
        Ok(self)
    }

    /// Add an exact-match schema redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if either URI is illegal.
    pub fn schema_redirect(mut self, from: &str, to: &str) -> Result<UriTranslatorBuilder, Error> {
        self.schema_redirects
            .push((uri::parse_ref(from)?, uri::parse_ref(to)?));
        Ok(self)
    }

    /// Freeze the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any redirect rule maps a URI onto itself after
    /// normalization; a self-redirect is always a configuration mistake.
    pub fn build(self) -> Result<UriTranslator, Error> {
        let mut path_redirects = Vec::with_capacity(self.path_redirects.len());
        for (from, to) in self.path_redirects {
            let (from, to) = (uri::normalize(&from)?, uri::normalize(&to)?);
            if from == to {
                return Err(Error::self_redirect(from.as_str()));
            }
            path_redirects.push((from, to));
        }
        let mut schema_redirects = AHashMap::with_capacity(self.schema_redirects.len());
        for (from, to) in self.schema_redirects {
            let (from, to) = (uri::normalize(&from)?, uri::normalize(&to)?);
            if from == to {
                return Err(Error::self_redirect(from.as_str()));
            }
            schema_redirects.insert(from.as_str().to_string(), to);
        }
        Ok(UriTranslator {
            namespace: self.namespace,
            path_redirects,
            schema_redirects,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{uri, Error, JsonRef};

    use super::UriTranslator;

    fn translate(translator: &UriTranslator, input: &str) -> String {
        translator
            .translate(&uri::parse_ref(input).expect("valid URI"))
            .expect("translation failed")
            .as_str()
            .to_string()
    }

    #[test]
    fn identity_configuration_normalizes() {
        let translator = UriTranslator::default();
        assert_eq!(
            translate(&translator, "HTTP://Example.COM:80/a/../b"),
            "http://example.com/b"
        );
    }

    #[test]
    fn translation_is_idempotent() {
        let translator = UriTranslator::builder()
            .namespace("http://example.com/schemas/")
            .unwrap()
            .build()
            .unwrap();
        for input in ["core.json", "HTTP://Other.ORG/x#/a", "a/./b.json"] {
            let once = translate(&translator, input);
            assert_eq!(translate(&translator, &once), once);
        }
    }

    #[test]
    fn namespace_resolution() {
        let translator = UriTranslator::builder()
            .namespace("http://example.com/schemas/")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            translate(&translator, "core.json"),
            "http://example.com/schemas/core.json"
        );
        // Absolute sources ignore the namespace
        assert_eq!(
            translate(&translator, "http://other.org/x"),
            "http://other.org/x"
        );
    }

    #[test]
    fn path_redirect_first_match_wins() {
        let translator = UriTranslator::builder()
            .path_redirect("http://example.com/old/", "http://example.com/new/")
            .unwrap()
            .path_redirect("http://example.com/", "http://mirror.org/")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            translate(&translator, "http://example.com/old/s.json"),
            "http://example.com/new/s.json"
        );
        // Falls through to the second rule
        assert_eq!(
            translate(&translator, "http://example.com/other/s.json"),
            "http://mirror.org/other/s.json"
        );
        // Unmatched URIs pass through unchanged
        assert_eq!(
            translate(&translator, "http://elsewhere.net/s.json"),
            "http://elsewhere.net/s.json"
        );
    }

    #[test]
    fn path_redirect_respects_segment_boundaries() {
        let translator = UriTranslator::builder()
            .path_redirect("http://example.com/old", "http://example.com/new")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            translate(&translator, "http://example.com/old/s.json"),
            "http://example.com/new/s.json"
        );
        // "oldies" is not under the "old" prefix
        assert_eq!(
            translate(&translator, "http://example.com/oldies"),
            "http://example.com/oldies"
        );
    }

    #[test]
    fn schema_redirect_is_exact_match() {
        let translator = UriTranslator::builder()
            .schema_redirect("http://example.com/draft", "http://example.com/draft-04")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            translate(&translator, "http://example.com/draft"),
            "http://example.com/draft-04"
        );
        assert_eq!(
            translate(&translator, "http://example.com/draft/x"),
            "http://example.com/draft/x"
        );
    }

    #[test]
    fn fragment_survives_translation() {
        let translator = UriTranslator::builder()
            .schema_redirect("http://example.com/a", "http://example.com/b")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            translate(&translator, "http://example.com/a#/definitions/x"),
            "http://example.com/b#/definitions/x"
        );
    }

    #[test]
    fn self_redirect_is_rejected_at_build_time() {
        let error = UriTranslator::builder()
            .path_redirect("http://example.com/a/", "http://example.com/a/")
            .unwrap()
            .build()
            .expect_err("self-redirect must fail");
        assert!(matches!(error, Error::SelfRedirect { .. }));

        // Equality is checked after normalization
        let error = UriTranslator::builder()
            .schema_redirect("HTTP://Example.com:80/a", "http://example.com/a")
            .unwrap()
            .build()
            .expect_err("normalized self-redirect must fail");
        assert!(matches!(error, Error::SelfRedirect { .. }));
    }

    #[test]
    fn reference_translation_keeps_pointer() {
        let translator = UriTranslator::builder()
            .schema_redirect("http://example.com/a", "http://example.com/b")
            .unwrap()
            .build()
            .unwrap();
        let reference = JsonRef::parse("http://example.com/a#/x/y").unwrap();
        let translated = translator.translate_ref(&reference).unwrap();
        assert_eq!(translated.locator_str(), "http://example.com/b");
        assert_eq!(translated.pointer(), reference.pointer());
    }
}
