//! Thin helpers over `fluent-uri`.
//!
//! Every fluent-uri call in the crate goes through this module, so URI
//! handling stays in one place.

use fluent_uri::{Uri, UriRef};

use crate::Error;

/// Parse a URI reference (absolute or relative).
///
/// # Errors
///
/// Returns an error if the input is not a valid RFC 3986 URI reference.
pub fn parse_ref(input: &str) -> Result<UriRef<String>, Error> {
    UriRef::parse(input.to_owned()).map_err(|(e, _)| Error::invalid_uri(input, e))
}

/// Parse an absolute URI (scheme required).
///
/// # Errors
///
/// Returns an error if the input is not a valid absolute URI.
pub fn parse_absolute(input: &str) -> Result<Uri<String>, Error> {
    Uri::parse(input.to_owned()).map_err(|(e, _)| Error::invalid_uri(input, e))
}

/// Whether the reference is an absolute URI (carries a scheme).
#[must_use]
pub fn is_absolute(uri: &UriRef<String>) -> bool {
    uri.scheme().is_some()
}

/// Whether the reference is opaque: absolute, no authority, and a rootless
/// non-empty path (e.g. `jar:file:/a.jar!/entry`).
#[must_use]
pub fn is_opaque(uri: &UriRef<String>) -> bool {
    uri.scheme().is_some()
        && uri.authority().is_none()
        && !uri.path().as_str().is_empty()
        && !uri.path().as_str().starts_with('/')
}

/// Resolve `reference` against `base` per RFC 3986.
///
/// A reference with a scheme is returned as-is. Resolution against a
/// relative base is not defined by RFC 3986; the reference is returned
/// unchanged in that case.
///
/// # Errors
///
/// Returns an error if the underlying resolution fails (e.g. a
/// network-path reference against an authority-less base).
pub fn resolve(base: &UriRef<String>, reference: &UriRef<String>) -> Result<UriRef<String>, Error> {
    if reference.scheme().is_some() || base.scheme().is_none() {
        return Ok(reference.clone());
    }
    let absolute = parse_absolute(base.as_str())?;
    let resolved = reference
        .resolve_against(&absolute)
        .map_err(|e| Error::resolution(base.as_str(), reference.as_str(), e))?;
    parse_ref(resolved.as_str())
}

/// RFC 3986 syntax-based normalization, plus dropping explicit default
/// ports (fluent-uri leaves ports alone).
///
/// # Errors
///
/// Returns an error only if re-parsing the normalized form fails, which
/// does not happen for inputs produced by [`parse_ref`].
pub fn normalize(uri: &UriRef<String>) -> Result<UriRef<String>, Error> {
    let normalized = uri.normalize();
    match strip_default_port(normalized.as_str()) {
        Some(stripped) => parse_ref(&stripped),
        None => parse_ref(normalized.as_str()),
    }
}

/// Split a raw reference string into its fragment-less part and fragment.
#[must_use]
pub(crate) fn split_fragment(input: &str) -> (&str, Option<&str>) {
    match input.split_once('#') {
        Some((uri, fragment)) => (uri, Some(fragment)),
        None => (input, None),
    }
}

fn strip_default_port(input: &str) -> Option<String> {
    let (scheme, rest) = input.split_once(':')?;
    let default = match scheme {
        "http" | "ws" => ":80",
        "https" | "wss" => ":443",
        "ftp" => ":21",
        _ => return None,
    };
    let rest = rest.strip_prefix("//")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let authority = rest[..end].strip_suffix(default)?;
    Some(format!("{scheme}://{authority}{}", &rest[end..]))
}

#[cfg(test)]
mod tests {
    use super::{is_absolute, is_opaque, normalize, parse_ref, resolve, split_fragment};

    #[test]
    fn classification() {
        assert!(is_absolute(&parse_ref("http://example.com/a").unwrap()));
        assert!(!is_absolute(&parse_ref("a/b").unwrap()));
        assert!(is_opaque(&parse_ref("jar:file:/x.jar!/a").unwrap()));
        assert!(!is_opaque(&parse_ref("http://example.com/a").unwrap()));
        assert!(!is_opaque(&parse_ref("file:/a/b").unwrap()));
    }

    #[test]
    fn hierarchical_resolution() {
        let base = parse_ref("http://example.com/a/b").unwrap();
        let reference = parse_ref("c").unwrap();
        assert_eq!(
            resolve(&base, &reference).unwrap().as_str(),
            "http://example.com/a/c"
        );
        let up = parse_ref("../d").unwrap();
        assert_eq!(
            resolve(&base, &up).unwrap().as_str(),
            "http://example.com/d"
        );
    }

    #[test]
    fn absolute_reference_wins() {
        let base = parse_ref("http://example.com/a/b").unwrap();
        let reference = parse_ref("https://other.org/x").unwrap();
        assert_eq!(
            resolve(&base, &reference).unwrap().as_str(),
            "https://other.org/x"
        );
    }

    #[test]
    fn relative_base_passes_reference_through() {
        let base = parse_ref("a/b").unwrap();
        let reference = parse_ref("c").unwrap();
        assert_eq!(resolve(&base, &reference).unwrap().as_str(), "c");
    }

    #[test]
    fn normalization() {
        let uri = parse_ref("HTTP://Example.COM:80/a/../b").unwrap();
        assert_eq!(normalize(&uri).unwrap().as_str(), "http://example.com/b");
        // Non-default ports survive
        let uri = parse_ref("http://example.com:8080/a").unwrap();
        assert_eq!(
            normalize(&uri).unwrap().as_str(),
            "http://example.com:8080/a"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["HTTPS://Example.com:443/x/./y", "foo/../bar", "jar:file:/x.jar!/a"] {
            let once = normalize(&parse_ref(input).unwrap()).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once.as_str(), twice.as_str());
        }
    }

    #[test]
    fn illegal_input_is_reported() {
        let error = parse_ref("http://exa mple.com/").expect_err("space is illegal");
        assert!(matches!(error, crate::Error::InvalidUri { .. }));
        let error = super::parse_absolute("no-scheme").expect_err("scheme is required");
        assert!(matches!(error, crate::Error::InvalidUri { .. }));
    }

    #[test]
    fn fragment_splitting() {
        assert_eq!(split_fragment("a#b"), ("a", Some("b")));
        assert_eq!(split_fragment("a"), ("a", None));
        assert_eq!(split_fragment("#/x"), ("", Some("/x")));
    }
}
