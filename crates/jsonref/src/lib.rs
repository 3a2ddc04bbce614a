//! # jsonref
//!
//! Immutable JSON Pointer and JSON Reference value types, plus URI
//! namespace/redirect translation.
mod error;
mod pointer;
mod reference;
mod translator;
pub mod uri;

pub use error::Error;
pub use fluent_uri::{Uri, UriRef};
pub use pointer::{parse_index, unescape_token, JsonPointer};
pub use reference::JsonRef;
pub use translator::{UriTranslator, UriTranslatorBuilder};
