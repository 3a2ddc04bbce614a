//! # schema-core
//!
//! Structural validation and reference resolution for JSON Schema
//! documents: schema trees with canonical and inline dereferencing,
//! `$ref` chain resolution with loop and dangling detection, a generic
//! dialect-driven tree walker, per-keyword syntax checking, and a
//! memoizing analysis cache.
mod analyzer;
pub mod dialect;
mod error;
mod expander;
mod loader;
mod report;
mod resolver;
mod syntax;
mod tree;
mod types;
mod walker;

pub use analyzer::SchemaAnalyzer;
pub use dialect::{
    Dialect, DialectBuilder, DialectRegistry, DialectRegistryBuilder, KeywordChecker,
    PointerCollector, Refinement,
};
pub use error::Error;
pub use expander::SchemaExpander;
pub use jsonref::{JsonPointer, JsonRef, UriRef, UriTranslator};
pub use loader::{DefaultLoader, IntoLoader, LoadError, SchemaLoader, SchemeRegistry};
pub use report::{LogLevel, ProcessingMessage, ProcessingReport};
pub use resolver::RefResolver;
pub use syntax::SyntaxProcessor;
pub use tree::{Dereferencing, SchemaKey, SchemaTree};
pub use types::{NodeType, TypeSet};
pub use walker::{SchemaListener, SchemaWalker};
