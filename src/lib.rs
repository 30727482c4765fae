//! Runtime data validation driven by a compact string-based type grammar.
//!
//! A schema is a field map from name to a type expression such as
//! `"string(3,20)"`, `"record<string,number>"`, `"admin|user|guest"` or
//! `"when role === admin *? number(1,10) : any?"`. Compiling a schema
//! parses every expression into a typed tree, lowers each tree into a
//! specialized closure-based validator (no generic dispatch on the hot
//! path), and deduplicates the compiled set through a canonical-hash cache.
//! Validation is a pure, synchronous call returning either the (possibly
//! coerced) data or a structured error list.
//!
//! Design notes:
//! - Grammar keywords resolve to a closed tagged-variant tree at parse
//!   time; validation never re-inspects a string.
//! - Conditional fields compile both branches eagerly; branch selection
//!   per call costs only a predicate evaluation against the live input.
//! - The interpreted path (`skip_optimization`) and the precompiled path
//!   are behaviorally identical; optimization never changes semantics.
//!
//! ```
//! use serde_json::json;
//! use typefence::{Schema, SchemaOptions, schema_def};
//!
//! let def = schema_def(&[
//!     ("role", "admin|user"),
//!     ("adminLevel", "when role === admin *? number(1,10) : any?"),
//! ]);
//! let schema = Schema::compile(&def, SchemaOptions::default()).unwrap();
//!
//! assert!(schema.validate(&json!({"role": "admin", "adminLevel": 5})).success);
//! assert!(!schema.validate(&json!({"role": "admin", "adminLevel": 99})).success);
//! ```

pub mod ast;
pub mod cache;
pub mod cli;
pub mod coerce;
pub mod compile;
pub mod cond;
pub mod engine;
pub mod error;
pub mod formats;
pub mod parse;

pub use ast::TypeNode;
pub use cache::SchemaCache;
pub use compile::CompiledField;
pub use engine::{FieldSpec, Schema, SchemaDef, SchemaOptions, ValidationReport, schema_def};
pub use error::{ErrorKind, ErrorRecord, GrammarError};
pub use parse::parse;
