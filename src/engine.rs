//! Schema compilation entry point and validation engine.
//!
//! A schema definition is a field map: field name → type expression string,
//! or a nested map (which becomes an object shape). Compiling parses every
//! expression, canonically hashes the result, and reuses a previously
//! compiled validator set from the cache when one exists.
//!
//! Validation failure is data, not a fault: `validate` always returns a
//! report; only malformed definitions fail `compile`.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ast::TypeNode;
use crate::cache::{self, SchemaCache};
use crate::compile::CompiledField;
use crate::error::{ErrorKind, ErrorRecord, GrammarError, prefix_all};
use crate::parse::parse;

/// Option bag accepted by the compile entry point. `strict`,
/// `allow_unknown` and `loose` change semantics (and schema identity);
/// `skip_optimization` only selects the interpreted validator path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Reject any input key not declared in the schema.
    pub strict: bool,
    /// Pass undeclared input keys through into the output untouched.
    pub allow_unknown: bool,
    /// Attempt type coercion (e.g. `"123"` → `123`) before constraint checks.
    pub loose: bool,
    /// Use the generic tree interpreter instead of precompiled closures.
    pub skip_optimization: bool,
}

/// One field of a schema definition: a type expression, or a nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Expr(String),
    Nested(IndexMap<String, FieldSpec>),
}

/// A schema definition as authored: field name → spec, in declared order.
/// Duplicate keys in a source document keep the last occurrence's value.
pub type SchemaDef = IndexMap<String, FieldSpec>;

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub success: bool,
    /// The (possibly coerced) accepted data; `None` on failure.
    pub data: Option<Value>,
    /// Every violation found in one pass, in declared field order.
    pub errors: Vec<ErrorRecord>,
}

/// The whole-schema compiled validator set. Owned by the cache entry;
/// immutable after construction.
pub struct CompiledSchema {
    hash: u64,
    options: SchemaOptions,
    fields: Vec<(String, CompiledField)>,
    declared: HashSet<String>,
}

impl CompiledSchema {
    fn build(hash: u64, parsed: Vec<(String, TypeNode)>, options: SchemaOptions) -> Self {
        let declared = parsed.iter().map(|(n, _)| n.clone()).collect();
        let fields = parsed
            .into_iter()
            .map(|(name, node)| {
                let compiled = CompiledField::compile(&node, options);
                (name, compiled)
            })
            .collect();
        Self {
            hash,
            options,
            fields,
            declared,
        }
    }
}

/// A reusable validator for one schema shape. Cheap to clone; validation
/// borrows the compiled fields and never mutates them.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<CompiledSchema>,
}

impl Schema {
    /// Compile against the process-wide cache.
    pub fn compile(def: &SchemaDef, options: SchemaOptions) -> Result<Self, GrammarError> {
        Self::compile_in(cache::global(), def, options)
    }

    /// Compile against an explicit cache (isolated caches for tests, or
    /// per-tenant caches in a host).
    pub fn compile_in(
        cache: &SchemaCache,
        def: &SchemaDef,
        options: SchemaOptions,
    ) -> Result<Self, GrammarError> {
        let parsed = parse_def(def)?;
        let hash = cache::canonical_hash(&parsed, &options);
        let inner = cache.get_or_compile(hash, options.skip_optimization, || {
            Arc::new(CompiledSchema::build(hash, parsed, options))
        });
        Ok(Self { inner })
    }

    /// Canonical identity of this schema shape + semantic options.
    pub fn hash(&self) -> u64 {
        self.inner.hash
    }

    pub fn options(&self) -> SchemaOptions {
        self.inner.options
    }

    /// Per-field compiled validators, in declared order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &CompiledField)> {
        self.inner.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Validate one input object. Collects every field's errors in one
    /// pass; within a single field, union/array/record checks short-circuit.
    pub fn validate(&self, input: &Value) -> ValidationReport {
        let Some(obj) = input.as_object() else {
            return ValidationReport {
                success: false,
                data: None,
                errors: vec![ErrorRecord::new(ErrorKind::TypeMismatch, "object", input)],
            };
        };

        let opts = self.inner.options;
        let mut data = serde_json::Map::new();
        let mut errors = Vec::new();

        for (name, field) in &self.inner.fields {
            match field.check(obj.get(name), input) {
                Ok(None) => {}
                Ok(Some(value)) => {
                    data.insert(name.clone(), value);
                }
                Err(errs) => errors.extend(prefix_all(errs, name)),
            }
        }

        for (key, value) in obj {
            if self.inner.declared.contains(key) {
                continue;
            }
            if opts.strict {
                let mut e = ErrorRecord::new(ErrorKind::UnknownField, "declared field", value);
                e.field = key.clone();
                errors.push(e);
            } else if opts.allow_unknown {
                data.insert(key.clone(), value.clone());
            }
            // Default: undeclared keys are dropped from the output.
        }

        let success = errors.is_empty();
        ValidationReport {
            success,
            data: success.then(|| Value::Object(data)),
            errors,
        }
    }
}

fn parse_def(def: &SchemaDef) -> Result<Vec<(String, TypeNode)>, GrammarError> {
    def.iter()
        .map(|(name, spec)| Ok((name.clone(), spec_to_node(spec)?)))
        .collect()
}

fn spec_to_node(spec: &FieldSpec) -> Result<TypeNode, GrammarError> {
    match spec {
        FieldSpec::Expr(expr) => parse(expr),
        FieldSpec::Nested(map) => {
            let fields = map
                .iter()
                .map(|(name, child)| Ok((name.clone(), spec_to_node(child)?)))
                .collect::<Result<Vec<_>, GrammarError>>()?;
            Ok(TypeNode::ObjectShape { fields })
        }
    }
}

/// Convenience for building a [`SchemaDef`] from expression pairs.
pub fn schema_def(pairs: &[(&str, &str)]) -> SchemaDef {
    pairs
        .iter()
        .map(|(name, expr)| (name.to_string(), FieldSpec::Expr(expr.to_string())))
        .collect()
}

// -------------------------------- Tests ------------------------------------ //
