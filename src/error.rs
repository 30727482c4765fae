//! Error taxonomy.
//!
//! Two worlds, deliberately separate:
//! - [`GrammarError`] is a build-time fault: a malformed type expression
//!   aborts schema construction and is the only error surfaced as `Err`.
//! - [`ErrorRecord`] is validation *data*: per-value failures are collected
//!   into the report, never thrown.

use serde::Serialize;
use serde_json::Value;

/// Malformed type expression. Fatal at schema-build time, never raised at
/// validation time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grammar error at position {position}: expected {expected}, found {found}")]
pub struct GrammarError {
    /// Byte offset into the expression string.
    pub position: usize,
    pub expected: String,
    pub found: String,
}

impl GrammarError {
    pub fn new(position: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            position,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// One structured validation failure: where, what was expected, what arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Dotted/indexed path from the input root, e.g. `rec.test` or `items[2]`.
    pub field: String,
    pub kind: ErrorKind,
    /// Expected-type description in grammar surface syntax.
    pub expected: String,
    /// The offending value as received (after coercion, if any applied).
    pub received: Value,
    /// Runtime type name of `received`: "string", "number", ..., or "missing".
    pub received_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Runtime type disagrees with the expected type.
    TypeMismatch,
    /// Type matched but a range/length/pattern/membership constraint failed.
    ConstraintViolation,
    /// Input key not declared in the schema (strict mode only).
    UnknownField,
    /// Every union alternative failed; wraps one sub-error per alternative.
    UnionNoMatch { alternatives: Vec<ErrorRecord> },
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, expected: impl Into<String>, received: &Value) -> Self {
        Self {
            field: String::new(),
            kind,
            expected: expected.into(),
            received: received.clone(),
            received_type: type_name_of(received),
        }
    }

    /// A record for a field that was required but absent from the input.
    pub fn missing(expected: impl Into<String>) -> Self {
        Self {
            field: String::new(),
            kind: ErrorKind::TypeMismatch,
            expected: expected.into(),
            received: Value::Null,
            received_type: "missing",
        }
    }

    /// Prepend a path segment. `seg` is either a field name (joined with a
    /// dot) or an index like `[2]` (joined bare).
    pub fn prefixed(mut self, seg: &str) -> Self {
        self.field = join_path(seg, &self.field);
        if let ErrorKind::UnionNoMatch { alternatives } = &mut self.kind {
            for alt in alternatives.iter_mut() {
                alt.field = join_path(seg, &alt.field);
            }
        }
        self
    }
}

pub fn prefix_all(errors: Vec<ErrorRecord>, seg: &str) -> Vec<ErrorRecord> {
    errors.into_iter().map(|e| e.prefixed(seg)).collect()
}

fn join_path(seg: &str, rest: &str) -> String {
    if rest.is_empty() {
        seg.to_string()
    } else if rest.starts_with('[') {
        format!("{seg}{rest}")
    } else {
        format!("{seg}.{rest}")
    }
}

/// Runtime type name used in error records.
pub fn type_name_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let what = match &self.kind {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::ConstraintViolation => "constraint violation",
            ErrorKind::UnknownField => "unknown field",
            ErrorKind::UnionNoMatch { .. } => "no union alternative matched",
        };
        write!(
            f,
            "{}: {what}: expected {}, got {} ({})",
            if self.field.is_empty() { "<root>" } else { &self.field },
            self.expected,
            self.received,
            self.received_type
        )
    }
}
