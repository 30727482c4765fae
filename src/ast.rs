// Strongly-typed nodes for the type grammar. No serde_json::Value here.

use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use regex::Regex;

/// One node of a parsed type expression. Trees are immutable and acyclic;
/// every keyword/constraint is resolved at parse time, so validation never
/// re-inspects a string.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Primitive {
        kind: PrimitiveKind,
        constraint: Option<Constraint>,
    },
    Format {
        kind: FormatKind,
        constraint: Option<Constraint>,
    },
    Literal(LitValue),
    /// Ordered alternatives; first match wins.
    Union(Vec<TypeNode>),
    ArrayOf {
        elem: Box<TypeNode>,
        min_items: Option<u32>,
        max_items: Option<u32>,
    },
    /// Open mapping: every key checked against `key`, every value against `value`.
    RecordOf {
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    /// Nested structural schema, fields in declared order (last duplicate wins).
    ObjectShape {
        fields: Vec<(String, TypeNode)>,
    },
    Conditional {
        predicate: ConditionExpr,
        then_branch: Box<TypeNode>,
        else_branch: Box<TypeNode>,
    },
    /// Absent/null short-circuits to success.
    Optional(Box<TypeNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
    Date,
    Any,
    Int,
    Float,
    Positive,
    Negative,
}

impl PrimitiveKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "any" => Self::Any,
            "int" => Self::Int,
            "float" => Self::Float,
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Any => "any",
            Self::Int => "int",
            Self::Float => "float",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Email,
    Url,
    Uuid,
    Phone,
    Ip,
    Base64,
    Jwt,
    Semver,
    Slug,
}

impl FormatKind {
    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "email" => Self::Email,
            "url" => Self::Url,
            "uuid" => Self::Uuid,
            "phone" => Self::Phone,
            "ip" => Self::Ip,
            "base64" => Self::Base64,
            "jwt" => Self::Jwt,
            "semver" => Self::Semver,
            "slug" => Self::Slug,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Uuid => "uuid",
            Self::Phone => "phone",
            Self::Ip => "ip",
            Self::Base64 => "base64",
            Self::Jwt => "jwt",
            Self::Semver => "semver",
            Self::Slug => "slug",
        }
    }
}

/// Constraint suffix on a primitive: `(min,max)` range/length, either bound
/// omittable, or a `(/regex/)` pattern compiled once at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    Range {
        min: Option<OrderedFloat<f64>>,
        max: Option<OrderedFloat<f64>>,
    },
    Pattern(PatternConstraint),
}

/// A pattern constraint keeps both the source text (identity: equality and
/// hashing) and the compiled regex (hot path: matching).
#[derive(Debug, Clone)]
pub struct PatternConstraint {
    pub source: String,
    pub regex: Regex,
}

impl PartialEq for PatternConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}
impl Eq for PatternConstraint {}
impl Hash for PatternConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

/// Literal tokens are typed once at parse time: `=42` is a number literal,
/// `=true` a boolean, anything else a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LitValue {
    Str(String),
    Num(OrderedFloat<f64>),
    Bool(bool),
}

impl LitValue {
    pub fn from_token(token: &str) -> Self {
        if token == "true" {
            return Self::Bool(true);
        }
        if token == "false" {
            return Self::Bool(false);
        }
        if let Ok(n) = token.parse::<f64>() {
            return Self::Num(OrderedFloat(n));
        }
        Self::Str(token.to_string())
    }

    /// Exact equality against a runtime value. Numbers compare numerically
    /// (the input may be i64/u64/f64 under the hood).
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::Str(s) => value.as_str() == Some(s.as_str()),
            Self::Num(n) => value.as_f64() == Some(n.0),
            Self::Bool(b) => value.as_bool() == Some(*b),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Num(n) => format!("{}", n.0),
            Self::Bool(b) => format!("{b}"),
        }
    }
}

/// Runtime predicate of a conditional field. Built once at parse time,
/// evaluated fresh against the live root object on every validation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionExpr {
    /// Dot-separated access path, resolved against the root object being
    /// validated (sibling/nested lookup), never against the node under test.
    pub path: Vec<String>,
    pub op: ConditionOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    Exists,
    Empty,
    In(Vec<LitValue>),
    Between(OrderedFloat<f64>, OrderedFloat<f64>),
    Equals(LitValue),
}

impl TypeNode {
    /// Human-readable expected-type description used in error records.
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive { kind, constraint } => {
                constrained_keyword(kind.keyword(), constraint)
            }
            Self::Format { kind, constraint } => {
                constrained_keyword(kind.keyword(), constraint)
            }
            Self::Literal(lit) => format!("={}", lit.describe()),
            Self::Union(alts) => alts
                .iter()
                .map(Self::describe)
                .collect::<Vec<_>>()
                .join("|"),
            Self::ArrayOf { elem, .. } => format!("{}[]", elem.describe()),
            Self::RecordOf { key, value } => {
                format!("record<{},{}>", key.describe(), value.describe())
            }
            Self::ObjectShape { .. } => "object".to_string(),
            Self::Conditional {
                then_branch,
                else_branch,
                ..
            } => format!("{} or {}", then_branch.describe(), else_branch.describe()),
            Self::Optional(inner) => format!("{}?", inner.describe()),
        }
    }
}

fn constrained_keyword(word: &str, constraint: &Option<Constraint>) -> String {
    match constraint {
        None => word.to_string(),
        Some(Constraint::Range { min, max }) => {
            let lo = min.map(|m| format!("{}", m.0)).unwrap_or_default();
            let hi = max.map(|m| format!("{}", m.0)).unwrap_or_default();
            format!("{word}({lo},{hi})")
        }
        Some(Constraint::Pattern(p)) => format!("{word}(/{}/)", p.source),
    }
}
