//! Field precompiler.
//!
//! Turns a parsed [`TypeNode`] into a [`CompiledField`]: a closure
//! `(value, root) -> outcome` specialized for that node shape, so the hot
//! path never re-dispatches on the tree. Two strategies share one set of
//! leaf checks:
//!
//! - level ≥1 ([`build_validator`]): one closure per node variant, children
//!   precompiled once and captured. Conditionals compile *both* branches
//!   eagerly; branch selection at validation time is only the predicate
//!   evaluation.
//! - level 0 ([`interpret`]): generic tree walk, used under
//!   `skip_optimization`.
//!
//! The two paths must stay behaviorally identical (same success, same error
//! field set); optimization is a performance choice, never a semantics
//! choice.

use serde_json::Value;

use crate::ast::{Constraint, FormatKind, LitValue, PrimitiveKind, TypeNode};
use crate::engine::SchemaOptions;
use crate::error::{ErrorKind, ErrorRecord, prefix_all};
use crate::{cache, coerce, cond, formats};

/// `Ok(None)` = absent and allowed (omit from output); `Ok(Some)` carries
/// the possibly coerced value; `Err` is the collected failure list.
pub type Outcome = Result<Option<Value>, Vec<ErrorRecord>>;

/// A compiled check. `value` is `None` when the field is absent from the
/// input; `root` is the object currently being validated (for conditionals).
pub type ValidateFn = Box<dyn Fn(Option<&Value>, &Value) -> Outcome + Send + Sync>;

/// One field's compiled validator plus its compile-time metadata. Immutable
/// after construction and freely shareable across threads.
pub struct CompiledField {
    run: ValidateFn,
    pub is_precompiled: bool,
    pub source_hash: u64,
    pub optimization_level: u8,
}

impl CompiledField {
    pub fn compile(node: &TypeNode, opts: SchemaOptions) -> Self {
        let source_hash = cache::node_hash(node);
        if opts.skip_optimization {
            let node = node.clone();
            Self {
                run: Box::new(move |value, root| interpret(&node, value, root, opts)),
                is_precompiled: false,
                source_hash,
                optimization_level: 0,
            }
        } else {
            Self {
                run: build_validator(node, opts),
                is_precompiled: true,
                source_hash,
                optimization_level: 1,
            }
        }
    }

    pub fn check(&self, value: Option<&Value>, root: &Value) -> Outcome {
        (self.run)(value, root)
    }
}

// ----------------------------- Leaf checks -------------------------------- //
// Shared by both strategies so they cannot drift apart.

fn check_primitive(
    kind: PrimitiveKind,
    constraint: Option<&Constraint>,
    value: &Value,
    loose: bool,
) -> Result<Value, ErrorRecord> {
    if kind == PrimitiveKind::Any {
        return Ok(value.clone());
    }

    let expected = || {
        TypeNode::Primitive {
            kind,
            constraint: constraint.cloned(),
        }
        .describe()
    };

    // Type test, with one loose-coercion retry.
    let v = if type_ok(kind, value) {
        value.clone()
    } else if loose {
        match coerce::coerce(kind, value) {
            Some(c) if type_ok(kind, &c) => c,
            _ => return Err(ErrorRecord::new(ErrorKind::TypeMismatch, expected(), value)),
        }
    } else {
        return Err(ErrorRecord::new(ErrorKind::TypeMismatch, expected(), value));
    };

    // Built-in sign constraints.
    match kind {
        PrimitiveKind::Positive if v.as_f64().is_some_and(|n| n <= 0.0) => {
            return Err(ErrorRecord::new(ErrorKind::ConstraintViolation, expected(), &v));
        }
        PrimitiveKind::Negative if v.as_f64().is_some_and(|n| n >= 0.0) => {
            return Err(ErrorRecord::new(ErrorKind::ConstraintViolation, expected(), &v));
        }
        _ => {}
    }

    // Unparseable date strings are a constraint failure, not a type one.
    if kind == PrimitiveKind::Date && !v.as_str().is_some_and(formats::date_valid) {
        return Err(ErrorRecord::new(ErrorKind::ConstraintViolation, expected(), &v));
    }

    match constraint {
        None => Ok(v),
        Some(Constraint::Range { min, max }) => {
            // Numeric range for numbers, length for strings.
            let measured = match &v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => Some(s.chars().count() as f64),
                _ => None,
            };
            if let Some(m) = measured {
                if min.is_some_and(|lo| m < lo.0) || max.is_some_and(|hi| m > hi.0) {
                    return Err(ErrorRecord::new(
                        ErrorKind::ConstraintViolation,
                        expected(),
                        &v,
                    ));
                }
            }
            Ok(v)
        }
        Some(Constraint::Pattern(p)) => {
            if v.as_str().is_some_and(|s| !p.regex.is_match(s)) {
                return Err(ErrorRecord::new(
                    ErrorKind::ConstraintViolation,
                    expected(),
                    &v,
                ));
            }
            Ok(v)
        }
    }
}

fn type_ok(kind: PrimitiveKind, value: &Value) -> bool {
    match kind {
        PrimitiveKind::Any => true,
        PrimitiveKind::String | PrimitiveKind::Date => value.is_string(),
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Number
        | PrimitiveKind::Float
        | PrimitiveKind::Positive
        | PrimitiveKind::Negative => value.is_number(),
        PrimitiveKind::Int => value.as_f64().is_some_and(|n| n.fract() == 0.0),
    }
}

fn check_format(
    kind: FormatKind,
    constraint: Option<&Constraint>,
    value: &Value,
) -> Result<Value, ErrorRecord> {
    let expected = || {
        TypeNode::Format {
            kind,
            constraint: constraint.cloned(),
        }
        .describe()
    };
    let Some(s) = value.as_str() else {
        return Err(ErrorRecord::new(ErrorKind::TypeMismatch, expected(), value));
    };
    if !formats::matches(kind, s) {
        return Err(ErrorRecord::new(
            ErrorKind::ConstraintViolation,
            expected(),
            value,
        ));
    }
    // Length/pattern apply to the string after the format predicate.
    match constraint {
        None => {}
        Some(Constraint::Range { min, max }) => {
            let len = s.chars().count() as f64;
            if min.is_some_and(|lo| len < lo.0) || max.is_some_and(|hi| len > hi.0) {
                return Err(ErrorRecord::new(
                    ErrorKind::ConstraintViolation,
                    expected(),
                    value,
                ));
            }
        }
        Some(Constraint::Pattern(p)) => {
            if !p.regex.is_match(s) {
                return Err(ErrorRecord::new(
                    ErrorKind::ConstraintViolation,
                    expected(),
                    value,
                ));
            }
        }
    }
    Ok(value.clone())
}

fn check_literal(lit: &LitValue, value: &Value, loose: bool) -> Result<Value, ErrorRecord> {
    if lit.matches(value) {
        return Ok(value.clone());
    }
    if loose {
        let target = match lit {
            LitValue::Str(_) => PrimitiveKind::String,
            LitValue::Num(_) => PrimitiveKind::Number,
            LitValue::Bool(_) => PrimitiveKind::Boolean,
        };
        if let Some(c) = coerce::coerce(target, value) {
            if lit.matches(&c) {
                return Ok(c);
            }
        }
    }
    let same_type = matches!(
        (lit, value),
        (LitValue::Str(_), Value::String(_))
            | (LitValue::Num(_), Value::Number(_))
            | (LitValue::Bool(_), Value::Bool(_))
    );
    let kind = if same_type {
        ErrorKind::ConstraintViolation
    } else {
        ErrorKind::TypeMismatch
    };
    Err(ErrorRecord::new(
        kind,
        format!("={}", lit.describe()),
        value,
    ))
}

fn missing(describe: &str) -> Outcome {
    Err(vec![ErrorRecord::missing(describe)])
}

// ------------------------- Level 0: interpreter ----------------------------- //

/// Generic tree walk. Same semantics as the precompiled path, paid per call.
pub fn interpret(node: &TypeNode, value: Option<&Value>, root: &Value, opts: SchemaOptions) -> Outcome {
    match node {
        TypeNode::Optional(inner) => match value {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(Value::Null)),
            Some(v) => interpret(inner, Some(v), root, opts),
        },
        TypeNode::Conditional {
            predicate,
            then_branch,
            else_branch,
        } => {
            let branch = if cond::evaluate(predicate, root) {
                then_branch
            } else {
                else_branch
            };
            interpret(branch, value, root, opts)
        }
        TypeNode::Union(alts) => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            let mut failures = Vec::with_capacity(alts.len());
            for alt in alts {
                match interpret(alt, Some(v), root, opts) {
                    Ok(out) => return Ok(out),
                    Err(errs) => failures.extend(errs.into_iter().next()),
                }
            }
            Err(vec![union_error(&node.describe(), v, failures)])
        }
        TypeNode::Primitive { kind, constraint } => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            check_primitive(*kind, constraint.as_ref(), v, opts.loose)
                .map(Some)
                .map_err(|e| vec![e])
        }
        TypeNode::Format { kind, constraint } => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            check_format(*kind, constraint.as_ref(), v)
                .map(Some)
                .map_err(|e| vec![e])
        }
        TypeNode::Literal(lit) => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            check_literal(lit, v, opts.loose)
                .map(Some)
                .map_err(|e| vec![e])
        }
        TypeNode::ArrayOf {
            elem,
            min_items,
            max_items,
        } => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            let Some(items) = v.as_array() else {
                return Err(vec![ErrorRecord::new(
                    ErrorKind::TypeMismatch,
                    node.describe(),
                    v,
                )]);
            };
            if let Some(e) = length_violation(items.len(), *min_items, *max_items, &node.describe(), v)
            {
                return Err(vec![e]);
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match interpret(elem, Some(item), root, opts) {
                    Ok(checked) => out.push(checked.unwrap_or(Value::Null)),
                    // First failing item wins; report its index.
                    Err(errs) => return Err(prefix_all(errs, &format!("[{i}]"))),
                }
            }
            Ok(Some(Value::Array(out)))
        }
        TypeNode::RecordOf { key, value: val_ty } => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            let Some(entries) = v.as_object() else {
                return Err(vec![ErrorRecord::new(
                    ErrorKind::TypeMismatch,
                    node.describe(),
                    v,
                )]);
            };
            let mut out = serde_json::Map::new();
            for (k, item) in entries {
                let key_val = Value::String(k.clone());
                if let Err(errs) = interpret(key, Some(&key_val), root, opts) {
                    return Err(prefix_all(errs, k));
                }
                match interpret(val_ty, Some(item), root, opts) {
                    Ok(checked) => {
                        out.insert(k.clone(), checked.unwrap_or(Value::Null));
                    }
                    // First failing entry wins; report its key.
                    Err(errs) => return Err(prefix_all(errs, k)),
                }
            }
            Ok(Some(Value::Object(out)))
        }
        TypeNode::ObjectShape { fields } => {
            let Some(v) = value else {
                return missing(&node.describe());
            };
            let Some(obj) = v.as_object() else {
                return Err(vec![ErrorRecord::new(
                    ErrorKind::TypeMismatch,
                    "object",
                    v,
                )]);
            };
            let mut out = serde_json::Map::new();
            let mut errors = Vec::new();
            for (name, child) in fields {
                match interpret(child, obj.get(name), root, opts) {
                    Ok(None) => {}
                    Ok(Some(checked)) => {
                        out.insert(name.clone(), checked);
                    }
                    Err(errs) => errors.extend(prefix_all(errs, name)),
                }
            }
            apply_unknown_policy(obj, fields.iter().map(|(n, _)| n.as_str()), opts, &mut out, &mut errors);
            if errors.is_empty() {
                Ok(Some(Value::Object(out)))
            } else {
                Err(errors)
            }
        }
    }
}

fn union_error(describe: &str, value: &Value, alternatives: Vec<ErrorRecord>) -> ErrorRecord {
    ErrorRecord::new(ErrorKind::UnionNoMatch { alternatives }, describe, value)
}

fn length_violation(
    len: usize,
    min: Option<u32>,
    max: Option<u32>,
    describe: &str,
    value: &Value,
) -> Option<ErrorRecord> {
    let len = len as u32;
    if min.is_some_and(|lo| len < lo) || max.is_some_and(|hi| len > hi) {
        Some(ErrorRecord::new(
            ErrorKind::ConstraintViolation,
            describe,
            value,
        ))
    } else {
        None
    }
}

fn apply_unknown_policy<'a>(
    input: &serde_json::Map<String, Value>,
    declared: impl Iterator<Item = &'a str>,
    opts: SchemaOptions,
    out: &mut serde_json::Map<String, Value>,
    errors: &mut Vec<ErrorRecord>,
) {
    let declared: std::collections::HashSet<&str> = declared.collect();
    for (k, v) in input {
        if declared.contains(k.as_str()) {
            continue;
        }
        if opts.strict {
            let mut e = ErrorRecord::new(ErrorKind::UnknownField, "declared field", v);
            e.field = k.clone();
            errors.push(e);
        } else if opts.allow_unknown {
            out.insert(k.clone(), v.clone());
        }
        // Default: unknown keys are dropped from the output.
    }
}

// ----------------------- Level ≥1: closure builder -------------------------- //

/// One precompiled closure per node variant. Children are compiled once and
/// captured; constraints are interpreted here, at build time, not per input.
pub fn build_validator(node: &TypeNode, opts: SchemaOptions) -> ValidateFn {
    match node {
        TypeNode::Primitive { kind, constraint } => {
            let describe = node.describe();
            let kind = *kind;
            let constraint = constraint.clone();
            let loose = opts.loose;
            Box::new(move |value, _root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                check_primitive(kind, constraint.as_ref(), v, loose)
                    .map(Some)
                    .map_err(|e| vec![e])
            })
        }
        TypeNode::Format { kind, constraint } => {
            let describe = node.describe();
            let kind = *kind;
            let constraint = constraint.clone();
            Box::new(move |value, _root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                check_format(kind, constraint.as_ref(), v)
                    .map(Some)
                    .map_err(|e| vec![e])
            })
        }
        TypeNode::Literal(lit) => {
            let describe = node.describe();
            let lit = lit.clone();
            let loose = opts.loose;
            Box::new(move |value, _root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                check_literal(&lit, v, loose).map(Some).map_err(|e| vec![e])
            })
        }
        TypeNode::Union(alts) => {
            let describe = node.describe();
            let children: Vec<ValidateFn> = alts.iter().map(|a| build_validator(a, opts)).collect();
            Box::new(move |value, root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                let mut failures = Vec::with_capacity(children.len());
                for child in &children {
                    match child(Some(v), root) {
                        Ok(out) => return Ok(out),
                        Err(errs) => failures.extend(errs.into_iter().next()),
                    }
                }
                Err(vec![union_error(&describe, v, failures)])
            })
        }
        TypeNode::ArrayOf {
            elem,
            min_items,
            max_items,
        } => {
            let describe = node.describe();
            let elem = build_validator(elem, opts);
            let (min, max) = (*min_items, *max_items);
            Box::new(move |value, root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                let Some(items) = v.as_array() else {
                    return Err(vec![ErrorRecord::new(ErrorKind::TypeMismatch, &*describe, v)]);
                };
                if let Some(e) = length_violation(items.len(), min, max, &describe, v) {
                    return Err(vec![e]);
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match elem(Some(item), root) {
                        Ok(checked) => out.push(checked.unwrap_or(Value::Null)),
                        Err(errs) => return Err(prefix_all(errs, &format!("[{i}]"))),
                    }
                }
                Ok(Some(Value::Array(out)))
            })
        }
        TypeNode::RecordOf { key, value: val_ty } => {
            let describe = node.describe();
            let key = build_validator(key, opts);
            let val_ty = build_validator(val_ty, opts);
            Box::new(move |value, root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                let Some(entries) = v.as_object() else {
                    return Err(vec![ErrorRecord::new(ErrorKind::TypeMismatch, &*describe, v)]);
                };
                let mut out = serde_json::Map::new();
                for (k, item) in entries {
                    let key_val = Value::String(k.clone());
                    if let Err(errs) = key(Some(&key_val), root) {
                        return Err(prefix_all(errs, k));
                    }
                    match val_ty(Some(item), root) {
                        Ok(checked) => {
                            out.insert(k.clone(), checked.unwrap_or(Value::Null));
                        }
                        Err(errs) => return Err(prefix_all(errs, k)),
                    }
                }
                Ok(Some(Value::Object(out)))
            })
        }
        TypeNode::ObjectShape { fields } => {
            let describe = node.describe();
            let children: Vec<(String, ValidateFn)> = fields
                .iter()
                .map(|(n, c)| (n.clone(), build_validator(c, opts)))
                .collect();
            Box::new(move |value, root| {
                let Some(v) = value else {
                    return missing(&describe);
                };
                let Some(obj) = v.as_object() else {
                    return Err(vec![ErrorRecord::new(ErrorKind::TypeMismatch, "object", v)]);
                };
                let mut out = serde_json::Map::new();
                let mut errors = Vec::new();
                for (name, child) in &children {
                    match child(obj.get(name), root) {
                        Ok(None) => {}
                        Ok(Some(checked)) => {
                            out.insert(name.clone(), checked);
                        }
                        Err(errs) => errors.extend(prefix_all(errs, name)),
                    }
                }
                apply_unknown_policy(
                    obj,
                    children.iter().map(|(n, _)| n.as_str()),
                    opts,
                    &mut out,
                    &mut errors,
                );
                if errors.is_empty() {
                    Ok(Some(Value::Object(out)))
                } else {
                    Err(errors)
                }
            })
        }
        TypeNode::Conditional {
            predicate,
            then_branch,
            else_branch,
        } => {
            // Both branches are compiled now, at schema-build time. Picking
            // one per call costs only the predicate evaluation.
            let predicate = predicate.clone();
            let then_v = build_validator(then_branch, opts);
            let else_v = build_validator(else_branch, opts);
            Box::new(move |value, root| {
                if cond::evaluate(&predicate, root) {
                    then_v(value, root)
                } else {
                    else_v(value, root)
                }
            })
        }
        TypeNode::Optional(inner) => {
            let inner = build_validator(inner, opts);
            Box::new(move |value, root| match value {
                None => Ok(None),
                Some(Value::Null) => Ok(Some(Value::Null)),
                Some(v) => inner(Some(v), root),
            })
        }
    }
}

// -------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use serde_json::json;

    fn both_paths(expr: &str, value: Option<&Value>, root: &Value) -> (Outcome, Outcome) {
        let node = parse(expr).unwrap();
        let fast = CompiledField::compile(&node, SchemaOptions::default());
        let slow = CompiledField::compile(
            &node,
            SchemaOptions {
                skip_optimization: true,
                ..SchemaOptions::default()
            },
        );
        (fast.check(value, root), slow.check(value, root))
    }

    fn check(expr: &str, value: &Value) -> Outcome {
        let root = json!({});
        let (fast, slow) = both_paths(expr, Some(value), &root);
        // Optimization transparency: success and error field set agree.
        assert_eq!(fast.is_ok(), slow.is_ok(), "paths disagree for {expr}");
        if let (Err(a), Err(b)) = (&fast, &slow) {
            let fa: Vec<_> = a.iter().map(|e| &e.field).collect();
            let fb: Vec<_> = b.iter().map(|e| &e.field).collect();
            assert_eq!(fa, fb, "error fields disagree for {expr}");
        }
        fast
    }

    #[test]
    fn metadata_reflects_the_strategy() {
        let node = parse("string").unwrap();
        let fast = CompiledField::compile(&node, SchemaOptions::default());
        assert!(fast.is_precompiled);
        assert_eq!(fast.optimization_level, 1);
        let slow = CompiledField::compile(
            &node,
            SchemaOptions {
                skip_optimization: true,
                ..SchemaOptions::default()
            },
        );
        assert!(!slow.is_precompiled);
        assert_eq!(slow.optimization_level, 0);
        assert_eq!(fast.source_hash, slow.source_hash);
    }

    #[test]
    fn primitives_and_constraints() {
        assert!(check("string(3,20)", &json!("hello")).is_ok());
        let err = check("string(3,20)", &json!("hi")).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::ConstraintViolation));
        let err = check("string(3,20)", &json!(42)).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::TypeMismatch));

        assert!(check("number(,100)", &json!(-5)).is_ok());
        assert!(check("number(1,)", &json!(1)).is_ok());
        assert!(check("int", &json!(3)).is_ok());
        assert!(check("int", &json!(3.5)).is_err());
        assert!(check("positive", &json!(2)).is_ok());
        assert!(check("positive", &json!(-2)).is_err());
        assert!(check("negative", &json!(-2)).is_ok());
        assert!(check("negative", &json!(0)).is_err());
    }

    #[test]
    fn pattern_constraint_checks_strings() {
        assert!(check(r"string(/^[a-z]+$/)", &json!("abc")).is_ok());
        assert!(check(r"string(/^[a-z]+$/)", &json!("Abc")).is_err());
    }

    #[test]
    fn union_first_match_wins_and_aggregate_reports_all() {
        assert_eq!(
            check("admin|user", &json!("admin")).unwrap(),
            Some(json!("admin"))
        );
        let err = check("admin|user", &json!("guest")).unwrap_err();
        let ErrorKind::UnionNoMatch { alternatives } = &err[0].kind else {
            panic!("expected aggregate union error");
        };
        assert_eq!(alternatives.len(), 2);
    }

    #[test]
    fn arrays_short_circuit_but_report_the_index() {
        assert!(check("number[]", &json!([1, 2, 3])).is_ok());
        let err = check("number[]", &json!([1, "x", "y"])).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].field, "[1]");
        let err = check("number[](2,3)", &json!([1])).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::ConstraintViolation));
    }

    #[test]
    fn records_validate_per_entry_and_report_the_key() {
        assert!(check("record<string,number>", &json!({"a": 1})).is_ok());
        let err = check("record<string,number>", &json!({"test": "ok"})).unwrap_err();
        assert_eq!(err[0].field, "test");
    }

    #[test]
    fn conditional_selects_branch_from_live_root() {
        let node = parse("when role === admin *? number(1,10) : any?").unwrap();
        let field = CompiledField::compile(&node, SchemaOptions::default());

        let admin = json!({"role": "admin"});
        assert!(field.check(Some(&json!(5)), &admin).is_ok());
        assert!(field.check(Some(&json!(99)), &admin).is_err());

        let user = json!({"role": "user"});
        assert!(field.check(Some(&json!("anything")), &user).is_ok());
        assert_eq!(field.check(None, &user).unwrap(), None);
        // then-branch is required: absence fails for admins
        assert!(field.check(None, &admin).is_err());
    }

    #[test]
    fn optional_short_circuits_without_running_inner() {
        let root = json!({});
        let (fast, slow) = both_paths("number(1,10)?", None, &root);
        assert_eq!(fast.unwrap(), None);
        assert_eq!(slow.unwrap(), None);
        assert!(check("number(1,10)?", &json!(null)).is_ok());
        assert!(check("number(1,10)?", &json!(11)).is_err());
    }

    #[test]
    fn loose_coerces_before_constraint_checks() {
        let node = parse("number(1,10)").unwrap();
        let loose = CompiledField::compile(
            &node,
            SchemaOptions {
                loose: true,
                ..SchemaOptions::default()
            },
        );
        let root = json!({});
        assert_eq!(loose.check(Some(&json!("5")), &root).unwrap(), Some(json!(5)));
        // coerced value still hits the range constraint
        assert!(loose.check(Some(&json!("50")), &root).is_err());
        // coercion failure is an ordinary type mismatch
        let err = loose.check(Some(&json!("abc")), &root).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::TypeMismatch));
    }

    #[test]
    fn formats_distinguish_type_and_constraint_failures() {
        assert!(check("email", &json!("a@b.co")).is_ok());
        let err = check("email", &json!("nope")).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::ConstraintViolation));
        let err = check("email", &json!(3)).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::TypeMismatch));
    }

    #[test]
    fn format_constraints_check_the_matched_string() {
        assert!(check("email(10,50)", &json!("longer@example.com")).is_ok());
        // Valid email, but too short for the length constraint.
        let err = check("email(10,50)", &json!("a@b.co")).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::ConstraintViolation));
        assert_eq!(err[0].expected, "email(10,50)");

        assert!(check(r"email(/@example\.com$/)", &json!("x@example.com")).is_ok());
        let err = check(r"email(/@example\.com$/)", &json!("x@other.com")).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::ConstraintViolation));

        // Wrong type stays a type error, constraint or not.
        let err = check("email(10,50)", &json!(3)).unwrap_err();
        assert!(matches!(err[0].kind, ErrorKind::TypeMismatch));
    }

    #[test]
    fn missing_required_value_reports_missing() {
        let root = json!({});
        let (fast, _) = both_paths("string", None, &root);
        let err = fast.unwrap_err();
        assert_eq!(err[0].received_type, "missing");
    }
}
