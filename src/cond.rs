//! Runtime predicate evaluation for conditional fields.
//!
//! Predicates are resolved against the root object *currently being
//! validated*, never against compile-time state: the evaluator is pure,
//! side-effect free, and re-run on every validation call.

use serde_json::Value;

use crate::ast::{ConditionExpr, ConditionOp};

/// Walk a dot-separated path from the root. Any missing key or non-object
/// intermediate yields `None`.
pub fn resolve_path<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path {
        cur = cur.as_object()?.get(seg)?;
    }
    Some(cur)
}

pub fn evaluate(expr: &ConditionExpr, root: &Value) -> bool {
    let resolved = resolve_path(root, &expr.path);
    match &expr.op {
        ConditionOp::Exists => matches!(resolved, Some(v) if !v.is_null()),
        ConditionOp::Empty => is_empty(resolved),
        ConditionOp::In(list) => match resolved {
            Some(v) => list.iter().any(|lit| lit.matches(v)),
            None => false,
        },
        ConditionOp::Between(lo, hi) => match resolved.and_then(Value::as_f64) {
            // Inclusive on both bounds; non-numeric resolves to false, not a fault.
            Some(n) => lo.0 <= n && n <= hi.0,
            None => false,
        },
        ConditionOp::Equals(lit) => match resolved {
            Some(v) => lit.matches(v),
            None => false,
        },
    }
}

/// Emptiness is about absence of content, not falsiness: `""`, `[]`, `{}`,
/// null and missing are empty; `0` and `false` are not.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConditionOp, LitValue};
    use ordered_float::OrderedFloat;
    use serde_json::json;

    fn expr(path: &[&str], op: ConditionOp) -> ConditionExpr {
        ConditionExpr {
            path: path.iter().map(|s| s.to_string()).collect(),
            op,
        }
    }

    #[test]
    fn path_resolution_walks_nested_objects() {
        let root = json!({"user": {"profile": {"role": "admin"}}});
        assert_eq!(
            resolve_path(&root, &["user".into(), "profile".into(), "role".into()]),
            Some(&json!("admin"))
        );
        assert_eq!(resolve_path(&root, &["user".into(), "missing".into()]), None);
    }

    #[test]
    fn exists_is_false_for_missing_and_null() {
        let root = json!({"a": null, "b": 0});
        assert!(!evaluate(&expr(&["a"], ConditionOp::Exists), &root));
        assert!(!evaluate(&expr(&["missing"], ConditionOp::Exists), &root));
        assert!(evaluate(&expr(&["b"], ConditionOp::Exists), &root));
    }

    #[test]
    fn emptiness_is_about_content_not_falsiness() {
        let root = json!({
            "s": "", "a": [], "o": {}, "n": null,
            "zero": 0, "no": false, "word": "x"
        });
        for key in ["s", "a", "o", "n", "missing"] {
            assert!(evaluate(&expr(&[key], ConditionOp::Empty), &root), "{key}");
        }
        for key in ["zero", "no", "word"] {
            assert!(!evaluate(&expr(&[key], ConditionOp::Empty), &root), "{key}");
        }
    }

    #[test]
    fn in_matches_exact_literals() {
        let root = json!({"role": "admin", "level": 3});
        let op = ConditionOp::In(vec![
            LitValue::Str("admin".into()),
            LitValue::Str("root".into()),
        ]);
        assert!(evaluate(&expr(&["role"], op.clone()), &root));
        assert!(!evaluate(&expr(&["level"], op), &root));
        let nums = ConditionOp::In(vec![LitValue::Num(OrderedFloat(3.0))]);
        assert!(evaluate(&expr(&["level"], nums), &root));
    }

    #[test]
    fn between_is_inclusive_and_false_for_non_numeric() {
        let root = json!({"n": 5, "s": "5"});
        let op = ConditionOp::Between(OrderedFloat(1.0), OrderedFloat(5.0));
        assert!(evaluate(&expr(&["n"], op.clone()), &root));
        assert!(!evaluate(&expr(&["s"], op.clone()), &root));
        assert!(!evaluate(&expr(&["missing"], op), &root));
    }

    #[test]
    fn equals_compares_typed_literals() {
        let root = json!({"role": "admin", "count": 2, "flag": true});
        assert!(evaluate(
            &expr(&["role"], ConditionOp::Equals(LitValue::Str("admin".into()))),
            &root
        ));
        assert!(evaluate(
            &expr(&["count"], ConditionOp::Equals(LitValue::Num(OrderedFloat(2.0)))),
            &root
        ));
        assert!(evaluate(
            &expr(&["flag"], ConditionOp::Equals(LitValue::Bool(true))),
            &root
        ));
        assert!(!evaluate(
            &expr(&["role"], ConditionOp::Equals(LitValue::Str("user".into()))),
            &root
        ));
    }
}
