//! Loose-mode coercion.
//!
//! Applied before type checks when `loose` is set, never otherwise. A
//! coercion that does not apply simply returns `None` and the ordinary
//! type check reports the mismatch; coercion failure is not its own
//! error kind.

use serde_json::Value;

use crate::ast::PrimitiveKind;

/// Try to coerce `value` toward `kind`. `None` means "no coercion applies";
/// the caller falls back to the strict type check (and its error).
pub fn coerce(kind: PrimitiveKind, value: &Value) -> Option<Value> {
    match kind {
        PrimitiveKind::Number
        | PrimitiveKind::Int
        | PrimitiveKind::Float
        | PrimitiveKind::Positive
        | PrimitiveKind::Negative => {
            let s = value.as_str()?.trim();
            let n = s.parse::<f64>().ok()?;
            num_value(n)
        }
        PrimitiveKind::Boolean => match value.as_str()? {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        PrimitiveKind::String => match value {
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => None,
        },
        PrimitiveKind::Date | PrimitiveKind::Any => None,
    }
}

// Prefer exact integers so `"123"` coerces to `123`, not `123.0`.
fn num_value(n: f64) -> Option<Value> {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Some(Value::from(n as i64))
    } else {
        serde_json::Number::from_f64(n).map(Value::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_become_numbers() {
        assert_eq!(coerce(PrimitiveKind::Number, &json!("123")), Some(json!(123)));
        assert_eq!(coerce(PrimitiveKind::Number, &json!("1.5")), Some(json!(1.5)));
        assert_eq!(coerce(PrimitiveKind::Int, &json!(" 7 ")), Some(json!(7)));
        assert_eq!(coerce(PrimitiveKind::Number, &json!("abc")), None);
        assert_eq!(coerce(PrimitiveKind::Number, &json!(true)), None);
    }

    #[test]
    fn boolean_words_become_booleans() {
        assert_eq!(coerce(PrimitiveKind::Boolean, &json!("true")), Some(json!(true)));
        assert_eq!(coerce(PrimitiveKind::Boolean, &json!("false")), Some(json!(false)));
        assert_eq!(coerce(PrimitiveKind::Boolean, &json!("yes")), None);
        assert_eq!(coerce(PrimitiveKind::Boolean, &json!(1)), None);
    }

    #[test]
    fn numbers_become_strings_but_nothing_else_does() {
        assert_eq!(coerce(PrimitiveKind::String, &json!(42)), Some(json!("42")));
        assert_eq!(coerce(PrimitiveKind::String, &json!([1])), None);
    }
}
