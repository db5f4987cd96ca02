//! Conversion of user-supplied values into SDP wire shapes.
//!
//! Each [`FieldKind`] owns one conversion. The conversion is one-way:
//! already-wrapped objects are not unwrapped, a lookup value of
//! `{"name": "High"}` becomes `{"name": {"name": "High"}}`.

use serde_json::{json, Number, Value};

use crate::catalog::FieldKind;
use crate::error::KeelError;

impl FieldKind {
    /// Converts `raw` into the wire form this kind requires.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::InvalidValue` when `raw` cannot represent a
    /// value of this kind (non-numeric number, non-timestamp datetime,
    /// malformed email for a user field).
    pub fn transform(self, field: &str, raw: &Value) -> Result<Value, KeelError> {
        match self {
            FieldKind::String => Ok(raw.clone()),
            FieldKind::Number => to_number(field, raw),
            FieldKind::Boolean => Ok(Value::Bool(to_bool(raw))),
            FieldKind::DateTime => to_datetime(field, raw),
            FieldKind::Lookup => Ok(json!({ "name": raw })),
            FieldKind::User => to_user(field, raw),
        }
    }
}

fn to_number(field: &str, raw: &Value) -> Result<Value, KeelError> {
    match raw {
        Value::Number(_) => return Ok(raw.clone()),
        Value::String(s) => {
            if let Some(n) = parse_number(s) {
                return Ok(Value::Number(n));
            }
        }
        _ => {}
    }
    Err(KeelError::invalid_value(
        field,
        format!(
            "Numeric field '{}' requires an integer or decimal value. Got: {}",
            field,
            display_raw(raw)
        ),
    ))
}

/// Integer first, then float. Non-finite floats have no JSON form.
fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::from(i));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Number::from(u));
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Strings are true only when they spell "true" in any case; other values
/// fall back to truthiness.
fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        other => is_truthy(other),
    }
}

fn to_datetime(field: &str, raw: &Value) -> Result<Value, KeelError> {
    match raw {
        Value::Number(_) => Ok(json!({ "value": raw })),
        _ => Err(KeelError::invalid_value(
            field,
            format!(
                "Invalid datetime format for field '{}'. value must be a timestamp (int/float). Got: {}",
                field,
                display_raw(raw)
            ),
        )),
    }
}

fn to_user(field: &str, raw: &Value) -> Result<Value, KeelError> {
    match raw {
        Value::String(s) if is_valid_email(s) => Ok(json!({ "email_id": s })),
        _ => Err(KeelError::invalid_value(
            field,
            format!(
                "User field '{}' accepts only a valid email address (e.g. user@example.com). Got: {}",
                field,
                display_raw(raw)
            ),
        )),
    }
}

/// Exactly one `@`, non-empty local part, and a domain containing a dot.
pub(crate) fn is_valid_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.')
        }
        _ => false,
    }
}

/// Loose truthiness: null, false, zero, and empty strings/arrays/objects are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn display_raw(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
