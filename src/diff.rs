//! Idempotency comparison between a desired payload and a current record.
//!
//! The comparison is a subset check: only fields present in the desired
//! payload are inspected, and a desired object matches a current object
//! that carries extra keys (`{"name": "High"}` matches
//! `{"name": "High", "id": "3"}`).

use serde_json::{Map, Value};

use crate::udf::UDF_CONTAINER;

/// Returns true if `current` does not already satisfy `desired`.
///
/// `desired` is the wire document `{<root>: {...}}`; `current` is the
/// bare record. An absent or empty side always reports differences.
pub fn has_differences(desired: Option<&Value>, current: Option<&Value>, root: &str) -> bool {
    let Some(desired) = desired.and_then(|d| d.get(root)).and_then(non_empty_object) else {
        return true;
    };
    let Some(current) = current.and_then(non_empty_object) else {
        return true;
    };

    desired.iter().any(|(key, wanted)| {
        if key == UDF_CONTAINER {
            udf_differs(wanted, current.get(key))
        } else {
            !values_match(Some(wanted), current.get(key))
        }
    })
}

/// Per-value rule: absent (or null) on both sides matches, absent on one
/// side does not, objects match as a subset, anything else by equality.
pub fn values_match(desired: Option<&Value>, current: Option<&Value>) -> bool {
    match (present(desired), present(current)) {
        (None, None) => true,
        (None, Some(_)) | (Some(_), None) => false,
        (Some(Value::Object(want)), Some(Value::Object(have))) => want
            .iter()
            .all(|(k, v)| have.get(k).is_some_and(|h| json_eq(v, h))),
        (Some(want), Some(have)) => json_eq(want, have),
    }
}

fn udf_differs(wanted: &Value, current: Option<&Value>) -> bool {
    let Value::Object(wanted) = wanted else {
        return !values_match(Some(wanted), current);
    };
    let empty = Map::new();
    let current = match current {
        Some(Value::Object(map)) => map,
        _ => &empty,
    };
    wanted
        .iter()
        .any(|(field, value)| !values_match(Some(value), current.get(field)))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn non_empty_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object().filter(|m| !m.is_empty())
}

/// Structural equality where numbers compare by value (`1 == 1.0`).
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(i), Some(j)) => i == j,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}
