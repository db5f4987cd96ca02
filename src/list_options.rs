//! Validation of list options for read calls.
//!
//! Callers pass a loose JSON map; only the keys the SDP list API
//! understands are accepted, with the server's defaults filled in.

use serde_json::{Map, Value};

use crate::catalog::EntityType;
use crate::error::KeelError;
use crate::models::ListInfo;

/// Keys accepted in list options.
pub const ALLOWED_KEYS: [&str; 5] = [
    "row_count",
    "sort_field",
    "sort_order",
    "get_total_count",
    "start_index",
];

const DEFAULT_ROW_COUNT: i64 = 10;
const MAX_ROW_COUNT: i64 = 100;
const DEFAULT_SORT_FIELD: &str = "created_time";

impl ListInfo {
    /// Validates `options` for a list of `entity` records.
    ///
    /// Missing keys take their defaults: 10 rows sorted ascending by
    /// `created_time`, no total count.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Validation` for an unknown key, a row count
    /// outside 1..=100, a sort field the entity cannot sort on, or a
    /// malformed value.
    pub fn from_options(entity: EntityType, options: &Map<String, Value>) -> Result<Self, KeelError> {
        if let Some(key) = options.keys().find(|k| !ALLOWED_KEYS.contains(&k.as_str())) {
            return Err(KeelError::validation(format!(
                "Invalid list option '{}'. Allowed keys: {}",
                key,
                ALLOWED_KEYS.join(", ")
            )));
        }

        let row_count = match options.get("row_count") {
            None => DEFAULT_ROW_COUNT,
            Some(v) => as_integer(v).ok_or_else(|| KeelError::validation("row_count must be an integer."))?,
        };
        if !(1..=MAX_ROW_COUNT).contains(&row_count) {
            return Err(KeelError::validation("row_count must be between 1 and 100."));
        }

        let sortable = entity.descriptor().sortable_fields;
        let sort_field = match options.get("sort_field") {
            None => DEFAULT_SORT_FIELD,
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(KeelError::validation(format!(
                    "Invalid sort_field '{}'. Allowed fields: {}",
                    other,
                    sortable.join(", ")
                )))
            }
        };
        if !sortable.is_empty() && !sortable.contains(&sort_field) {
            return Err(KeelError::validation(format!(
                "Invalid sort_field '{}'. Allowed fields: {}",
                sort_field,
                sortable.join(", ")
            )));
        }

        let sort_order = match options.get("sort_order") {
            None => "asc",
            Some(Value::String(s)) if s == "asc" || s == "desc" => s.as_str(),
            Some(other) => {
                return Err(KeelError::validation(format!(
                    "Invalid sort_order '{}'. Allowed values: asc, desc",
                    display(other)
                )))
            }
        };

        let get_total_count = match options.get("get_total_count") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
            Some(_) => return Err(KeelError::validation("get_total_count must be a boolean.")),
        };

        let start_index = options
            .get("start_index")
            .filter(|v| !v.is_null())
            .map(|v| as_integer(v).ok_or_else(|| KeelError::validation("start_index must be an integer.")))
            .transpose()?;

        Ok(ListInfo {
            // Bounded to 1..=100 above.
            row_count: Some(row_count as u32),
            start_index,
            sort_field: Some(sort_field.to_string()),
            sort_order: Some(sort_order.to_string()),
            get_total_count: Some(get_total_count),
        })
    }
}

/// Integers, integral floats and integer strings.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
