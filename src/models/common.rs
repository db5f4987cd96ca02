//! Common types shared across SDP API calls.
//!
//! This module defines pagination parameters, the `response_status`
//! envelope every SDP response carries, and extraction of a readable
//! message from an error body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{codes, KeelError};

/// Pagination and sorting parameters for list operations.
///
/// Sent as `{"list_info": {...}}` in `input_data`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ListInfo {
    /// Maximum number of rows to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,

    /// Starting index for pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,

    /// Field to sort by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,

    /// Sort order: "asc" or "desc".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,

    /// Whether to include the total row count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_total_count: Option<bool>,
}

impl ListInfo {
    /// Creates a new ListInfo with server-default pagination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of rows to return.
    pub fn with_row_count(mut self, count: u32) -> Self {
        self.row_count = Some(count);
        self
    }

    /// Sets the starting index for pagination.
    pub fn with_start_index(mut self, index: i64) -> Self {
        self.start_index = Some(index);
        self
    }

    /// Wraps these parameters as the `input_data` document.
    pub fn to_input_data(&self) -> Value {
        serde_json::json!({ "list_info": self })
    }
}

/// Response status block from the SDP API.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResponseStatus {
    /// Status code: 2000 for success, 4000+ for errors. SDP sends it as
    /// either a number or a string.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub status_code: Option<String>,

    /// Status string: "success" or "failed".
    #[serde(default)]
    pub status: String,

    /// Detail messages (present on failure).
    #[serde(default)]
    pub messages: Vec<ResponseMessage>,
}

/// A single message in the response status.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResponseMessage {
    /// The error or info message.
    #[serde(default)]
    pub message: String,

    /// Status code for this specific message.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub status_code: Option<String>,

    /// Type of message.
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
}

impl ResponseStatus {
    /// Reads the `response_status` block of a response document, if any.
    ///
    /// Bulk endpoints send an array; the first entry is used.
    pub fn from_document(document: &Value) -> Option<Self> {
        let status = match document.get("response_status")? {
            Value::Array(items) => items.first()?,
            other => other,
        };
        serde_json::from_value(status.clone()).ok()
    }

    /// Numeric status code, when present and parseable.
    pub fn code(&self) -> Option<u32> {
        self.status_code.as_deref().and_then(|c| c.trim().parse().ok())
    }

    /// Returns true if the embedded code is in the failure range.
    pub fn is_failure(&self) -> bool {
        self.code().is_some_and(|c| c >= codes::FAILURE_THRESHOLD)
    }

    /// `"<code>: <message>"` built from the first message entry.
    pub fn summary(&self) -> Option<String> {
        let first = self.messages.first()?;
        let code = first
            .status_code
            .as_deref()
            .or(self.status_code.as_deref())
            .unwrap_or("unknown");
        Some(format!("{}: {}", code, first.message))
    }

    /// Converts a failed status into a `KeelError`.
    pub fn into_error(self) -> KeelError {
        let code = self.code().unwrap_or(codes::FAILURE_THRESHOLD);
        let message = self
            .summary()
            .unwrap_or_else(|| format!("request failed with status code {}", code));
        KeelError::sdp_api(code, message)
    }
}

/// Checks the `response_status` of a successful HTTP response.
///
/// # Errors
///
/// Returns `KeelError::SdpApi` when the embedded code is 4000 or above.
pub fn check_response_status(document: &Value) -> Result<(), KeelError> {
    match ResponseStatus::from_document(document) {
        Some(status) if status.is_failure() => Err(status.into_error()),
        _ => Ok(()),
    }
}

/// Extracts a human-readable message from an error response body.
///
/// Prefers `"<code>: <message>"` from the first `response_status`
/// message, then a top-level `error` field, then `default`.
pub fn extract_error_message(body: &str, default: &str) -> String {
    let Ok(document) = serde_json::from_str::<Value>(body) else {
        return default.to_string();
    };

    if document.get("response_status").is_some() {
        return ResponseStatus::from_document(&document)
            .and_then(|s| s.summary())
            .unwrap_or_else(|| default.to_string());
    }

    match document.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Deserializes an optional value that can be either a string or an integer into Option<String>.
fn deserialize_optional_string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct OptionalStringOrIntVisitor;

    impl<'de> Visitor<'de> for OptionalStringOrIntVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("null, a string, or an integer")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }
    }

    deserializer.deserialize_any(OptionalStringOrIntVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_info_builder() {
        let info = ListInfo::new().with_row_count(10).with_start_index(20);
        assert_eq!(info.row_count, Some(10));
        assert_eq!(info.start_index, Some(20));
    }

    #[test]
    fn test_list_info_input_data_skips_unset() {
        let data = ListInfo::new().with_row_count(5).to_input_data();
        assert_eq!(data, json!({"list_info": {"row_count": 5}}));
    }

    #[test]
    fn test_response_status_numeric_and_string_codes() {
        let doc = json!({"response_status": {"status_code": 2000, "status": "success"}});
        let status = ResponseStatus::from_document(&doc).unwrap();
        assert_eq!(status.code(), Some(2000));
        assert!(!status.is_failure());

        let doc = json!({"response_status": {"status_code": "4000", "status": "failed"}});
        assert!(ResponseStatus::from_document(&doc).unwrap().is_failure());
    }

    #[test]
    fn test_check_response_status_failure() {
        let doc = json!({
            "response_status": {
                "status_code": 4000,
                "messages": [{"message": "Field validation failed", "status_code": 4001}]
            }
        });
        let err = check_response_status(&doc).unwrap_err();
        assert!(matches!(err, KeelError::SdpApi { code: 4000, .. }));
        assert!(err.to_string().contains("4001: Field validation failed"));
    }

    #[test]
    fn test_check_response_status_absent_is_ok() {
        assert!(check_response_status(&json!({"request": {"id": "1"}})).is_ok());
    }

    #[test]
    fn test_bulk_response_status_uses_first_entry() {
        let doc = json!({"response_status": [{"status_code": 4004, "messages": []}]});
        let status = ResponseStatus::from_document(&doc).unwrap();
        assert_eq!(status.code(), Some(4004));
    }

    #[test]
    fn test_extract_error_message_from_envelope() {
        let body = r#"{"response_status":{"status_code":4000,"messages":[{"status_code":4007,"message":"Invalid URL"}]}}"#;
        assert_eq!(extract_error_message(body, "fallback"), "4007: Invalid URL");
    }

    #[test]
    fn test_extract_error_message_from_error_field() {
        assert_eq!(
            extract_error_message(r#"{"error":"invalid_client"}"#, "fallback"),
            "invalid_client"
        );
    }

    #[test]
    fn test_extract_error_message_falls_back() {
        assert_eq!(extract_error_message("<html>", "fallback"), "fallback");
        assert_eq!(extract_error_message("{}", "fallback"), "fallback");
        assert_eq!(
            extract_error_message(r#"{"response_status":{"status_code":4000,"messages":[]}}"#, "fallback"),
            "fallback"
        );
    }
}
