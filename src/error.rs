//! Error types for Keel.
//!
//! This module defines `KeelError`, the unified error type used throughout
//! the crate. Validation failures surface before any network call is made;
//! transport failures carry enough classification for the retry loop.
//!
//! # Security
//!
//! Error messages built from remote responses may echo request data. Use
//! `sanitize_message()` / `sanitized_display()` with the client's secrets
//! before logging or returning an error to a caller.

use std::time::Duration;
use thiserror::Error;

/// Common SDP API status codes.
pub mod codes {
    /// First code in the failure range. Anything at or above it is an error.
    pub const FAILURE_THRESHOLD: u32 = 4000;
}

/// Unified error type for all Keel operations.
#[derive(Error, Debug)]
pub enum KeelError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// HTTP response returned a non-success status code.
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// Human-readable message extracted from the error envelope.
        message: String,
        /// The (truncated, sanitized) response body.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// Rate limited by the server (HTTP 429).
    #[error("rate limited by server - please wait before retrying")]
    RateLimited {
        /// Suggested retry delay, if provided by server.
        retry_after: Option<Duration>,
    },

    /// Server temporarily unavailable (HTTP 500/502/503/504).
    #[error("service temporarily unavailable ({status})")]
    ServiceUnavailable {
        /// The specific status code.
        status: reqwest::StatusCode,
    },

    /// HTTP succeeded but the embedded response status signals failure.
    #[error("SDP API error {code}: {message}")]
    SdpApi {
        /// SDP-specific status code.
        code: u32,
        /// Message extracted from the response envelope.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested resource was not found.
    #[error("record not found: {id}")]
    NotFound {
        /// The ID (or path) of the resource that was not found.
        id: String,
    },

    /// Authentication failed - the token was rejected.
    #[error("authentication failed - check SDP_CLOUD_AUTH_TOKEN or the OAuth credentials")]
    Authentication,

    /// Token exchange with the accounts server failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Input validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A desired-state key is neither a catalog field nor a custom field.
    #[error("Invalid field '{field}'. Allowed system fields: {}", allowed.join(", "))]
    UnknownField {
        /// The offending key.
        field: String,
        /// System fields the entity type accepts, in catalog order.
        allowed: Vec<String>,
    },

    /// A value could not be converted to its field's wire form.
    #[error("{message}")]
    InvalidValue {
        /// The field being transformed.
        field: String,
        /// What was wrong with the value.
        message: String,
    },

    /// A custom field is not declared in the remote metadata.
    #[error("Invalid UDF field '{field}'. Field not found in {entity} metadata.")]
    UnknownUdf {
        /// The custom field name.
        field: String,
        /// The entity type whose metadata was consulted.
        entity: String,
    },

    /// Connection test failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// Details about why the connection test failed.
        message: String,
    },
}

impl KeelError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        KeelError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        KeelError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        KeelError::Validation(message.into())
    }

    /// Creates a value transformation error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        KeelError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        KeelError::NotFound { id: id.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        KeelError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates an SDP API error.
    pub fn sdp_api(code: u32, message: impl Into<String>) -> Self {
        KeelError::SdpApi {
            code,
            message: message.into(),
        }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        KeelError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and the call should be retried.
    ///
    /// Only the designated transient HTTP statuses qualify: 429 and
    /// 500/502/503/504. Everything else fails fast.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KeelError::RateLimited { .. } | KeelError::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this is a rate limit error.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, KeelError::RateLimited { .. })
    }

    /// Returns true for failures detected before any network call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KeelError::Validation(_)
                | KeelError::UnknownField { .. }
                | KeelError::InvalidValue { .. }
        )
    }

    /// Returns the server-suggested delay before retry, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            KeelError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Replaces every occurrence of each secret in `message` with `[REDACTED]`.
    ///
    /// Empty secrets are skipped.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|s| !s.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        Self::sanitize_message(&self.to_string(), secrets)
    }
}
