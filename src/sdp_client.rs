//! HTTP client for the ServiceDesk Plus Cloud API.
//!
//! `SdpClient` speaks the SDP Cloud v3 REST dialect: Zoho OAuth headers,
//! payloads JSON-encoded into a single `input_data` parameter, and the
//! `response_status` envelope. It is the production [`RecordStore`] and
//! [`MetadataSource`].
//!
//! # Retry Logic
//!
//! The client retries transient failures only:
//! - HTTP 429 (rate limit): honours `Retry-After`, else exponential backoff
//! - HTTP 500/502/503/504: exponential backoff
//!
//! Delays start at one second and double per retry, for at most three
//! retries. Everything else fails fast.
//!
//! # Security
//!
//! Tokens and client secrets are never logged. All error messages are
//! sanitized before they leave the client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::catalog::EntityType;
use crate::config::{Config, Credentials};
use crate::endpoint::Endpoint;
use crate::error::KeelError;
use crate::models::{check_response_status, extract_error_message, ListInfo, MetainfoResponse, UdfDefinitions};
use crate::oauth;
use crate::reconcile::RecordStore;
use crate::udf::MetadataSource;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The Accept header value for SDP Cloud API v3.
const SDP_ACCEPT_HEADER: &str = "application/v3+json";

/// Error bodies longer than this are cut before they reach an error value.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Retry schedule for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// HTTP client for ServiceDesk Plus Cloud.
///
/// Handles authentication, request formatting, and response parsing.
/// Cloning is cheap and clones share the minted access token.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = SdpClient::new(&config)?;
///
/// let record = client.fetch_record(EntityType::Request, "12345").await?;
/// ```
#[derive(Clone)]
pub struct SdpClient {
    /// Shared connection pool.
    http: Client,

    /// Base URL for the SDP API (e.g., `https://sdpondemand.manageengine.com/app/itdesk/api/v3`).
    base_url: String,

    /// Accounts server for OAuth token exchange.
    accounts_url: String,

    /// Static token or OAuth client credentials.
    /// SECURITY: Never log these values!
    credentials: Credentials,

    /// Access token minted from OAuth credentials, once per process.
    minted_token: Arc<OnceCell<String>>,

    /// Retry schedule for transient failures.
    retry: RetryPolicy,
}

impl SdpClient {
    /// Builds a client for the portal and credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, KeelError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(KeelError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            accounts_url: config.accounts_url().to_string(),
            credentials: config.credentials().clone(),
            minted_token: Arc::new(OnceCell::new()),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry schedule.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Secret values to scrub from messages.
    ///
    /// Only for scrubbing messages. Never log these.
    pub(crate) fn secrets(&self) -> Vec<&str> {
        let mut secrets = self.credentials.secrets();
        if let Some(token) = self.minted_token.get() {
            secrets.push(token.as_str());
        }
        secrets
    }

    fn sanitize(&self, message: &str) -> String {
        KeelError::sanitize_message(message, &self.secrets())
    }

    /// Returns the access token, minting it from OAuth credentials on first use.
    async fn access_token(&self) -> Result<&str, KeelError> {
        match &self.credentials {
            Credentials::Token(token) => Ok(token.as_str()),
            Credentials::OAuth(oauth) => self
                .minted_token
                .get_or_try_init(|| {
                    oauth::exchange_refresh_token(&self.http, &self.accounts_url, oauth)
                })
                .await
                .map(String::as_str),
        }
    }

    /// Checks that the portal is reachable and the credentials work.
    ///
    /// Lists a single request to verify the server is reachable and
    /// authentication is working.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::ConnectionTest` if the connection fails,
    /// with details about the failure reason.
    pub async fn test_connection(&self) -> Result<(), KeelError> {
        tracing::debug!(base_url = %self.base_url, "Checking portal connectivity");

        let input = ListInfo::new().with_row_count(1).to_input_data();
        let result = self.request(Method::GET, "/requests", Some(&input)).await;

        match result {
            Ok(_) => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Err(KeelError::Authentication) => Err(KeelError::connection_test(
                "Authentication failed - verify SDP_CLOUD_AUTH_TOKEN or the OAuth credentials",
            )),
            Err(KeelError::OAuth(message)) => Err(KeelError::connection_test(format!(
                "Token exchange failed: {} - verify the OAuth credentials and SDP_CLOUD_DC",
                message
            ))),
            Err(KeelError::Timeout { duration, .. }) => Err(KeelError::connection_test(format!(
                "Connection timed out after {:?} - verify SDP_CLOUD_DOMAIN is correct and server is reachable",
                duration
            ))),
            Err(KeelError::Http(e)) => Err(KeelError::connection_test(format!(
                "HTTP error: {} - verify SDP_CLOUD_DOMAIN and SDP_CLOUD_PORTAL",
                self.sanitize(&e.to_string())
            ))),
            Err(e) => Err(KeelError::connection_test(self.sanitize(&e.to_string()))),
        }
    }

    /// Runs `f` until it succeeds, fails permanently, or the retry budget is spent.
    ///
    /// Retries on HTTP 429 and 500/502/503/504 with doubling delays.
    /// Does not retry anything else.
    async fn with_retry<T, F, Fut>(&self, operation: &str, f: F) -> Result<T, KeelError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, KeelError>>,
    {
        let mut retries = 0u32;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && retries < self.retry.max_retries => {
                    let backoff = self.retry.delay_for(retries);
                    let delay = e.retry_after().unwrap_or(backoff);
                    retries += 1;

                    tracing::warn!(
                        operation = operation,
                        retry = retries,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %self.sanitize(&e.to_string()),
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if retries > 0 {
                        tracing::debug!(
                            operation = operation,
                            retries = retries,
                            "All retry attempts exhausted"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One authenticated round-trip, no retries.
    ///
    /// `input_data` travels in the query string for GET and in a form
    /// body for every other method.
    async fn request_inner(
        &self,
        method: Method,
        path: &str,
        input_data: Option<&Value>,
    ) -> Result<Value, KeelError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.access_token().await?;

        tracing::debug!(
            method = %method,
            path = %path,
            "Sending SDP request"
        );

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Authorization", format!("Zoho-oauthtoken {}", token))
            .header("Accept", SDP_ACCEPT_HEADER);

        if let Some(data) = input_data {
            let input_json = serde_json::to_string(data).map_err(KeelError::Serialization)?;

            match method {
                Method::GET => {
                    req = req.query(&[("input_data", &input_json)]);
                }
                _ => {
                    req = req
                        .header("Content-Type", "application/x-www-form-urlencoded")
                        .body(format!("input_data={}", urlencoding::encode(&input_json)));
                }
            }
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                return KeelError::timeout(
                    Duration::from_secs(DEFAULT_TIMEOUT_SECS),
                    format!("{} {}", method, path),
                );
            }
            KeelError::Http(e)
        })?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.handle_http_error(status, response).await);
        }

        let body = response.text().await.map_err(KeelError::Http)?;

        tracing::trace!(body = %self.sanitize(&body), "SDP API response");

        if body.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let document: Value = serde_json::from_str(&body).map_err(KeelError::Serialization)?;

        // Check SDP-level success embedded in a 2xx response
        check_response_status(&document).map_err(|e| match e {
            KeelError::SdpApi { code, message } => KeelError::sdp_api(code, self.sanitize(&message)),
            other => other,
        })?;

        Ok(document)
    }

    /// [`Self::request_inner`] under the client's retry policy.
    async fn request(
        &self,
        method: Method,
        path: &str,
        input_data: Option<&Value>,
    ) -> Result<Value, KeelError> {
        let operation = format!("{} {}", method, path);
        self.with_retry(&operation, || {
            self.request_inner(method.clone(), path, input_data)
        })
        .await
    }

    /// Maps a non-2xx response onto a `KeelError`.
    ///
    /// Transient statuses map to retryable variants; the rest carry the extracted message.
    async fn handle_http_error(&self, status: StatusCode, response: reqwest::Response) -> KeelError {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        let default = status.canonical_reason().unwrap_or("request failed");
        let message = self.sanitize(&extract_error_message(&body, default));
        let body = truncate_body(self.sanitize(&body));

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => KeelError::Authentication,
            StatusCode::NOT_FOUND => KeelError::not_found("resource"),
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!(retry_after = ?retry_after, "Rate limited by SDP portal");
                KeelError::RateLimited { retry_after }
            }
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT => {
                tracing::warn!(status = %status, message = %message, "SDP server temporarily unavailable");
                KeelError::ServiceUnavailable { status }
            }
            _ => KeelError::HttpStatus {
                status,
                message,
                body,
            },
        }
    }
}

/// Truncates to avoid leaking verbose SDP internals, on a char boundary.
fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body;
    }
    let cut = (0..=MAX_ERROR_BODY_LEN)
        .rev()
        .find(|i| body.is_char_boundary(*i))
        .unwrap_or(0);
    format!("{}...[truncated]", &body[..cut])
}

impl MetadataSource for SdpClient {
    async fn fetch_udf_metadata(&self, entity: EntityType) -> Result<UdfDefinitions, KeelError> {
        let document = self
            .request(Method::GET, &Endpoint::metainfo_path(entity), None)
            .await?;
        let metainfo: MetainfoResponse = serde_json::from_value(document)?;
        Ok(metainfo.into_udf_definitions())
    }
}

impl RecordStore for SdpClient {
    async fn fetch_record(&self, entity: EntityType, id: &str) -> Result<Option<Value>, KeelError> {
        let endpoint = Endpoint::record(entity, id)?;
        match self.request(Method::GET, &endpoint.path(), None).await {
            Ok(mut document) => Ok(document
                .get_mut(entity.root_key())
                .map(Value::take)),
            Err(KeelError::NotFound { .. }) => {
                tracing::debug!(entity = %entity, id = %id, "Record not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        payload: Option<&Value>,
    ) -> Result<Value, KeelError> {
        let path = endpoint.path();
        self.request(method, &path, payload)
            .await
            .map_err(|e| match e {
                // Convert generic NotFound to one naming the path
                KeelError::NotFound { .. } => KeelError::not_found(path.clone()),
                other => other,
            })
    }
}
