//! OAuth refresh-token exchange against the Zoho accounts server.

use reqwest::Client;
use serde::Deserialize;

use crate::config::OAuthCredentials;
use crate::error::KeelError;
use crate::models::extract_error_message;

/// Body of a token endpoint response.
#[derive(Deserialize)]
pub struct TokenResponse {
    /// Minted access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// API domain the token is valid for.
    #[serde(default)]
    pub api_domain: Option<String>,
    /// Error code, present on failure.
    #[serde(default)]
    pub error: Option<String>,
}

/// Exchanges a refresh token for an access token.
///
/// # Errors
///
/// Returns `KeelError::OAuth` when the accounts server rejects the
/// exchange or answers without an access token, and `KeelError::Http`
/// if the request cannot be sent.
pub async fn exchange_refresh_token(
    http: &Client,
    accounts_url: &str,
    credentials: &OAuthCredentials,
) -> Result<String, KeelError> {
    let token_url = format!("{}/oauth/v2/token", accounts_url.trim_end_matches('/'));
    tracing::debug!(url = %token_url, "Exchanging refresh token");

    let response = http
        .post(&token_url)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", credentials.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(KeelError::Http)?;

    let status = response.status();
    let body = response.text().await.map_err(KeelError::Http)?;
    let secrets = [
        credentials.client_id.as_str(),
        credentials.client_secret.as_str(),
        credentials.refresh_token.as_str(),
    ];

    if !status.is_success() {
        let message = extract_error_message(&body, "Failed to generate access token");
        return Err(KeelError::OAuth(KeelError::sanitize_message(&message, &secrets)));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|_| KeelError::OAuth("invalid JSON response from accounts server".to_string()))?;

    if let Some(access_token) = token.access_token {
        tracing::info!(expires_in = ?token.expires_in, "Access token generated");
        return Ok(access_token);
    }

    match token.error {
        Some(error) => Err(KeelError::OAuth(KeelError::sanitize_message(&error, &secrets))),
        None => Err(KeelError::OAuth(
            "unknown error during token generation".to_string(),
        )),
    }
}
