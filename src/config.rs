//! Configuration management for Keel.
//!
//! This module handles loading configuration from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::KeelError;

/// Zoho data center hosting the portal. Selects the accounts server used
/// for OAuth token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataCenter {
    /// United States (default).
    #[default]
    Us,
    /// Europe.
    Eu,
    /// India.
    In,
    /// Australia.
    Au,
    /// China.
    Cn,
    /// Japan.
    Jp,
    /// Canada.
    Ca,
    /// Saudi Arabia.
    Sa,
}

impl DataCenter {
    /// All data centers, in declaration order.
    pub const ALL: [DataCenter; 8] = [
        DataCenter::Us,
        DataCenter::Eu,
        DataCenter::In,
        DataCenter::Au,
        DataCenter::Cn,
        DataCenter::Jp,
        DataCenter::Ca,
        DataCenter::Sa,
    ];

    /// Short code (`US`, `EU`, ...).
    pub fn code(self) -> &'static str {
        match self {
            DataCenter::Us => "US",
            DataCenter::Eu => "EU",
            DataCenter::In => "IN",
            DataCenter::Au => "AU",
            DataCenter::Cn => "CN",
            DataCenter::Jp => "JP",
            DataCenter::Ca => "CA",
            DataCenter::Sa => "SA",
        }
    }

    /// Base URL of the Zoho accounts server for this data center.
    pub fn accounts_url(self) -> &'static str {
        match self {
            DataCenter::Us => "https://accounts.zoho.com",
            DataCenter::Eu => "https://accounts.zoho.eu",
            DataCenter::In => "https://accounts.zoho.in",
            DataCenter::Au => "https://accounts.zoho.com.au",
            DataCenter::Cn => "https://accounts.zoho.com.cn",
            DataCenter::Jp => "https://accounts.zoho.jp",
            DataCenter::Ca => "https://accounts.zoho.ca",
            DataCenter::Sa => "https://accounts.zoho.sa",
        }
    }
}

impl fmt::Display for DataCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DataCenter {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        DataCenter::ALL
            .into_iter()
            .find(|dc| dc.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                KeelError::invalid_config(format!(
                    "SDP_CLOUD_DC must be one of US, EU, IN, AU, CN, JP, CA, SA (got {:?})",
                    s
                ))
            })
    }
}

/// OAuth client credentials used to mint access tokens.
///
/// These values must never be logged or included in error messages.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// Zoho API console client id.
    pub client_id: String,
    /// Zoho API console client secret.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
}

/// How requests are authenticated.
#[derive(Clone)]
pub enum Credentials {
    /// A ready access token.
    Token(String),
    /// Client credentials exchanged for an access token on first use.
    OAuth(OAuthCredentials),
}

impl Credentials {
    /// Every secret value held, for scrubbing error messages.
    pub fn secrets(&self) -> Vec<&str> {
        match self {
            Credentials::Token(token) => vec![token.as_str()],
            Credentials::OAuth(oauth) => vec![
                oauth.client_id.as_str(),
                oauth.client_secret.as_str(),
                oauth.refresh_token.as_str(),
            ],
        }
    }
}

/// Configuration for connecting to ServiceDesk Plus Cloud.
///
/// Secrets are stored but never logged or exposed in error messages.
#[derive(Clone)]
pub struct Config {
    /// API base URL (e.g., `https://sdpondemand.manageengine.com/app/itdesk/api/v3`).
    pub base_url: String,

    /// Data center of the portal.
    pub data_center: DataCenter,

    /// Accounts server for token exchange; defaults to the data center's.
    accounts_url: String,

    /// Authentication material.
    credentials: Credentials,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SDP_CLOUD_DOMAIN`, `SDP_CLOUD_PORTAL`: portal location, or
    ///   `SDP_CLOUD_BASE_URL` for the full API base URL
    /// - `SDP_CLOUD_DC`: data center code (default `US`)
    /// - `SDP_CLOUD_AUTH_TOKEN`: access token, or all of
    ///   `SDP_CLOUD_CLIENT_ID`, `SDP_CLOUD_CLIENT_SECRET`, `SDP_CLOUD_REFRESH_TOKEN`
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Config` if any required variable is missing
    /// or if values fail validation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// dotenvy::dotenv().ok();
    /// let config = Config::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, KeelError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, KeelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = match get("SDP_CLOUD_BASE_URL") {
            Some(url) => url,
            None => {
                let domain = get("SDP_CLOUD_DOMAIN")
                    .ok_or_else(|| KeelError::missing_env("SDP_CLOUD_DOMAIN"))?;
                let portal = get("SDP_CLOUD_PORTAL")
                    .ok_or_else(|| KeelError::missing_env("SDP_CLOUD_PORTAL"))?;
                Self::portal_base_url(&domain, &portal)
            }
        };

        let data_center = match get("SDP_CLOUD_DC") {
            Some(code) => code.parse()?,
            None => DataCenter::default(),
        };

        let credentials = match get("SDP_CLOUD_AUTH_TOKEN") {
            Some(token) => {
                Self::validate_secret("SDP_CLOUD_AUTH_TOKEN", &token)?;
                Credentials::Token(token)
            }
            None => match (
                get("SDP_CLOUD_CLIENT_ID"),
                get("SDP_CLOUD_CLIENT_SECRET"),
                get("SDP_CLOUD_REFRESH_TOKEN"),
            ) {
                (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                    Self::validate_secret("SDP_CLOUD_CLIENT_ID", &client_id)?;
                    Self::validate_secret("SDP_CLOUD_CLIENT_SECRET", &client_secret)?;
                    Self::validate_secret("SDP_CLOUD_REFRESH_TOKEN", &refresh_token)?;
                    Credentials::OAuth(OAuthCredentials {
                        client_id,
                        client_secret,
                        refresh_token,
                    })
                }
                _ => {
                    return Err(KeelError::invalid_config(
                        "missing required credentials: set SDP_CLOUD_AUTH_TOKEN, or all of \
                         SDP_CLOUD_CLIENT_ID, SDP_CLOUD_CLIENT_SECRET and SDP_CLOUD_REFRESH_TOKEN",
                    ))
                }
            },
        };

        Self::new(base_url, data_center, credentials)
    }

    /// Builds a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns `KeelError::Config` if `base_url` is not an http(s) URL.
    pub fn new(
        base_url: impl Into<String>,
        data_center: DataCenter,
        credentials: Credentials,
    ) -> Result<Self, KeelError> {
        Ok(Config {
            base_url: Self::validate_base_url(base_url.into())?,
            data_center,
            accounts_url: data_center.accounts_url().to_string(),
            credentials,
        })
    }

    /// Overrides the accounts server URL.
    pub fn with_accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Accounts server used for token exchange.
    pub fn accounts_url(&self) -> &str {
        &self.accounts_url
    }

    /// Authentication material.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// API base URL for a cloud portal.
    pub fn portal_base_url(domain: &str, portal: &str) -> String {
        format!(
            "https://{}/app/{}/api/v3",
            domain.trim().trim_end_matches('/'),
            portal.trim().trim_matches('/')
        )
    }

    /// Validates and normalizes the base URL.
    fn validate_base_url(url: String) -> Result<String, KeelError> {
        // Remove trailing slash for consistency
        let url = url.trim().trim_end_matches('/').to_string();

        let parsed = Url::parse(&url).map_err(|e| {
            KeelError::invalid_config(format!("SDP base URL is not a valid URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KeelError::invalid_config(
                "SDP base URL must start with http:// or https://",
            ));
        }

        Ok(url)
    }

    /// Validates a secret is not a placeholder value.
    fn validate_secret(name: &str, value: &str) -> Result<(), KeelError> {
        let lower = value.to_lowercase();
        let placeholder_patterns = ["your_", "placeholder", "xxx", "changeme"];

        if placeholder_patterns.iter().any(|p| lower.contains(p)) {
            return Err(KeelError::invalid_config(format!(
                "{} appears to be a placeholder value",
                name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, KeelError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_portal_base_url() {
        let config = load(&[
            ("SDP_CLOUD_DOMAIN", "sdpondemand.manageengine.com"),
            ("SDP_CLOUD_PORTAL", "itdesk"),
            ("SDP_CLOUD_AUTH_TOKEN", "1000.abc"),
        ])
        .unwrap();
        assert_eq!(
            config.base_url,
            "https://sdpondemand.manageengine.com/app/itdesk/api/v3"
        );
        assert_eq!(config.data_center, DataCenter::Us);
        assert!(matches!(config.credentials(), Credentials::Token(_)));
    }

    #[test]
    fn test_base_url_override() {
        let config = load(&[
            ("SDP_CLOUD_BASE_URL", "http://127.0.0.1:8080/api/v3/"),
            ("SDP_CLOUD_AUTH_TOKEN", "1000.abc"),
        ])
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080/api/v3");
    }

    #[test]
    fn test_missing_domain() {
        let err = load(&[("SDP_CLOUD_PORTAL", "itdesk"), ("SDP_CLOUD_AUTH_TOKEN", "t")])
            .err()
            .unwrap();
        assert!(err.to_string().contains("SDP_CLOUD_DOMAIN"));
    }

    #[test]
    fn test_oauth_credentials_and_data_center() {
        let config = load(&[
            ("SDP_CLOUD_DOMAIN", "sdpondemand.manageengine.eu"),
            ("SDP_CLOUD_PORTAL", "itdesk"),
            ("SDP_CLOUD_DC", "eu"),
            ("SDP_CLOUD_CLIENT_ID", "1000.CID"),
            ("SDP_CLOUD_CLIENT_SECRET", "secret"),
            ("SDP_CLOUD_REFRESH_TOKEN", "1000.refresh"),
        ])
        .unwrap();
        assert_eq!(config.data_center, DataCenter::Eu);
        assert_eq!(config.accounts_url(), "https://accounts.zoho.eu");
        assert!(matches!(config.credentials(), Credentials::OAuth(_)));
    }

    #[test]
    fn test_token_wins_over_oauth() {
        let config = load(&[
            ("SDP_CLOUD_BASE_URL", "https://example.com/app/x/api/v3"),
            ("SDP_CLOUD_AUTH_TOKEN", "1000.token"),
            ("SDP_CLOUD_CLIENT_ID", "1000.CID"),
            ("SDP_CLOUD_CLIENT_SECRET", "secret"),
            ("SDP_CLOUD_REFRESH_TOKEN", "1000.refresh"),
        ])
        .unwrap();
        assert!(matches!(config.credentials(), Credentials::Token(_)));
    }

    #[test]
    fn test_partial_oauth_is_missing_credentials() {
        let err = load(&[
            ("SDP_CLOUD_BASE_URL", "https://example.com/app/x/api/v3"),
            ("SDP_CLOUD_CLIENT_ID", "1000.CID"),
            ("SDP_CLOUD_CLIENT_SECRET", "secret"),
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("missing required credentials"));
    }

    #[test]
    fn test_rejects_placeholder_secret() {
        let err = load(&[
            ("SDP_CLOUD_BASE_URL", "https://example.com/app/x/api/v3"),
            ("SDP_CLOUD_AUTH_TOKEN", "your_token_here"),
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("placeholder"));
    }

    #[test]
    fn test_validate_base_url_requires_scheme() {
        assert!(Config::validate_base_url("example.com".to_string()).is_err());
        assert!(Config::validate_base_url("ftp://example.com".to_string()).is_err());
    }

    #[test]
    fn test_data_center_parse() {
        assert_eq!("JP".parse::<DataCenter>().unwrap(), DataCenter::Jp);
        assert_eq!(DataCenter::Au.accounts_url(), "https://accounts.zoho.com.au");
        assert!("MARS".parse::<DataCenter>().is_err());
    }
}
