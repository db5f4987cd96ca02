//! # Keel
//!
//! Keel drives ManageEngine ServiceDesk Plus Cloud records towards a
//! declared state.
//!
//! Callers describe what a request, problem, change or release should
//! look like. Keel validates and converts the values into the nested
//! JSON payload the API expects, compares it against the live record,
//! and only sends a mutating call when something actually differs.
//!
//! ## Features
//!
//! - **Field catalog**: per-entity system fields with their kinds and nesting groups
//! - **Custom fields**: `udf_*` fields typed from the server's `_metainfo`, cached per session
//! - **Idempotency**: subset comparison of desired against current state
//! - **Check mode and diffs**: report what would change without changing it
//! - **Child records**: notes, worklogs and tasks under any record
//! - **Transport**: OAuth token minting, `input_data` encoding, retry with backoff
//! - **Security**: tokens and client secrets are scrubbed from every error message
//!
//! ## Architecture
//!
//! - [`catalog`] - Entity types, system field tables, child modules
//! - [`udf`] - Custom field classification and the metadata cache
//! - [`transform`] - Per-kind value conversion
//! - [`payload`] - Desired state to wire payload
//! - [`diff`] - Desired vs. current comparison
//! - [`endpoint`] - API paths and parent/child hierarchy
//! - [`list_options`] - Validated list parameters
//! - [`reconcile`] - Present/absent convergence and raw record operations
//! - [`sdp_client`] - HTTP client for the ServiceDesk Plus API
//! - [`oauth`] - Refresh token exchange
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with message sanitization
//! - [`models`] - Response envelopes and metadata documents
//! - [`server`], [`tools`] - MCP server over stdio
//!
//! ## Configuration
//!
//! - `SDP_CLOUD_DOMAIN`, `SDP_CLOUD_PORTAL`: portal location (or `SDP_CLOUD_BASE_URL`)
//! - `SDP_CLOUD_DC`: data center (`US` default, `EU`, `IN`, `AU`, `CN`, `JP`, `CA`, `SA`)
//! - `SDP_CLOUD_AUTH_TOKEN`, or `SDP_CLOUD_CLIENT_ID` + `SDP_CLOUD_CLIENT_SECRET` + `SDP_CLOUD_REFRESH_TOKEN`
//! - `RUST_LOG`: log level (e.g., `keel=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use keel::catalog::EntityType;
//! use keel::config::Config;
//! use keel::reconcile::{ReconcileOptions, RecordState, Reconciler};
//! use keel::sdp_client::SdpClient;
//!
//! async fn example() -> Result<(), keel::error::KeelError> {
//!     let client = SdpClient::new(&Config::from_env()?)?;
//!     let desired = serde_json::json!({"subject": "VPN down", "priority": "High"});
//!
//!     let mut reconciler = Reconciler::new(&client, ReconcileOptions::default());
//!     let outcome = reconciler
//!         .reconcile(EntityType::Request, Some("1001"), desired.as_object(), RecordState::Present)
//!         .await?;
//!     println!("changed: {}", outcome.changed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod catalog;
pub mod config;
pub mod diff;
pub mod endpoint;
pub mod error;
pub mod list_options;
pub mod models;
pub mod oauth;
pub mod payload;
pub mod reconcile;
pub mod sdp_client;
pub mod server;
pub mod tools;
pub mod transform;
pub mod udf;
