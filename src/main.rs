//! Keel - MCP server for ServiceDesk Plus Cloud record reconciliation
//!
//! This binary runs as an MCP server using stdio transport. Stdout
//! carries JSON-RPC messages, so all logging goes to stderr.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `SDP_CLOUD_DOMAIN` and `SDP_CLOUD_PORTAL`, or `SDP_CLOUD_BASE_URL`
//! - `SDP_CLOUD_DC`: data center of the Zoho accounts server (default `US`)
//! - `SDP_CLOUD_AUTH_TOKEN`, or the OAuth triple
//!   `SDP_CLOUD_CLIENT_ID`, `SDP_CLOUD_CLIENT_SECRET`, `SDP_CLOUD_REFRESH_TOKEN`
//!
//! # Usage
//!
//! ```bash
//! SDP_CLOUD_DOMAIN=sdpondemand.manageengine.com SDP_CLOUD_PORTAL=itdesk \
//!     SDP_CLOUD_AUTH_TOKEN=xxxx ./keel
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use keel::{config, sdp_client, server};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    // stdout is reserved for MCP JSON-RPC messages.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keel=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting Keel MCP server v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        base_url = %config.base_url,
        data_center = %config.data_center,
        "Configuration loaded"
    );

    let sdp_client = sdp_client::SdpClient::new(&config).context("Failed to create SDP client")?;

    tracing::info!("Testing connection to ServiceDesk Plus Cloud...");
    if let Err(e) = sdp_client.test_connection().await {
        let sanitized = e.sanitized_display(&config.credentials().secrets());
        tracing::error!(error = %sanitized, "Connection test failed");
        // The portal may become reachable later.
        tracing::warn!(
            "Server will start but may not be able to reach ServiceDesk Plus. \
             Check configuration and network connectivity."
        );
    }

    let server = server::KeelServer::new(sdp_client);

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
