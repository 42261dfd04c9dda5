//! Gateway discovery
//!
//! `GET {api}/gateway` tells the client where to open the socket.

use serde::Deserialize;
use thiserror::Error;

/// Discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Gateway discovery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway discovery returned status {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct GatewayInfo {
    url: String,
}

/// Build the socket URL for a discovered base
#[must_use]
pub fn gateway_url(base: &str, version: u8) -> String {
    format!("{}?v={version}&encoding=json", base.trim_end_matches('/'))
}

/// Ask the discovery endpoint for the gateway base URL
pub async fn discover(http: &reqwest::Client, endpoint: &str) -> Result<String, DiscoveryError> {
    let response = http.get(endpoint).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status(status.as_u16()));
    }

    let info: GatewayInfo = response.json().await?;
    tracing::debug!(endpoint = %endpoint, url = %info.url, "Discovered gateway");
    Ok(info.url)
}
