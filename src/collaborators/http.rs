//! HTTP tool client.
//!
//! Posts tool payloads as JSON to `<endpoint>/v1/tools/<name>` with bearer
//! auth and a bounded request timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::ToolClient;

/// Tool client backed by a remote HTTP tool server.
pub struct HttpToolClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl HttpToolClient {
    /// Create a client for the given endpoint and bearer token.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP tool client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            token: token.into(),
            client,
        })
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn call_tool(&self, tool: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/tools/{}", self.endpoint.trim_end_matches('/'), tool);
        debug!(tool, %url, "Calling HTTP tool");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Tool call '{}' failed to send", tool))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tool call '{}' failed ({}): {}", tool, status, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Tool call '{}' returned invalid JSON", tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_construction() {
        let client =
            HttpToolClient::new("http://localhost:9000/", "token", Duration::from_secs(5)).unwrap();
        assert_eq!(client.name(), "http");
    }
}
