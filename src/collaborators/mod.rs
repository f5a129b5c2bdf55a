//! External collaborator clients.
//!
//! Specialist capabilities reach document search, data queries, model
//! inference, payments, and notifications through a single narrow seam:
//! a named tool call taking and returning structured JSON. The core only
//! cares about success or failure plus the payload.

pub mod http;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use http::HttpToolClient;
pub use mock::MockToolClient;

/// A client for invoking external tools.
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Human-readable client name (e.g. "mock", "http")
    fn name(&self) -> &str;

    /// Invoke a tool by name with a JSON payload.
    async fn call_tool(&self, tool: &str, payload: Value) -> Result<Value>;
}
