//! Mock tool client for development and testing.
//!
//! Returns canned responses without any network traffic, keyed by tool name.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::ToolClient;

/// Tool client returning simulated responses.
#[derive(Debug, Default)]
pub struct MockToolClient;

impl MockToolClient {
    /// Create a mock client.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolClient for MockToolClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn call_tool(&self, tool: &str, payload: Value) -> Result<Value> {
        debug!(tool, %payload, "Calling mock tool");

        let response = match tool {
            "search_documents" => json!({
                "results": [{
                    "id": "doc_1",
                    "title": "Mock Clinical Document",
                    "content": "This is a mock clinical document for testing.",
                    "score": 0.95
                }]
            }),
            "execute_query" => json!({
                "rows": [{"id": 1, "name": "Test Patient", "age": 35}],
                "row_count": 1
            }),
            "classify_image" => json!({
                "predictions": [
                    {"label": "rash", "confidence": 0.87},
                    {"label": "eczema", "confidence": 0.12}
                ]
            }),
            "process_payment" => json!({
                "transaction_id": "txn_mock_12345",
                "status": "success",
                "amount": 150.00
            }),
            "send_notification" => json!({
                "message_id": "msg_mock_67890",
                "status": "sent"
            }),
            other => json!({
                "status": "success",
                "message": format!("Mock response for {}", other)
            }),
        };

        Ok(response)
    }
}
