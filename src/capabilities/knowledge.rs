//! Knowledge capability: document search over an external collaborator.
//!
//! This is the default fallback target for general queries. It delegates to
//! the `search_documents` tool and reports each returned document as a
//! provenance source.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collaborators::ToolClient;
use crate::domain::{ResultEnvelope, TaskEnvelope};

use super::Capability;

/// Document-search backed answer capability.
pub struct KnowledgeCapability {
    tools: Arc<dyn ToolClient>,
}

impl KnowledgeCapability {
    /// Create the capability over a tool client.
    pub fn new(tools: Arc<dyn ToolClient>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Capability for KnowledgeCapability {
    fn name(&self) -> &str {
        "knowledge"
    }

    async fn execute(&self, task: &TaskEnvelope) -> Result<ResultEnvelope> {
        let payload = json!({
            "query": task.query,
            "top_k": 3,
        });

        let response = self.tools.call_tool("search_documents", payload).await?;

        let results = response["results"].as_array().cloned().unwrap_or_default();

        let provenance: Vec<Value> = results
            .iter()
            .map(|doc| {
                json!({
                    "type": "document",
                    "id": doc["id"],
                    "title": doc["title"],
                    "score": doc["score"],
                })
            })
            .collect();

        let answer = match results.first() {
            Some(best) => json!({
                "answer": best["content"],
                "matched_documents": results.len(),
            }),
            None => json!({
                "answer": "No matching documents found.",
                "matched_documents": 0,
            }),
        };

        let confidence = results
            .first()
            .and_then(|doc| doc["score"].as_f64())
            .unwrap_or(0.5);

        Ok(
            ResultEnvelope::success(self.name(), task.task_id, answer, confidence)
                .with_provenance(provenance),
        )
    }
}
