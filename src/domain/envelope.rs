//! Task and result envelopes: the contract between the orchestrator
//! and specialist capabilities.
//!
//! A `TaskEnvelope` is created once per incoming request and never mutated.
//! A `ResultEnvelope` is produced exactly once per capability call, either by
//! the capability itself or by the execution runner when the call fails.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single unit of work handed to a specialist capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Unique identifier for this task
    pub task_id: Uuid,

    /// Free-text request
    pub query: String,

    /// Structured context for the capability (key order is irrelevant)
    #[serde(default)]
    pub context: HashMap<String, Value>,

    /// Session this task belongs to
    pub session_id: Uuid,

    /// Requesting user, if authenticated
    pub user_id: Option<String>,

    /// Additional metadata
    pub metadata: Option<HashMap<String, Value>>,
}

impl TaskEnvelope {
    /// Create a task, generating task and session ids where absent.
    pub fn new(
        query: impl Into<String>,
        context: HashMap<String, Value>,
        session_id: Option<Uuid>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            query: query.into(),
            context,
            session_id: session_id.unwrap_or_else(Uuid::new_v4),
            user_id,
            metadata: None,
        }
    }
}

/// Outcome of one capability call.
///
/// Exactly one of `response` or `error` is meaningful, gated by `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Name of the capability that produced this result
    pub agent_name: String,

    /// Task this result answers
    pub task_id: Uuid,

    /// Whether the call succeeded
    pub success: bool,

    /// Response payload (meaningful iff success)
    pub response: Value,

    /// Self-reported confidence in [0, 1]
    pub confidence: f64,

    /// Ordered source descriptors consulted to produce the response
    #[serde(default)]
    pub provenance: Vec<Value>,

    /// Additional metadata
    pub metadata: Option<HashMap<String, Value>>,

    /// Error message (present iff !success)
    pub error: Option<String>,

    /// Wall-clock duration of the call, stamped by the runner
    #[serde(with = "duration_millis")]
    pub execution_time: Duration,
}

impl ResultEnvelope {
    /// Build a successful result. Confidence is clamped into [0, 1].
    pub fn success(
        agent_name: impl Into<String>,
        task_id: Uuid,
        response: Value,
        confidence: f64,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            task_id,
            success: true,
            response,
            confidence: confidence.clamp(0.0, 1.0),
            provenance: Vec::new(),
            metadata: None,
            error: None,
            execution_time: Duration::ZERO,
        }
    }

    /// Build a failed result carrying the error message.
    pub fn failure(agent_name: impl Into<String>, task_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            task_id,
            success: false,
            response: Value::Null,
            confidence: 0.0,
            provenance: Vec::new(),
            metadata: None,
            error: Some(error.into()),
            execution_time: Duration::ZERO,
        }
    }

    /// Attach provenance descriptors.
    pub fn with_provenance(mut self, provenance: Vec<Value>) -> Self {
        self.provenance = provenance;
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The user-facing text of this result: the stringified response on
    /// success, the error message otherwise. Error text goes through the
    /// same guardrails as responses, so it must not be special-cased.
    pub fn display_text(&self) -> String {
        if self.success {
            match &self.response {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        } else {
            self.error.clone().unwrap_or_else(|| "unknown error".to_string())
        }
    }
}

/// Serialize `Duration` as integer milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
