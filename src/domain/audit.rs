//! Audit and provenance data types.
//!
//! Audit events are the compliance record of the system: written once with
//! PHI already redacted, read many times, never mutated or deleted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single entry in the append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Globally unique identifier, generated at write time
    pub event_id: Uuid,

    /// What kind of event this records
    pub event_type: AuditEventType,

    /// Agent that performed the action (or "system")
    pub agent_name: String,

    /// User on whose behalf the action ran (or "system")
    pub user_id: String,

    /// Session the action belongs to
    pub session_id: Uuid,

    /// Input payload, PHI-redacted before persistence
    pub input: Value,

    /// Output payload, PHI-redacted before persistence
    pub output: Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, Value>,

    /// When the event was written
    pub timestamp: DateTime<Utc>,
}

/// Categories of audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A capability call ran to completion (success or captured failure)
    AgentCall,

    /// A capability call was abandoned by the caller mid-flight
    AgentCallAborted,

    /// A guardrail policy fired
    GuardrailViolation,

    /// A provenance chain was recorded
    ProvenanceChain,

    /// A data source was consulted
    DataAccess,

    /// Anything else
    Generic,
}

/// One completed agent action, as supplied to the provenance chain builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    /// Agent that acted
    pub agent_name: String,

    /// What the agent did
    pub action: String,

    /// When it acted
    pub timestamp: DateTime<Utc>,

    /// Raw input payload (hashed, never stored, by the chain builder)
    pub input: Option<Value>,

    /// Raw output payload (hashed, never stored, by the chain builder)
    pub output: Option<Value>,

    /// Step numbers this action depended on
    #[serde(default)]
    pub dependencies: Vec<u32>,
}

/// An ordered, hash-referenced record of the steps behind a decision.
///
/// Steps reference payloads via content hashes so a chain can be stored or
/// shared without re-exposing protected content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceChain {
    /// Unique chain identifier
    pub chain_id: Uuid,

    /// When the chain was built
    pub created_at: DateTime<Utc>,

    /// Steps in input order, numbered from 1
    pub steps: Vec<ProvenanceStep>,
}

/// One step in a provenance chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceStep {
    /// 1-based position in the chain
    pub step_number: u32,

    /// Agent that performed this step
    pub agent: String,

    /// Action taken
    pub action: String,

    /// When the step ran
    pub timestamp: DateTime<Utc>,

    /// Content hash of the step input ("null" when absent)
    pub input_hash: String,

    /// Content hash of the step output ("null" when absent)
    pub output_hash: String,

    /// Step numbers this step depended on
    #[serde(default)]
    pub dependencies: Vec<u32>,
}

/// A reconstructed, human-readable explanation of a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTimeline {
    /// What the timeline was built from (session or chain id)
    pub subject: String,

    /// Ordered hops, oldest first
    pub entries: Vec<TimelineEntry>,
}

/// One hop in a decision timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// 1-based position
    pub step: u32,

    /// Agent involved
    pub agent: String,

    /// Action taken
    pub action: String,

    /// Short summary of the result
    pub result: String,

    /// Upstream data sources or payload hashes consulted
    #[serde(default)]
    pub sources: Vec<String>,

    /// When the hop occurred
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(
        event_type: AuditEventType,
        agent_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: Uuid,
        input: Value,
        output: Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            agent_name: agent_name.into(),
            user_id: user_id.into(),
            session_id,
            input,
            output,
            metadata: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
