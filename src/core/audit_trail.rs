//! Append-only audit trail with provenance chains and explainability.
//!
//! Everything on the audit path is best-effort and isolated from the primary
//! request: `log_event` never fails its caller. Persistence failures are
//! logged locally and counted on an atomic counter so compliance gaps stay
//! visible out-of-band.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::error;
use uuid::Uuid;

use crate::domain::{
    AgentAction, AuditEvent, AuditEventType, DecisionTimeline, ProvenanceChain, ProvenanceStep,
    TimelineEntry,
};

use super::redact;
use super::sink::AuditSink;

/// Filters for querying the audit trail. Any subset may be set.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Only events for this user
    pub user_id: Option<String>,

    /// Only events in this session
    pub session_id: Option<Uuid>,

    /// Only events of this type
    pub event_type: Option<AuditEventType>,

    /// Only events at or after this time
    pub from: Option<DateTime<Utc>>,

    /// Only events at or before this time
    pub to: Option<DateTime<Utc>>,

    /// Number of (newest-first) events to skip
    pub skip: usize,

    /// Maximum number of events to return
    pub limit: Option<usize>,
}

/// What to explain: a whole session, or one recorded provenance chain.
#[derive(Debug, Clone, Copy)]
pub enum ExplainTarget {
    /// All hops recorded for a session, oldest first
    Session(Uuid),

    /// The steps of a previously built provenance chain
    Chain(Uuid),
}

/// The durable decision record of the system.
pub struct AuditTrail {
    sink: Arc<dyn AuditSink>,
    phi_redaction: bool,
    dropped_events: AtomicU64,
}

impl AuditTrail {
    /// Create a trail over the given sink, with PHI redaction on.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            phi_redaction: true,
            dropped_events: AtomicU64::new(0),
        }
    }

    /// Toggle PHI redaction of persisted payloads.
    pub fn with_phi_redaction(mut self, enabled: bool) -> Self {
        self.phi_redaction = enabled;
        self
    }

    /// Persist one event, redacting PHI from its input and output payloads
    /// first. Never fails the caller: a sink failure is logged and counted.
    ///
    /// Returns the generated event id either way.
    pub async fn log_event(&self, mut event: AuditEvent) -> Uuid {
        if self.phi_redaction {
            event.input = redact::redact_value(&event.input);
            event.output = redact::redact_value(&event.output);
        }

        let event_id = event.event_id;
        if let Err(e) = self.sink.append(&event).await {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            error!(
                event_id = %event_id,
                error = %e,
                "Failed to persist audit event, degrading to local log"
            );
        }

        event_id
    }

    /// Events dropped due to sink failures since startup.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Query events, newest first, with skip/limit pagination. Pure read.
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>> {
        let mut events = self.sink.load().await.context("Failed to load audit events")?;

        events.retain(|e| {
            query.user_id.as_ref().map_or(true, |u| &e.user_id == u)
                && query.session_id.map_or(true, |s| e.session_id == s)
                && query.event_type.map_or(true, |t| e.event_type == t)
                && query.from.map_or(true, |from| e.timestamp >= from)
                && query.to.map_or(true, |to| e.timestamp <= to)
        });

        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let events = events
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(events)
    }

    /// Build a provenance chain from ordered agent actions.
    ///
    /// Each step carries content hashes of its input and output instead of
    /// raw payloads. The chain is also persisted best-effort as a
    /// provenance event so it can be explained later.
    pub async fn build_provenance_chain(&self, actions: &[AgentAction]) -> ProvenanceChain {
        let steps = actions
            .iter()
            .enumerate()
            .map(|(i, action)| ProvenanceStep {
                step_number: (i + 1) as u32,
                agent: action.agent_name.clone(),
                action: action.action.clone(),
                timestamp: action.timestamp,
                input_hash: hash_content(action.input.as_ref()),
                output_hash: hash_content(action.output.as_ref()),
                dependencies: action.dependencies.clone(),
            })
            .collect();

        let chain = ProvenanceChain {
            chain_id: Uuid::new_v4(),
            created_at: Utc::now(),
            steps,
        };

        // Chains carry hashes only, so the chain event needs no redaction
        // pass of its own; the session slot holds the chain id so the chain
        // is addressable through the normal query path.
        let event = AuditEvent::new(
            AuditEventType::ProvenanceChain,
            "audit_trail",
            "system",
            chain.chain_id,
            Value::Null,
            Value::Null,
        )
        .with_metadata(
            [(
                "chain".to_string(),
                serde_json::to_value(&chain).unwrap_or(Value::Null),
            )]
            .into(),
        );
        self.log_event(event).await;

        chain
    }

    /// Reconstruct a human-readable decision timeline from logged events.
    /// Never mutates state.
    pub async fn explain(&self, target: ExplainTarget) -> Result<DecisionTimeline> {
        match target {
            ExplainTarget::Session(session_id) => self.explain_session(session_id).await,
            ExplainTarget::Chain(chain_id) => self.explain_chain(chain_id).await,
        }
    }

    async fn explain_session(&self, session_id: Uuid) -> Result<DecisionTimeline> {
        let mut events = self
            .query(&AuditQuery {
                session_id: Some(session_id),
                ..Default::default()
            })
            .await?;

        // Query returns newest first; a timeline reads oldest first.
        events.reverse();

        let entries = events
            .iter()
            .enumerate()
            .map(|(i, event)| TimelineEntry {
                step: (i + 1) as u32,
                agent: event.agent_name.clone(),
                action: event
                    .metadata
                    .get("action")
                    .and_then(Value::as_str)
                    .unwrap_or("execute")
                    .to_string(),
                result: summarize(&event.output),
                sources: event
                    .metadata
                    .get("sources")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                timestamp: event.timestamp,
            })
            .collect();

        Ok(DecisionTimeline {
            subject: session_id.to_string(),
            entries,
        })
    }

    async fn explain_chain(&self, chain_id: Uuid) -> Result<DecisionTimeline> {
        let events = self
            .query(&AuditQuery {
                session_id: Some(chain_id),
                event_type: Some(AuditEventType::ProvenanceChain),
                ..Default::default()
            })
            .await?;

        let chain: ProvenanceChain = events
            .first()
            .and_then(|e| e.metadata.get("chain"))
            .map(|v| serde_json::from_value(v.clone()))
            .transpose()
            .context("Failed to parse recorded provenance chain")?
            .with_context(|| format!("No provenance chain recorded with id {}", chain_id))?;

        let entries = chain
            .steps
            .iter()
            .map(|step| TimelineEntry {
                step: step.step_number,
                agent: step.agent.clone(),
                action: step.action.clone(),
                result: format!("output {}", step.output_hash),
                sources: vec![format!("input {}", step.input_hash)],
                timestamp: step.timestamp,
            })
            .collect();

        Ok(DecisionTimeline {
            subject: chain_id.to_string(),
            entries,
        })
    }
}

/// Content-addressed hash: first 16 hex chars of the SHA-256 of the
/// canonical JSON serialization (keys sorted). Absent payloads hash to the
/// literal "null".
pub fn hash_content(data: Option<&Value>) -> String {
    let Some(data) = data else {
        return "null".to_string();
    };

    let canonical = canonicalize(data).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Rebuild a value with object keys sorted at every level.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.clone());
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Short human-readable summary of an output payload.
fn summarize(output: &Value) -> String {
    let text = match output {
        Value::Null => return "no output".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    const MAX: usize = 120;
    if text.chars().count() > MAX {
        let truncated: String = text.chars().take(MAX).collect();
        format!("{}…", truncated)
    } else {
        text
    }
}
