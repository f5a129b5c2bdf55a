//! Data structures shared across the orchestration pipeline.
//!
//! - `envelope`: the task/result contract between orchestrator and capabilities
//! - `policy`: guardrail violations and verdicts
//! - `audit`: audit events, provenance chains, and decision timelines

pub mod audit;
pub mod envelope;
pub mod policy;

pub use audit::{
    AgentAction, AuditEvent, AuditEventType, DecisionTimeline, ProvenanceChain, ProvenanceStep,
    TimelineEntry,
};
pub use envelope::{ResultEnvelope, TaskEnvelope};
pub use policy::{GuardrailVerdict, PolicyAction, PolicyViolation, Severity};
