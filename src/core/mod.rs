//! Orchestration logic: routing, guardrails, execution, audit.

pub mod audit_trail;
pub mod guardrails;
pub mod orchestrator;
pub mod redact;
pub mod router;
pub mod runner;
pub mod sink;

pub use audit_trail::{AuditQuery, AuditTrail, ExplainTarget};
pub use guardrails::{GuardrailEnforcer, BLOCK_MARKER, DISCLAIMER};
pub use orchestrator::{
    Orchestrator, OrchestratorError, OrchestratorRequest, OrchestratorResponse,
};
pub use router::{Router, RoutingDecision, FALLBACK_CONFIDENCE, RULE_CONFIDENCE};
pub use runner::AgentRunner;
pub use sink::{AuditSink, JsonlAuditSink, MemoryAuditSink};
