//! medroute - Policy-guarded clinical agent orchestrator
//!
//! Routes free-text clinical queries to specialist capabilities, wraps every
//! call in a uniform execution envelope, enforces content policies on the
//! output, and records an append-only audit trail with provenance chains.
//!
//! # Architecture
//!
//! One request flows through four stages, strictly in order:
//! - The router classifies intent with keyword rules and picks a capability
//! - The runner executes the capability, capturing failures as data
//! - The guardrail enforcer redacts PHI, blocks harmful content, and appends
//!   disclaimers to medical advice
//! - The audit trail records the call with hashed, redacted payloads
//!
//! # Modules
//!
//! - `capabilities`: The specialist trait and registry
//! - `collaborators`: External tool transports (mock, HTTP)
//! - `core`: Orchestration logic (Router, AgentRunner, Guardrails, Audit)
//! - `domain`: Data structures (TaskEnvelope, ResultEnvelope, AuditEvent)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Route a query through the pipeline
//! medroute ask "I need to schedule an appointment"
//!
//! # Invoke a capability directly
//! medroute invoke knowledge "what are the symptoms of flu"
//!
//! # Inspect the audit trail
//! medroute audit --limit 10
//!
//! # Explain a session as a timeline
//! medroute explain --session <session-id>
//! ```

pub mod capabilities;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::{
    AgentRunner, AuditQuery, AuditTrail, ExplainTarget, GuardrailEnforcer, Orchestrator,
    OrchestratorError, OrchestratorRequest, OrchestratorResponse, Router, RoutingDecision,
};
pub use domain::{
    AuditEvent, AuditEventType, GuardrailVerdict, PolicyAction, PolicyViolation, ResultEnvelope,
    Severity, TaskEnvelope,
};

pub use capabilities::{Capability, CapabilityRegistry};
pub use collaborators::ToolClient;
