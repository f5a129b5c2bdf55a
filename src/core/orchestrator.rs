//! End-to-end request flow.
//!
//! Drives one request through Router → Specialist → Guardrails → Audit,
//! strictly in that order. Specialist failures are captured data; only
//! validation and classification problems fail the request itself.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::capabilities::{Capability, CapabilityRegistry};
use crate::domain::{AuditEvent, AuditEventType, PolicyViolation, TaskEnvelope};

use super::audit_trail::AuditTrail;
use super::guardrails::{GuardrailEnforcer, BLOCK_MARKER};
use super::router::Router;
use super::runner::AgentRunner;

/// One incoming request.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorRequest {
    /// Free-text query
    pub query: String,

    /// Structured context passed through to the capability
    pub context: HashMap<String, Value>,

    /// Session to attribute the request to (generated when absent)
    pub session_id: Option<Uuid>,

    /// Requesting user
    pub user_id: Option<String>,
}

/// The user-visible outcome of a request.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResponse {
    /// Capability that handled the request
    pub agent_name: String,

    /// Final content after guardrail enforcement
    pub response: String,

    /// Specialist confidence in its own answer
    pub confidence: f64,

    /// Source descriptors consulted by the specialist
    pub provenance: Vec<Value>,

    /// Combined pipeline metadata (routing confidence, guardrail count)
    pub metadata: HashMap<String, Value>,

    /// Session the request ran under
    pub session_id: Uuid,
}

/// Faults that fail a request outright. Specialist faults never appear
/// here; they are captured into the result and surfaced through the
/// guardrail-filtered response content.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A required context field was missing; rejected before any agent ran
    #[error("Missing required context field: {field}")]
    Validation { field: String },

    /// The router could not be built or consulted
    #[error("Intent classification failed: {0}")]
    Classification(String),

    /// Neither the requested capability nor the default is registered
    #[error("No capability registered for '{0}' and no default available")]
    UnknownCapability(String),
}

/// Composes the pipeline stages into one request flow.
pub struct Orchestrator {
    router: Router,
    registry: CapabilityRegistry,
    runner: AgentRunner,
    guardrails: GuardrailEnforcer,
    audit: Arc<AuditTrail>,
}

impl Orchestrator {
    /// Assemble the pipeline. All dependencies are constructed at bootstrap
    /// and passed in; nothing here is global.
    pub fn new(
        router: Router,
        registry: CapabilityRegistry,
        runner: AgentRunner,
        guardrails: GuardrailEnforcer,
        audit: Arc<AuditTrail>,
    ) -> Self {
        Self {
            router,
            registry,
            runner,
            guardrails,
            audit,
        }
    }

    /// Handle one request end-to-end.
    #[instrument(skip(self, request), fields(query_len = request.query.len()))]
    pub async fn handle(
        &self,
        request: OrchestratorRequest,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        let decision = self.router.classify(&request.query);
        info!(
            target_capability = %decision.target_capability,
            confidence = decision.confidence,
            "Classified request"
        );

        let capability = self
            .registry
            .resolve_or_default(&decision.target_capability)
            .ok_or_else(|| {
                OrchestratorError::UnknownCapability(decision.target_capability.clone())
            })?;

        let mut metadata = HashMap::new();
        metadata.insert("routing_confidence".to_string(), json!(decision.confidence));
        metadata.insert("routing_reasoning".to_string(), json!(decision.reasoning));

        self.dispatch(capability.as_ref(), request, metadata).await
    }

    /// Invoke a named capability directly, bypassing the router but keeping
    /// the execution wrapper, guardrails, and audit trail.
    pub async fn invoke(
        &self,
        capability_name: &str,
        request: OrchestratorRequest,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        let capability = self
            .registry
            .resolve(capability_name)
            .ok_or_else(|| OrchestratorError::UnknownCapability(capability_name.to_string()))?;

        let mut metadata = HashMap::new();
        metadata.insert("direct_invocation".to_string(), json!(true));

        self.dispatch(capability.as_ref(), request, metadata).await
    }

    async fn dispatch(
        &self,
        capability: &dyn Capability,
        request: OrchestratorRequest,
        mut metadata: HashMap<String, Value>,
    ) -> Result<OrchestratorResponse, OrchestratorError> {
        // Validation happens before any agent runs.
        for field in capability.required_context() {
            if !request.context.contains_key(*field) {
                return Err(OrchestratorError::Validation {
                    field: field.to_string(),
                });
            }
        }

        let task = TaskEnvelope::new(
            request.query,
            request.context,
            request.session_id,
            request.user_id,
        );
        let session_id = task.session_id;

        // Specialist failures are captured into the result; error text goes
        // through the same guardrails as responses so it cannot leak PHI.
        let result = self.runner.run(capability, &task).await;

        let verdict = self.guardrails.enforce(&result.display_text());

        if !verdict.passed {
            self.log_guardrail_violations(&task, capability.name(), &verdict.violations)
                .await;
        }

        let response = if verdict.should_block {
            BLOCK_MARKER.to_string()
        } else {
            verdict.redacted_content
        };

        metadata.insert(
            "guardrails_applied".to_string(),
            json!(verdict.violations.len()),
        );

        Ok(OrchestratorResponse {
            agent_name: result.agent_name,
            response,
            confidence: result.confidence,
            provenance: result.provenance,
            metadata,
            session_id,
        })
    }

    async fn log_guardrail_violations(
        &self,
        task: &TaskEnvelope,
        agent_name: &str,
        violations: &[PolicyViolation],
    ) {
        let event = AuditEvent::new(
            AuditEventType::GuardrailViolation,
            "guardrails",
            task.user_id.as_deref().unwrap_or("system"),
            task.session_id,
            json!({"source_agent": agent_name}),
            json!(violations),
        )
        .with_metadata(
            [
                ("action".to_string(), json!("enforce")),
                ("task_id".to_string(), json!(task.task_id)),
            ]
            .into(),
        );

        self.audit.log_event(event).await;
    }

    /// The audit trail this orchestrator writes to.
    pub fn audit(&self) -> &Arc<AuditTrail> {
        &self.audit
    }

    /// Registered capability names, in registration order.
    pub fn capabilities(&self) -> Vec<&str> {
        self.registry.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::{AuditSink, MemoryAuditSink};
    use crate::domain::ResultEnvelope;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Canned {
        name: &'static str,
        response: String,
        required: &'static [&'static str],
    }

    #[async_trait]
    impl Capability for Canned {
        fn name(&self) -> &str {
            self.name
        }

        fn required_context(&self) -> &[&str] {
            self.required
        }

        async fn execute(&self, task: &TaskEnvelope) -> Result<ResultEnvelope> {
            Ok(ResultEnvelope::success(
                self.name,
                task.task_id,
                json!(self.response.clone()),
                0.9,
            ))
        }
    }

    fn orchestrator_with(
        capabilities: Vec<Arc<dyn Capability>>,
    ) -> (Orchestrator, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let audit = Arc::new(AuditTrail::new(sink.clone()));

        let mut registry = CapabilityRegistry::new("knowledge");
        for capability in capabilities {
            registry.register(capability);
        }

        let orchestrator = Orchestrator::new(
            Router::with_default_rules().unwrap(),
            registry,
            AgentRunner::new(audit.clone(), Duration::from_secs(5)),
            GuardrailEnforcer::new(),
            audit,
        );
        (orchestrator, sink)
    }

    #[tokio::test]
    async fn test_routes_to_matching_capability() {
        let (orchestrator, _) = orchestrator_with(vec![
            Arc::new(Canned {
                name: "appointment",
                response: "Booked for Tuesday.".to_string(),
                required: &[],
            }),
            Arc::new(Canned {
                name: "knowledge",
                response: "General answer.".to_string(),
                required: &[],
            }),
        ]);

        let response = orchestrator
            .handle(OrchestratorRequest {
                query: "schedule an appointment with Dr. Smith".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.agent_name, "appointment");
        assert_eq!(response.metadata["routing_confidence"], json!(0.9));
    }

    #[tokio::test]
    async fn test_unmatched_query_falls_back_to_default() {
        let (orchestrator, _) = orchestrator_with(vec![Arc::new(Canned {
            name: "knowledge",
            response: "General answer.".to_string(),
            required: &[],
        })]);

        let response = orchestrator
            .handle(OrchestratorRequest {
                query: "good morning".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.agent_name, "knowledge");
        assert_eq!(response.metadata["routing_confidence"], json!(0.5));
    }

    #[tokio::test]
    async fn test_missing_context_rejected_before_dispatch() {
        let (orchestrator, sink) = orchestrator_with(vec![Arc::new(Canned {
            name: "payment",
            response: "Charged.".to_string(),
            required: &["invoice_id"],
        })]);

        let result = orchestrator
            .handle(OrchestratorRequest {
                query: "pay my billing invoice".to_string(),
                ..Default::default()
            })
            .await;

        assert!(matches!(
            result,
            Err(OrchestratorError::Validation { ref field }) if field == "invoice_id"
        ));
        // Nothing ran, nothing audited.
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_phi_in_response_redacted_and_blocked() {
        let (orchestrator, sink) = orchestrator_with(vec![Arc::new(Canned {
            name: "knowledge",
            response: "Patient SSN: 123-45-6789".to_string(),
            required: &[],
        })]);

        let response = orchestrator
            .handle(OrchestratorRequest {
                query: "good morning".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        // Critical severity forces the block marker to the caller even
        // though the transformation was a redaction.
        assert_eq!(response.response, BLOCK_MARKER);
        assert_eq!(response.metadata["guardrails_applied"], json!(1));

        // One call event plus one guardrail violation event.
        let events = sink.load().await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .any(|e| e.event_type == AuditEventType::GuardrailViolation));
    }

    #[tokio::test]
    async fn test_direct_invocation_bypasses_router() {
        let (orchestrator, _) = orchestrator_with(vec![
            Arc::new(Canned {
                name: "appointment",
                response: "Booked.".to_string(),
                required: &[],
            }),
            Arc::new(Canned {
                name: "knowledge",
                response: "General.".to_string(),
                required: &[],
            }),
        ]);

        // The query would route to appointment; direct invocation ignores it.
        let response = orchestrator
            .invoke(
                "knowledge",
                OrchestratorRequest {
                    query: "schedule an appointment".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(response.agent_name, "knowledge");
        assert_eq!(response.metadata["direct_invocation"], json!(true));
    }

    #[tokio::test]
    async fn test_unknown_direct_capability_is_an_error() {
        let (orchestrator, _) = orchestrator_with(vec![]);
        let result = orchestrator
            .invoke("nonexistent", OrchestratorRequest::default())
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::UnknownCapability(_))
        ));
    }
}
