//! Uniform execution wrapper around specialist capabilities.
//!
//! Every capability call goes through [`AgentRunner::run`], which times the
//! call, bounds it with the configured timeout, converts any failure into a
//! `success=false` result instead of propagating it, and emits exactly one
//! audit event per call with PHI-redacted payloads. This is the single place
//! where a specialist fault is allowed to cross a component boundary, and it
//! crosses as data, not as an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::capabilities::Capability;
use crate::domain::{AuditEvent, AuditEventType, ResultEnvelope, TaskEnvelope};

use super::audit_trail::AuditTrail;

/// Wraps every specialist invocation with timing, error capture, and audit
/// emission.
pub struct AgentRunner {
    audit: Arc<AuditTrail>,
    specialist_timeout: Duration,
}

impl AgentRunner {
    /// Create a runner with the given specialist timeout.
    pub fn new(audit: Arc<AuditTrail>, specialist_timeout: Duration) -> Self {
        Self {
            audit,
            specialist_timeout,
        }
    }

    /// Invoke a capability and always produce a result.
    ///
    /// A returned error or a timeout becomes `success=false` with the fault
    /// message as `error`; the runner itself never fails. If the caller
    /// drops this future mid-call, the in-flight specialist future is
    /// dropped with it and an abort event is still recorded.
    pub async fn run(&self, capability: &dyn Capability, task: &TaskEnvelope) -> ResultEnvelope {
        let agent_name = capability.name().to_string();
        let start = Instant::now();

        debug!(agent = %agent_name, task_id = %task.task_id, "Starting capability execution");

        let mut guard = AbortGuard::new(self.audit.clone(), &agent_name, task);

        let outcome = timeout(self.specialist_timeout, capability.execute(task)).await;
        let elapsed = start.elapsed();

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(
                    agent = %agent_name,
                    task_id = %task.task_id,
                    error = %e,
                    "Capability execution failed"
                );
                ResultEnvelope::failure(&agent_name, task.task_id, e.to_string())
            }
            Err(_) => {
                warn!(
                    agent = %agent_name,
                    task_id = %task.task_id,
                    timeout = ?self.specialist_timeout,
                    "Capability execution timed out"
                );
                ResultEnvelope::failure(
                    &agent_name,
                    task.task_id,
                    format!(
                        "capability '{}' timed out after {:?}",
                        agent_name, self.specialist_timeout
                    ),
                )
            }
        };
        result.execution_time = elapsed;

        // Disarm only after the call event has landed: a drop during the
        // emit itself still records an abort event instead of nothing.
        self.emit_call_event(&agent_name, task, &result).await;
        guard.disarm();

        debug!(
            agent = %agent_name,
            task_id = %task.task_id,
            success = result.success,
            elapsed_ms = elapsed.as_millis() as u64,
            "Capability execution completed"
        );

        result
    }

    async fn emit_call_event(
        &self,
        agent_name: &str,
        task: &TaskEnvelope,
        result: &ResultEnvelope,
    ) {
        let input = json!({
            "query": task.query,
            "context": task.context,
        });
        let output = json!({
            "response": result.display_text(),
            "confidence": result.confidence,
            "success": result.success,
        });

        let metadata: HashMap<String, Value> = [
            ("action".to_string(), json!("execute")),
            ("task_id".to_string(), json!(task.task_id)),
            (
                "execution_time_ms".to_string(),
                json!(result.execution_time.as_millis() as u64),
            ),
            ("provenance".to_string(), json!(result.provenance)),
        ]
        .into();

        let event = AuditEvent::new(
            AuditEventType::AgentCall,
            agent_name,
            task.user_id.as_deref().unwrap_or("system"),
            task.session_id,
            input,
            output,
        )
        .with_metadata(metadata);

        // log_event never fails; sink errors are logged and counted there.
        self.audit.log_event(event).await;
    }
}

/// Records an aborted call if the runner future is dropped before the
/// normal audit event is emitted.
struct AbortGuard {
    audit: Arc<AuditTrail>,
    agent_name: String,
    user_id: String,
    session_id: Uuid,
    task_id: Uuid,
    query: String,
    armed: bool,
}

impl AbortGuard {
    fn new(audit: Arc<AuditTrail>, agent_name: &str, task: &TaskEnvelope) -> Self {
        Self {
            audit,
            agent_name: agent_name.to_string(),
            user_id: task.user_id.clone().unwrap_or_else(|| "system".to_string()),
            session_id: task.session_id,
            task_id: task.task_id,
            query: task.query.clone(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let event = AuditEvent::new(
            AuditEventType::AgentCallAborted,
            self.agent_name.clone(),
            self.user_id.clone(),
            self.session_id,
            json!({"query": self.query}),
            Value::Null,
        )
        .with_metadata([("task_id".to_string(), json!(self.task_id))].into());

        let audit = self.audit.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    audit.log_event(event).await;
                });
            }
            Err(_) => {
                error!(
                    agent = %self.agent_name,
                    task_id = %self.task_id,
                    "Aborted call could not be recorded: no runtime"
                );
            }
        }
    }
}
