//! Command-line interface for medroute.
//!
//! Provides commands for submitting queries through the full pipeline,
//! invoking a capability directly, querying the audit trail, and explaining
//! past decisions.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::capabilities::{CapabilityRegistry, KnowledgeCapability};
use crate::collaborators::{HttpToolClient, MockToolClient, ToolClient};
use crate::config::{self, ToolMode};
use crate::core::{
    AgentRunner, AuditQuery, AuditTrail, ExplainTarget, GuardrailEnforcer, JsonlAuditSink,
    Orchestrator, OrchestratorError, OrchestratorRequest, Router,
};
use crate::domain::AuditEventType;

/// medroute - policy-guarded clinical agent orchestrator
#[derive(Parser, Debug)]
#[command(name = "medroute")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route a query through the full pipeline
    Ask {
        /// Free-text query
        query: String,

        /// Session to attribute the request to
        #[arg(long)]
        session: Option<Uuid>,

        /// Requesting user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Invoke a capability directly, bypassing the router
    Invoke {
        /// Capability name
        capability: String,

        /// Free-text query
        query: String,

        /// Session to attribute the request to
        #[arg(long)]
        session: Option<Uuid>,

        /// Requesting user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Query the audit trail (newest first)
    Audit {
        /// Filter by session
        #[arg(long)]
        session: Option<Uuid>,

        /// Filter by user
        #[arg(long)]
        user: Option<String>,

        /// Filter by event type (e.g. agent_call, guardrail_violation)
        #[arg(long)]
        event_type: Option<String>,

        /// Only events at or after this time (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Only events at or before this time (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        /// Events to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Maximum events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Explain a past decision as an ordered timeline
    Explain {
        /// Explain everything recorded for a session
        #[arg(long, conflicts_with = "chain")]
        session: Option<Uuid>,

        /// Explain a recorded provenance chain
        #[arg(long)]
        chain: Option<Uuid>,
    },

    /// List registered capabilities in registration order
    Capabilities,
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let orchestrator = bootstrap().await?;

        match self.command {
            Commands::Ask {
                query,
                session,
                user,
            } => {
                let response = orchestrator
                    .handle(OrchestratorRequest {
                        query,
                        session_id: session,
                        user_id: user,
                        ..Default::default()
                    })
                    .await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }

            Commands::Invoke {
                capability,
                query,
                session,
                user,
            } => {
                let response = orchestrator
                    .invoke(
                        &capability,
                        OrchestratorRequest {
                            query,
                            session_id: session,
                            user_id: user,
                            ..Default::default()
                        },
                    )
                    .await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }

            Commands::Audit {
                session,
                user,
                event_type,
                since,
                until,
                skip,
                limit,
            } => {
                let event_type = event_type.as_deref().map(parse_event_type).transpose()?;
                let events = orchestrator
                    .audit()
                    .query(&AuditQuery {
                        session_id: session,
                        user_id: user,
                        event_type,
                        from: since,
                        to: until,
                        skip,
                        limit: Some(limit),
                    })
                    .await?;

                if events.is_empty() {
                    println!("No matching audit events.");
                }
                for event in events {
                    println!(
                        "{}  {:<22}  {:<18}  session={}  user={}",
                        event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        format!("{:?}", event.event_type),
                        event.agent_name,
                        event.session_id,
                        event.user_id,
                    );
                }
            }

            Commands::Explain { session, chain } => {
                let target = match (session, chain) {
                    (Some(session), None) => ExplainTarget::Session(session),
                    (None, Some(chain)) => ExplainTarget::Chain(chain),
                    _ => anyhow::bail!("Provide exactly one of --session or --chain"),
                };

                let timeline = orchestrator.audit().explain(target).await?;
                println!("Timeline for {}:", timeline.subject);
                for entry in &timeline.entries {
                    println!(
                        "  {}. [{}] {}: {} ({})",
                        entry.step,
                        entry.agent,
                        entry.action,
                        entry.result,
                        entry.timestamp.format("%H:%M:%S"),
                    );
                    for source in &entry.sources {
                        println!("       source: {}", source);
                    }
                }
            }

            Commands::Capabilities => {
                for name in orchestrator.capabilities() {
                    println!("{}", name);
                }
            }
        }

        Ok(())
    }
}

/// Build the orchestrator from configuration.
async fn bootstrap() -> Result<Orchestrator> {
    let config = config::config()?;

    let sink = Arc::new(
        JsonlAuditSink::open(config::audit_dir()?)
            .await
            .context("Failed to open audit sink")?,
    );
    let audit = Arc::new(AuditTrail::new(sink).with_phi_redaction(config.phi_redaction));

    let tools: Arc<dyn ToolClient> = match &config.tool_mode {
        ToolMode::Mock => Arc::new(MockToolClient::new()),
        ToolMode::Http { endpoint, token } => Arc::new(HttpToolClient::new(
            endpoint.clone(),
            token.clone(),
            config.tool_timeout,
        )?),
    };

    let mut registry = CapabilityRegistry::new("knowledge");
    registry.register(Arc::new(KnowledgeCapability::new(tools)));

    let router = Router::with_default_rules()
        .map_err(|e| OrchestratorError::Classification(e.to_string()))?;

    let guardrails =
        GuardrailEnforcer::with_unsafe_patterns(config.phi_redaction, &config.unsafe_patterns)?;

    Ok(Orchestrator::new(
        router,
        registry,
        AgentRunner::new(audit.clone(), config.specialist_timeout),
        guardrails,
        audit,
    ))
}

fn parse_event_type(s: &str) -> Result<AuditEventType> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .with_context(|| format!("Unknown event type: {}", s))
}
