//! Specialist capabilities.
//!
//! A capability is a named kind of work a specialist can perform. The core
//! depends only on the `Capability` contract; implementations are held in an
//! explicit ordered registry populated at startup (composition and a lookup
//! table, no inheritance chains).

pub mod knowledge;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{ResultEnvelope, TaskEnvelope};

pub use knowledge::KnowledgeCapability;

/// A specialist handler the orchestrator can dispatch to.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Capability name, as resolved by the router.
    fn name(&self) -> &str;

    /// Context keys that must be present before this capability runs.
    /// Missing keys are rejected as a validation error before dispatch.
    fn required_context(&self) -> &[&str] {
        &[]
    }

    /// Perform the work. May fail; the execution runner is the single
    /// place that converts a returned error into a failed result.
    async fn execute(&self, task: &TaskEnvelope) -> Result<ResultEnvelope>;
}

/// Ordered lookup table of capabilities, with a designated default.
pub struct CapabilityRegistry {
    capabilities: Vec<Arc<dyn Capability>>,
    default_name: String,
}

impl CapabilityRegistry {
    /// Create a registry whose fallback is `default_name`.
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            capabilities: Vec::new(),
            default_name: default_name.into(),
        }
    }

    /// Register a capability. Registration order is preserved.
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        self.capabilities.push(capability);
    }

    /// Look up a capability by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Look up a capability, falling back to the default when the name is
    /// not registered.
    pub fn resolve_or_default(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.resolve(name).or_else(|| self.resolve(&self.default_name))
    }

    /// The designated default capability name.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered capability names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name()).collect()
    }
}
