//! Stateless intent routing.
//!
//! Holds an ordered list of (capability, pattern list) rules. Every
//! rule-based match carries the same fixed confidence, so "highest
//! confidence wins" degenerates to "first-registered capability wins".
//! The rule table is therefore an explicit `Vec`, never a map, to keep
//! tie-breaking deterministic across runs.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Confidence assigned to every rule-based match.
pub const RULE_CONFIDENCE: f64 = 0.9;

/// Confidence assigned to the fallback decision.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Routing outcome for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Capability the query should be dispatched to
    pub target_capability: String,

    /// How certain the router is (0.9 for rule matches, 0.5 for fallback)
    pub confidence: f64,

    /// Why this capability was chosen
    pub reasoning: String,
}

/// One routing rule: a capability and the patterns that select it.
struct CapabilityRule {
    name: String,
    /// (source, compiled) pairs so reasoning strings can cite the pattern
    patterns: Vec<(String, Regex)>,
}

/// Rule-based intent classifier.
pub struct Router {
    rules: Vec<CapabilityRule>,
    default_capability: String,
}

impl Router {
    /// Build a router from an ordered rule table. Registration order is the
    /// tie-break order.
    pub fn new(
        rules: &[(&str, &[&str])],
        default_capability: impl Into<String>,
    ) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|(name, patterns)| {
                let patterns = patterns
                    .iter()
                    .map(|p| {
                        let regex = Regex::new(&format!("(?i){}", p)).with_context(|| {
                            format!("invalid routing pattern for '{}': {}", name, p)
                        })?;
                        Ok((p.to_string(), regex))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(CapabilityRule {
                    name: name.to_string(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules,
            default_capability: default_capability.into(),
        })
    }

    /// Build the default clinical rule table.
    pub fn with_default_rules() -> Result<Self> {
        Self::new(
            &[
                (
                    "appointment",
                    &[
                        r"book.*appointment",
                        r"schedule.*appointment",
                        r"available.*slot",
                        r"doctor.*availability",
                        r"cancel.*appointment",
                        r"reschedule",
                    ][..],
                ),
                (
                    "image_analysis",
                    &[
                        r"analyze.*image",
                        r"symptom.*photo",
                        r"look at.*picture",
                        r"rash",
                        r"lesion",
                        r"skin.*condition",
                    ][..],
                ),
                (
                    "report_understanding",
                    &[
                        r"read.*report",
                        r"understand.*pdf",
                        r"lab.*result",
                        r"test.*result",
                        r"medical.*record",
                        r"extract.*report",
                    ][..],
                ),
                (
                    "prescription",
                    &[
                        r"prescri(be|ption)",
                        r"medication",
                        r"drug.*interaction",
                        r"pharmacy",
                        r"refill",
                    ][..],
                ),
                (
                    "knowledge",
                    &[
                        r"find.*document",
                        r"search.*record",
                        r"what does.*say",
                        r"information.*about",
                        r"history.*of",
                    ][..],
                ),
                (
                    "records",
                    &[
                        r"query.*database",
                        r"patient.*record",
                        r"statistics",
                        r"count.*patients",
                        r"list.*all",
                    ][..],
                ),
                (
                    "payment",
                    &[r"payment", r"billing", r"invoice", r"insurance", r"cost"][..],
                ),
            ],
            "knowledge",
        )
    }

    /// Classify a query. Pure: identical queries always yield identical
    /// decisions.
    pub fn classify(&self, query: &str) -> RoutingDecision {
        let query = query.to_lowercase();

        // First matching pattern per capability, at most one match recorded
        // per capability; all matches share RULE_CONFIDENCE, so the first
        // matching capability in registration order wins.
        for rule in &self.rules {
            if let Some((source, _)) = rule
                .patterns
                .iter()
                .find(|(_, regex)| regex.is_match(&query))
            {
                return RoutingDecision {
                    target_capability: rule.name.clone(),
                    confidence: RULE_CONFIDENCE,
                    reasoning: format!("Matched pattern: {}", source),
                };
            }
        }

        RoutingDecision {
            target_capability: self.default_capability.clone(),
            confidence: FALLBACK_CONFIDENCE,
            reasoning: format!(
                "No pattern matched, routing to default capability '{}'",
                self.default_capability
            ),
        }
    }

    /// Capability names in registration order.
    pub fn capabilities(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// The fallback capability name.
    pub fn default_capability(&self) -> &str {
        &self.default_capability
    }
}
