//! Multi-policy guardrail enforcement.
//!
//! Runs a fixed set of independent policy checks over arbitrary text, none
//! short-circuiting the others, then applies corrective transformations in a
//! fixed precedence:
//!
//! 1. redact PHI matches in place,
//! 2. a critical violation with a block action replaces the entire content
//!    with [`BLOCK_MARKER`], overriding everything else,
//! 3. otherwise a disclaimer violation appends [`DISCLAIMER`].
//!
//! `should_block` is derived purely from severity (any critical violation),
//! independent of which transformation actually ran.

use anyhow::{Context, Result};
use regex::Regex;

use crate::domain::{GuardrailVerdict, PolicyAction, PolicyViolation, Severity};

use super::redact;

/// Replacement content when a blocking violation fires.
pub const BLOCK_MARKER: &str = "[CONTENT BLOCKED: Policy violation detected]";

/// Standard disclaimer appended to undisclaimed medical advice.
pub const DISCLAIMER: &str = "\n\n[Disclaimer: This information is not a substitute for \
     professional medical advice. Always consult with a qualified healthcare provider \
     for medical decisions.]";

/// Terms indicating the content gives medical advice.
const MEDICAL_INDICATORS: &[&str] = &[
    "diagnos",
    "treat",
    "prescri",
    "medicati",
    "therap",
    "antibiotic",
    "infection",
    "dosage",
    "symptom",
];

/// Terms indicating a disclaimer is already present.
const DISCLAIMER_INDICATORS: &[&str] = &[
    "not a substitute",
    "consult",
    "healthcare provider",
    "medical professional",
];

/// Default harmful-intent patterns.
pub fn default_unsafe_patterns() -> Vec<String> {
    ["end.*life", "harm.*self", "suicide", "illegal.*drug"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Policy enforcement layer applied to all agent output.
pub struct GuardrailEnforcer {
    /// Whether the PHI policy is active
    phi_enabled: bool,

    /// Compiled unsafe-content patterns, kept alongside their sources so
    /// violation descriptions can name the pattern that fired
    unsafe_patterns: Vec<(String, Regex)>,
}

impl GuardrailEnforcer {
    /// Build an enforcer with the default policy set.
    pub fn new() -> Self {
        // Default patterns are literals; compilation cannot fail.
        Self::with_unsafe_patterns(true, &default_unsafe_patterns())
            .expect("default unsafe patterns must compile")
    }

    /// Build an enforcer with a custom unsafe-content pattern list.
    pub fn with_unsafe_patterns(phi_enabled: bool, patterns: &[String]) -> Result<Self> {
        let unsafe_patterns = patterns
            .iter()
            .map(|p| {
                let regex = Regex::new(&format!("(?i){}", p))
                    .with_context(|| format!("invalid unsafe-content pattern: {}", p))?;
                Ok((p.clone(), regex))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            phi_enabled,
            unsafe_patterns,
        })
    }

    /// Run every policy over `content` and produce a verdict with the
    /// transformed content.
    pub fn enforce(&self, content: &str) -> GuardrailVerdict {
        let mut violations = Vec::new();

        if self.phi_enabled {
            violations.extend(self.check_phi_exposure(content));
        }
        violations.extend(self.check_unsafe_content(content));
        violations.extend(self.check_disclaimer(content));

        let transformed = self.apply_actions(content, &violations);
        GuardrailVerdict::new(violations, content, transformed)
    }

    /// One violation per PHI category with at least one match.
    fn check_phi_exposure(&self, content: &str) -> Vec<PolicyViolation> {
        redact::phi_categories()
            .iter()
            .filter_map(|category| {
                let count = category.count_matches(content);
                if count == 0 {
                    return None;
                }
                Some(PolicyViolation {
                    policy: "phi_redaction".to_string(),
                    violation_type: format!("phi_exposure_{}", category.name),
                    severity: Severity::Critical,
                    description: format!("Found {} instances of {}", count, category.name),
                    action: PolicyAction::Redact,
                })
            })
            .collect()
    }

    /// One violation per harmful-intent pattern that matches.
    fn check_unsafe_content(&self, content: &str) -> Vec<PolicyViolation> {
        self.unsafe_patterns
            .iter()
            .filter(|(_, regex)| regex.is_match(content))
            .map(|(source, _)| PolicyViolation {
                policy: "unsafe_content".to_string(),
                violation_type: "harmful_content".to_string(),
                severity: Severity::High,
                description: format!("Content matches unsafe pattern: {}", source),
                action: PolicyAction::Block,
            })
            .collect()
    }

    /// Medical advice without a disclaimer yields one medium violation.
    fn check_disclaimer(&self, content: &str) -> Vec<PolicyViolation> {
        let lower = content.to_lowercase();

        let gives_advice = MEDICAL_INDICATORS.iter().any(|term| lower.contains(term));
        let has_disclaimer = DISCLAIMER_INDICATORS.iter().any(|term| lower.contains(term));

        if gives_advice && !has_disclaimer {
            vec![PolicyViolation {
                policy: "medical_advice_disclaimer".to_string(),
                violation_type: "missing_disclaimer".to_string(),
                severity: Severity::Medium,
                description: "Medical advice without appropriate disclaimer".to_string(),
                action: PolicyAction::AppendDisclaimer,
            }]
        } else {
            Vec::new()
        }
    }

    /// Apply corrective actions in fixed precedence over the full original
    /// content.
    fn apply_actions(&self, content: &str, violations: &[PolicyViolation]) -> String {
        let mut modified = content.to_owned();

        if violations.iter().any(|v| v.action == PolicyAction::Redact) {
            modified = redact::redact_text(&modified);
        }

        // Blocking wins over redaction and disclaimers.
        if violations
            .iter()
            .any(|v| v.severity == Severity::Critical && v.action == PolicyAction::Block)
        {
            return BLOCK_MARKER.to_string();
        }

        if violations
            .iter()
            .any(|v| v.action == PolicyAction::AppendDisclaimer)
        {
            modified.push_str(DISCLAIMER);
        }

        modified
    }
}

impl Default for GuardrailEnforcer {
    fn default() -> Self {
        Self::new()
    }
}
