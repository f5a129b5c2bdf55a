//! Policy violations and guardrail verdicts.
//!
//! A violation is a first-class outcome, not an error: it alters response
//! content without failing the request.

use serde::{Deserialize, Serialize};

/// How serious a policy violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Corrective action a policy requests for its violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    /// Replace the offending substrings with category markers
    Redact,

    /// Replace the entire content with the block marker
    Block,

    /// Append the standard disclaimer suffix
    AppendDisclaimer,
}

/// One detected violation of a named policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Policy that was violated (e.g. "phi_redaction")
    pub policy: String,

    /// Specific violation within the policy (e.g. "phi_exposure_ssn")
    pub violation_type: String,

    /// Severity classification
    pub severity: Severity,

    /// Human-readable description
    pub description: String,

    /// Requested corrective action
    pub action: PolicyAction,
}

/// Outcome of running all guardrail policies over a piece of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// True iff no violations were found
    pub passed: bool,

    /// True iff any violation is critical-severity. Decoupled from whether
    /// the content was actually replaced by the block marker: PHI violations
    /// are critical but request redaction, not blocking.
    pub should_block: bool,

    /// All violations found, across every policy
    pub violations: Vec<PolicyViolation>,

    /// Content after redaction / blocking / disclaimer injection
    pub redacted_content: String,

    /// Length of the original content in characters
    pub original_length: usize,

    /// Length of the transformed content in characters
    pub redacted_length: usize,
}

impl GuardrailVerdict {
    /// Build a verdict from collected violations and transformed content.
    pub fn new(violations: Vec<PolicyViolation>, original: &str, redacted: String) -> Self {
        let should_block = violations.iter().any(|v| v.severity == Severity::Critical);
        Self {
            passed: violations.is_empty(),
            should_block,
            violations,
            original_length: original.chars().count(),
            redacted_length: redacted.chars().count(),
            redacted_content: redacted,
        }
    }
}
