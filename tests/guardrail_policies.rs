//! Guardrail Policy Integration Tests
//!
//! Tests for the full policy set running together: PHI redaction, unsafe
//! content, disclaimer enforcement, and the precedence between their
//! corrective actions.

use medroute::core::{GuardrailEnforcer, BLOCK_MARKER, DISCLAIMER};
use medroute::domain::PolicyAction;

#[test]
fn test_all_policies_run_without_short_circuit() {
    // Content that trips PHI, unsafe content, and the disclaimer check at
    // once. Every policy must report, not just the first.
    let enforcer = GuardrailEnforcer::new();
    let verdict = enforcer.enforce(
        "Your treatment plan: call 555-123-4567. Some patients consider \
         suicide; SSN on file is 123-45-6789.",
    );

    let policies: Vec<&str> = verdict
        .violations
        .iter()
        .map(|v| v.policy.as_str())
        .collect();

    assert!(policies.contains(&"phi_redaction"));
    assert!(policies.contains(&"unsafe_content"));
    assert!(policies.contains(&"medical_advice_disclaimer"));
}

#[test]
fn test_phi_makes_should_block_regardless_of_action() {
    // PHI violations are critical with a redact action. should_block is
    // severity-derived, so it is set even though nothing asked to block.
    let enforcer = GuardrailEnforcer::new();
    let verdict = enforcer.enforce("Reach the patient at jane.doe@example.com");

    assert!(verdict.should_block);
    assert!(verdict
        .violations
        .iter()
        .all(|v| v.action == PolicyAction::Redact));
    assert!(verdict.redacted_content.contains("[REDACTED_EMAIL]"));
    assert_ne!(verdict.redacted_content, BLOCK_MARKER);
}

#[test]
fn test_verdict_lengths_track_transformation() {
    let enforcer = GuardrailEnforcer::new();

    let clean = enforcer.enforce("The pharmacy closes at six.");
    assert_eq!(clean.original_length, clean.redacted_length);

    let disclaimed = enforcer.enforce("Take this medication twice daily");
    assert_eq!(
        disclaimed.redacted_length,
        disclaimed.original_length + DISCLAIMER.chars().count()
    );

    // Lengths are character counts, not byte counts.
    let accented = enforcer.enforce("Señora García's clinic opens at nine.");
    assert_eq!(
        accented.original_length,
        "Señora García's clinic opens at nine.".chars().count()
    );
}

#[test]
fn test_every_phi_category_detected() {
    let enforcer = GuardrailEnforcer::new();

    let cases = [
        ("SSN 123-45-6789", "phi_exposure_ssn"),
        ("card 4111-1111-1111-1111", "phi_exposure_credit_card"),
        ("call 555-123-4567", "phi_exposure_phone"),
        ("email a@b.org", "phi_exposure_email"),
        ("born 01/02/1985", "phi_exposure_date_of_birth"),
        ("chart MRN: 99812", "phi_exposure_mrn"),
    ];

    for (content, expected) in cases {
        let verdict = enforcer.enforce(content);
        assert!(
            verdict
                .violations
                .iter()
                .any(|v| v.violation_type == expected),
            "expected {} for {:?}, got {:?}",
            expected,
            content,
            verdict.violations
        );
    }
}

#[test]
fn test_violation_counts_in_description() {
    let enforcer = GuardrailEnforcer::new();
    let verdict = enforcer.enforce("Numbers: 123-45-6789 and 987-65-4321");

    let ssn = verdict
        .violations
        .iter()
        .find(|v| v.violation_type == "phi_exposure_ssn")
        .unwrap();
    assert!(ssn.description.contains("2 instances"));
}

#[test]
fn test_verdict_serializes_for_audit() {
    let enforcer = GuardrailEnforcer::new();
    let verdict = enforcer.enforce("SSN 123-45-6789");

    let json = serde_json::to_string(&verdict.violations).unwrap();
    assert!(json.contains("phi_exposure_ssn"));
    assert!(json.contains("critical"));
}
