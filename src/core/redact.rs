//! PHI/PII redaction.
//!
//! A fixed table of category regexes (identifiers resembling SSNs, phone
//! numbers, email addresses, credit cards, dates of birth, medical record
//! numbers). Matches are replaced with a typed marker per category, e.g.
//! `[REDACTED_SSN]`, so downstream consumers can see *that* something was
//! removed and *what kind* without seeing the value.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// One PHI category with its detection pattern.
pub struct PhiCategory {
    /// Category name, e.g. "ssn"
    pub name: &'static str,
    regex: Regex,
}

impl PhiCategory {
    /// The replacement marker for this category, e.g. `[REDACTED_SSN]`.
    pub fn marker(&self) -> String {
        format!("[REDACTED_{}]", self.name.to_uppercase())
    }

    /// Count matches of this category in `text`.
    pub fn count_matches(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }
}

/// The fixed PHI category table, in application order.
///
/// Order matters: categories are applied sequentially over already-redacted
/// text, so broader patterns come after narrower ones (ssn before phone).
pub fn phi_categories() -> &'static [PhiCategory] {
    static CATEGORIES: OnceLock<Vec<PhiCategory>> = OnceLock::new();
    CATEGORIES.get_or_init(|| {
        let table = [
            ("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
            ("credit_card", r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b"),
            ("phone", r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b"),
            ("email", r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            ("date_of_birth", r"\b\d{1,2}/\d{1,2}/\d{2,4}\b"),
            ("mrn", r"\b[Mm][Rr][Nn][-:]?\s*\d+\b"),
        ];

        table
            .iter()
            .map(|(name, pattern)| PhiCategory {
                name,
                // Table is fixed and covered by tests; compilation cannot
                // fail at runtime for these literals.
                regex: Regex::new(pattern).expect("invalid PHI pattern"),
            })
            .collect()
    })
}

/// Replace every PHI match in `text` with its category marker.
pub fn redact_text(text: &str) -> String {
    let mut redacted = text.to_owned();
    for category in phi_categories() {
        redacted = category
            .regex
            .replace_all(&redacted, category.marker())
            .into_owned();
    }
    redacted
}

/// Recursively redact PHI from every string inside a JSON value.
///
/// Object keys are left alone; only values are rewritten.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_text(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ssn_redaction() {
        let redacted = redact_text("Patient SSN: 123-45-6789");
        assert!(!redacted.contains("123-45-6789"));
        assert!(redacted.contains("[REDACTED_SSN]"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = redact_text("Call 555-123-4567 tomorrow");
        assert!(!redacted.contains("555-123-4567"));
        assert!(redacted.contains("[REDACTED_PHONE]"));
    }

    #[test]
    fn test_email_redaction() {
        let redacted = redact_text("Contact jane.doe@example.com");
        assert!(!redacted.contains("jane.doe@example.com"));
        assert!(redacted.contains("[REDACTED_EMAIL]"));
    }

    #[test]
    fn test_mrn_redaction() {
        let redacted = redact_text("Record MRN: 8675309 on file");
        assert!(!redacted.contains("8675309"));
        assert!(redacted.contains("[REDACTED_MRN]"));
    }

    #[test]
    fn test_date_of_birth_redaction() {
        let redacted = redact_text("DOB 12/31/1984");
        assert!(!redacted.contains("12/31/1984"));
        assert!(redacted.contains("[REDACTED_DATE_OF_BIRTH]"));
    }

    #[test]
    fn test_distinct_markers_per_category() {
        let redacted = redact_text("SSN 123-45-6789, Phone: 555-123-4567");
        assert!(redacted.contains("[REDACTED_SSN]"));
        assert!(redacted.contains("[REDACTED_PHONE]"));
    }

    #[test]
    fn test_clean_text_untouched() {
        let text = "The patient reported mild symptoms.";
        assert_eq!(redact_text(text), text);
    }

    #[test]
    fn test_recursive_value_redaction() {
        let value = json!({
            "query": "SSN is 123-45-6789",
            "nested": {"contact": "jane@example.com"},
            "list": ["call 555-123-4567", 42],
            "count": 7
        });

        let redacted = redact_value(&value);
        let text = redacted.to_string();
        assert!(!text.contains("123-45-6789"));
        assert!(!text.contains("jane@example.com"));
        assert!(!text.contains("555-123-4567"));
        assert!(text.contains("[REDACTED_SSN]"));
        assert_eq!(redacted["count"], json!(7));
    }
}
