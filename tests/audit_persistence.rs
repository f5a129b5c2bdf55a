//! Audit Persistence Integration Tests
//!
//! Tests for the JSONL audit file format, durability across reopen, and
//! provenance chains surviving a restart.

use std::collections::HashMap;
use std::sync::Arc;

use medroute::core::{AuditQuery, AuditSink, AuditTrail, ExplainTarget, JsonlAuditSink};
use medroute::domain::{AgentAction, AuditEvent, AuditEventType};
use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

fn call_event(session_id: Uuid, agent: &str, user: &str) -> AuditEvent {
    AuditEvent::new(
        AuditEventType::AgentCall,
        agent,
        user,
        session_id,
        json!({"query": "when is my appointment"}),
        json!("Thursday at nine"),
    )
    .with_metadata(HashMap::from([("action".to_string(), json!("execute"))]))
}

#[tokio::test]
async fn test_event_jsonl_format() {
    let temp = TempDir::new().unwrap();
    let sink = JsonlAuditSink::open(temp.path()).await.unwrap();

    let session = Uuid::new_v4();
    sink.append(&call_event(session, "knowledge", "user-1"))
        .await
        .unwrap();

    // One complete JSON document per line.
    let raw = tokio::fs::read_to_string(sink.events_path()).await.unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 1);

    let parsed: AuditEvent = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(parsed.event_type, AuditEventType::AgentCall);
    assert_eq!(parsed.agent_name, "knowledge");
    assert_eq!(parsed.session_id, session);
    assert!(parsed.timestamp.to_rfc3339().contains('T'));
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let session = Uuid::new_v4();

    {
        let sink = JsonlAuditSink::open(temp.path()).await.unwrap();
        sink.append(&call_event(session, "router", "user-1"))
            .await
            .unwrap();
        sink.append(&call_event(session, "knowledge", "user-1"))
            .await
            .unwrap();
    }

    let sink = JsonlAuditSink::open(temp.path()).await.unwrap();
    let events = sink.load().await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].agent_name, "router");
    assert_eq!(events[1].agent_name, "knowledge");
}

#[tokio::test]
async fn test_trail_query_over_file_sink() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(JsonlAuditSink::open(temp.path()).await.unwrap());
    let trail = AuditTrail::new(sink);

    let session = Uuid::new_v4();
    trail.log_event(call_event(session, "knowledge", "alice")).await;
    trail.log_event(call_event(session, "payment", "bob")).await;
    trail
        .log_event(call_event(Uuid::new_v4(), "knowledge", "alice"))
        .await;

    let for_alice = trail
        .query(&AuditQuery {
            user_id: Some("alice".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_alice.len(), 2);

    let for_session = trail
        .query(&AuditQuery {
            session_id: Some(session),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_session.len(), 2);
}

#[tokio::test]
async fn test_phi_never_reaches_disk() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(JsonlAuditSink::open(temp.path()).await.unwrap());
    let events_path = sink.events_path().to_path_buf();
    let trail = AuditTrail::new(sink);

    let event = AuditEvent::new(
        AuditEventType::AgentCall,
        "knowledge",
        "user-1",
        Uuid::new_v4(),
        json!({"query": "my SSN is 123-45-6789, call me at 555-123-4567"}),
        json!("noted"),
    );
    trail.log_event(event).await;

    let raw = tokio::fs::read_to_string(&events_path).await.unwrap();
    assert!(!raw.contains("123-45-6789"));
    assert!(!raw.contains("555-123-4567"));
    assert!(raw.contains("[REDACTED_SSN]"));
    assert!(raw.contains("[REDACTED_PHONE]"));
}

#[tokio::test]
async fn test_chain_explainable_after_restart() {
    let temp = TempDir::new().unwrap();

    let chain_id = {
        let sink = Arc::new(JsonlAuditSink::open(temp.path()).await.unwrap());
        let trail = AuditTrail::new(sink);

        let actions = vec![
            AgentAction {
                agent_name: "router".to_string(),
                action: "classify_intent".to_string(),
                timestamp: Utc::now(),
                input: Some(json!({"query": "refill my prescription"})),
                output: Some(json!({"target": "prescription"})),
                dependencies: vec![],
            },
            AgentAction {
                agent_name: "prescription".to_string(),
                action: "check_refill".to_string(),
                timestamp: Utc::now(),
                input: Some(json!({"rx": "R-1009"})),
                output: Some(json!("eligible")),
                dependencies: vec![1],
            },
        ];
        trail.build_provenance_chain(&actions).await.chain_id
    };

    // A fresh trail over the same directory can still explain the chain.
    let sink = Arc::new(JsonlAuditSink::open(temp.path()).await.unwrap());
    let trail = AuditTrail::new(sink);

    let timeline = trail.explain(ExplainTarget::Chain(chain_id)).await.unwrap();
    assert_eq!(timeline.subject, chain_id.to_string());
    assert_eq!(timeline.entries.len(), 2);
    assert_eq!(timeline.entries[0].agent, "router");
    assert_eq!(timeline.entries[1].agent, "prescription");

    // Hashes only, never the payloads.
    let raw = serde_json::to_string(&timeline).unwrap();
    assert!(!raw.contains("refill my prescription"));
}

#[tokio::test]
async fn test_explain_unknown_chain_fails() {
    let temp = TempDir::new().unwrap();
    let sink = Arc::new(JsonlAuditSink::open(temp.path()).await.unwrap());
    let trail = AuditTrail::new(sink);

    let result = trail.explain(ExplainTarget::Chain(Uuid::new_v4())).await;
    assert!(result.is_err());
}
