// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::payload;
use serde_json::json;

fn record(source: Option<&str>) -> EventRecord {
    EventRecord {
        id: EventId::from_string("evt-1"),
        user_id: UserId::new("user-1"),
        event_type: "health_goal_updated".into(),
        source_agent: source.map(AgentId::new),
        payload: payload(json!({"target_weight": 70})),
        created_at_ms: 1_000_000,
    }
}

#[test]
fn external_events_have_no_source() {
    assert!(record(None).is_external());
    assert!(!record(Some("health_goal")).is_external());
}

#[test]
fn serde_round_trip_preserves_all_fields() {
    let event = record(Some("health_goal"));
    let json = serde_json::to_string(&event).unwrap();
    let parsed: EventRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn external_source_is_omitted_from_json() {
    let json = serde_json::to_value(record(None)).unwrap();
    assert!(json.get("source_agent").is_none());
}
