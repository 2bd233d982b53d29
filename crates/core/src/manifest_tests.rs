// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::subscriptions;
use yare::parameterized;

#[test]
fn manifest_key_display() {
    let key = ManifestKey::new("cooking", "1.2.0");
    assert_eq!(key.to_string(), "cooking:1.2.0");
}

#[test]
fn manifest_key_from_manifest() {
    let manifest = AgentManifest::builder().agent_id("cooking").version("2.0.0").build();
    assert_eq!(manifest.key(), ManifestKey::new("cooking", "2.0.0"));
}

#[parameterized(
    active = { ManifestStatus::Active, true },
    deprecated = { ManifestStatus::Deprecated, false },
    archived = { ManifestStatus::Archived, false },
)]
fn only_active_manifests_are_active(status: ManifestStatus, expected: bool) {
    let manifest = AgentManifest::builder().status(status).build();
    assert_eq!(manifest.is_active(), expected);
}

#[test]
fn subscribes_to_checks_declared_events() {
    let manifest = AgentManifest::builder()
        .subscribed_events(subscriptions(&["health_goal_updated", "meal_logged"]))
        .build();

    assert!(manifest.subscribes_to("health_goal_updated"));
    assert!(!manifest.subscribes_to("meal_plan_created"));
}

#[test]
fn permissions_default_to_denied() {
    let perms = Permissions::default();
    assert!(!perms.read_shared_context);
    assert!(!perms.write_shared_context);
}

#[test]
fn manifest_serde_round_trip() {
    let manifest = AgentManifest::builder()
        .agent_id("reminder")
        .subscribed_events(subscriptions(&["meal_plan_created"]))
        .permissions(Permissions { read_shared_context: true, write_shared_context: false })
        .build();

    let json = serde_json::to_string(&manifest).unwrap();
    let parsed: AgentManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, manifest);
}

#[test]
fn manifest_deserializes_with_defaults() {
    // Minimal manifest document: optional collections default to empty.
    let parsed: AgentManifest = serde_json::from_str(
        r#"{"agent_id": "x", "version": "1.0.0", "name": "X", "status": "active"}"#,
    )
    .unwrap();

    assert!(parsed.subscribed_events.is_empty());
    assert!(parsed.tools.is_empty());
    assert!(!parsed.permissions.write_shared_context);
}
