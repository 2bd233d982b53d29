//! Installation specs: catalog listing and the at-most-once constraint.

use crate::prelude::*;
use serde_json::json;
use troupe_core::test_support::{manifest_for, payload, subscriptions, ScriptedAgent};
use troupe_core::{AgentManifest, JsonMap, ManifestStatus};
use troupe_engine::EngineError;

#[tokio::test]
async fn marketplace_lists_only_active_manifests() {
    let h = harness();
    h.orch.register_manifest(manifest_for("cooking", &[])).unwrap();
    let mut archived = manifest_for("legacy", &[]);
    archived.status = ManifestStatus::Archived;
    h.orch.register_manifest(archived).unwrap();

    let listed = h.orch.list_agents();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].agent_id, "cooking");

    assert!(h.orch.get_agent(&h.agent("cooking"), "1.0.0").is_ok());
    assert!(matches!(
        h.orch.get_agent(&h.agent("legacy"), "1.0.0"),
        Err(EngineError::ManifestNotFound(_))
    ));
}

#[tokio::test]
async fn installing_twice_yields_exactly_one_installation() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("health_goal", &[]))
            .onboard_memory(payload(json!({"target_weight": 70}))),
    )
    .await;

    let err = h
        .orch
        .install_agent(&h.user, &h.agent("health_goal"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::AlreadyInstalled { .. }));
    assert_eq!(h.orch.list_user_agents(&h.user).len(), 1);
}

#[tokio::test]
async fn onboarding_seeds_agent_memory() {
    let h = harness();
    let manifest = AgentManifest::builder()
        .agent_id("fitness")
        .subscribed_events(subscriptions(&["workout_logged"]))
        .build();
    let installation = h
        .install(
            ScriptedAgent::new(manifest).onboard_memory(payload(json!({"sessions": 0}))),
        )
        .await;

    let memory = h.orch.store().read_agent_memory(&installation.id);
    assert_eq!(memory.get("sessions"), Some(&json!(0)));
}
