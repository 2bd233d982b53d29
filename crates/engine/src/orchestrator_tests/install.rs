// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use serde_json::json;
use troupe_core::test_support::{manifest_for, payload, ScriptedAgent};
use troupe_core::{InstallationStatus, ManifestStatus};

#[tokio::test]
async fn install_persists_installation_and_onboarded_memory() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("cooking", &[]))
        .onboard_memory(payload(json!({"cuisine": "italian"})));

    let installation = h.install(agent).await;

    assert_eq!(installation.status, InstallationStatus::Active);
    assert_eq!(
        h.orch.store().read_agent_memory(&installation.id).get("cuisine"),
        Some(&json!("italian"))
    );
    assert_eq!(h.orch.list_user_agents(&h.user).len(), 1);
}

#[tokio::test]
async fn install_requires_an_active_manifest() {
    let h = harness();
    let mut manifest = manifest_for("cooking", &[]);
    manifest.status = ManifestStatus::Deprecated;
    h.orch.register_manifest(manifest.clone()).unwrap();
    h.orch.register_agent(Arc::new(ScriptedAgent::new(manifest)));

    let err = h
        .orch
        .install_agent(&h.user, &h.agent("cooking"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ManifestNotFound(_)));
}

#[tokio::test]
async fn install_requires_the_user() {
    let h = harness();
    h.orch.register_manifest(manifest_for("cooking", &[])).unwrap();
    h.orch.register_agent(Arc::new(ScriptedAgent::new(manifest_for("cooking", &[]))));

    let err = h
        .orch
        .install_agent(&UserId::new("ghost"), &h.agent("cooking"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserNotFound(_)));
}

#[tokio::test]
async fn second_install_is_rejected() {
    let h = harness();
    h.install(ScriptedAgent::new(manifest_for("cooking", &[]))).await;

    let err = h
        .orch
        .install_agent(&h.user, &h.agent("cooking"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::AlreadyInstalled { .. }));
    assert_eq!(h.orch.list_user_agents(&h.user).len(), 1);
}

#[tokio::test]
async fn unregistered_implementation_is_rejected() {
    let h = harness();
    h.orch.register_manifest(manifest_for("cooking", &[])).unwrap();

    let err = h
        .orch
        .install_agent(&h.user, &h.agent("cooking"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AgentNotRegistered(_)));
}

#[tokio::test]
async fn onboarding_failure_rolls_back_the_installation() {
    let h = harness();
    h.orch.register_manifest(manifest_for("cooking", &[])).unwrap();
    h.orch.register_agent(Arc::new(
        ScriptedAgent::new(manifest_for("cooking", &[])).fail_onboard("missing inputs"),
    ));

    let err = h
        .orch
        .install_agent(&h.user, &h.agent("cooking"), "1.0.0", JsonMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::OnboardingFailed(_)));
    assert!(h.orch.store().find_installation(&h.user, &h.agent("cooking"), "1.0.0").is_none());
    assert!(h.orch.list_user_agents(&h.user).is_empty());
}

#[tokio::test]
async fn install_invalidates_cached_installations() {
    let h = harness();

    // Warm the cache with the pre-install (empty) projection.
    let _ = h.orch.create_event(&h.user, "noop", JsonMap::new()).await.unwrap();

    let agent = ScriptedAgent::new(manifest_for("cooking", &["meal_logged"]));
    let seen = agent.seen();
    h.install(agent).await;

    // A stale cache would still say "no installations" and skip dispatch.
    h.orch.create_event(&h.user, "meal_logged", JsonMap::new()).await.unwrap();
    assert_eq!(seen.lock().len(), 1);
}
