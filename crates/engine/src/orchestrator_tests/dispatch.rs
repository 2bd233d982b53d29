// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::EngineError;
use serde_json::json;
use std::time::Duration;
use troupe_core::test_support::{manifest_for, payload, ScriptedAgent};
use troupe_core::{AgentManifest, Permissions, ToolExecutionStatus, TraceStatus};

#[tokio::test]
async fn only_subscribed_installations_get_traces() {
    let h = harness();
    h.install(ScriptedAgent::new(manifest_for("cooking", &["health_goal_updated"]))).await;
    h.install(ScriptedAgent::new(manifest_for("reminder", &["meal_plan_created"]))).await;

    let event = h
        .orch
        .create_event(&h.user, "health_goal_updated", payload(json!({"target_weight": 70})))
        .await
        .unwrap();

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].agent_id, "cooking");
    assert_eq!(traces[0].status, TraceStatus::Completed);
}

#[tokio::test]
async fn source_agent_is_skipped() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("echo", &["ping"]));
    let seen = agent.seen();
    h.install(agent).await;

    // Dispatch as if "echo" itself emitted the event.
    let event = h
        .orch
        .dispatch(&h.user, "ping".into(), JsonMap::new(), Some(h.agent("echo")), 0)
        .await
        .unwrap();

    assert!(seen.lock().is_empty());
    assert!(h.orch.list_event_traces(&event.id).is_empty());
}

#[tokio::test]
async fn agent_failure_is_contained_and_other_agents_proceed() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("flaky", &["e"])).fail_handling("boom"),
    )
    .await;
    h.install(
        ScriptedAgent::new(manifest_for("steady", &["e"]))
            .writes_shared(payload(json!({"k": "v"}))),
    )
    .await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces.len(), 2);
    let flaky = traces.iter().find(|t| t.agent_id == "flaky").unwrap();
    assert_eq!(flaky.status, TraceStatus::Failed);
    assert_eq!(flaky.error.as_deref(), Some("boom"));
    let steady = traces.iter().find(|t| t.agent_id == "steady").unwrap();
    assert_eq!(steady.status, TraceStatus::Completed);

    let (_, shared) = h.orch.store().read_user_context(&h.user).unwrap();
    assert_eq!(shared.get("k"), Some(&json!("v")));
}

#[tokio::test]
async fn panicking_agent_is_contained() {
    let h = harness();
    h.install(ScriptedAgent::new(manifest_for("wild", &["e"])).panics("kaboom")).await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Failed);
    assert!(traces[0].error.as_deref().unwrap().contains("kaboom"));
}

#[tokio::test]
async fn denied_shared_context_write_is_dropped_with_annotation() {
    let h = harness();
    let manifest = AgentManifest::builder()
        .agent_id("readonly")
        .subscribed_events(troupe_core::test_support::subscriptions(&["e"]))
        .permissions(Permissions { read_shared_context: true, write_shared_context: false })
        .build();
    h.install(ScriptedAgent::new(manifest).writes_shared(payload(json!({"a": 1})))).await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let (_, shared) = h.orch.store().read_user_context(&h.user).unwrap();
    assert!(shared.is_empty());

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Completed);
    assert!(traces[0].annotations.iter().any(|a| a.contains("write_shared_context")));
}

#[tokio::test]
async fn agents_see_the_frame_snapshot_not_intermediate_writes() {
    let h = harness();
    let first = ScriptedAgent::new(manifest_for("first", &["e"]))
        .writes_shared(payload(json!({"from_first": true})));
    h.install(first).await;
    let second = ScriptedAgent::new(manifest_for("second", &["e"]));
    let seen = second.seen();
    h.install(second).await;

    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    // Second agent ran after first committed, but its context is the
    // frame-start snapshot.
    let seen = seen.lock();
    assert!(seen[0].context.shared_context.is_empty());

    // The write is durable for the next dispatch.
    let (_, shared) = h.orch.store().read_user_context(&h.user).unwrap();
    assert_eq!(shared.get("from_first"), Some(&json!(true)));
}

#[tokio::test]
async fn recent_events_lead_with_the_current_event() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("watcher", &["second_event"]));
    let seen = agent.seen();
    h.install(agent).await;

    h.orch.create_event(&h.user, "first_event", JsonMap::new()).await.unwrap();
    h.orch.create_event(&h.user, "second_event", JsonMap::new()).await.unwrap();

    let seen = seen.lock();
    let recent = &seen[0].context.recent_events;
    assert_eq!(recent[0].event_type, "second_event");
    assert_eq!(recent[1].event_type, "first_event");
}

#[tokio::test]
async fn memory_updates_are_visible_to_later_dispatches() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("counter", &["e"]))
        .onboard_memory(payload(json!({"seeded": true})))
        .writes_memory(payload(json!({"last_event": "e"})));
    let seen = agent.seen();
    h.install(agent).await;

    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();
    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let seen = seen.lock();
    // First run: onboarding memory only.
    assert!(seen[0].context.agent_memory.get("last_event").is_none());
    // Second run: merged memory, onboarding keys preserved.
    assert_eq!(seen[1].context.agent_memory.get("seeded"), Some(&json!(true)));
    assert_eq!(seen[1].context.agent_memory.get("last_event"), Some(&json!("e")));
}

#[tokio::test]
async fn handler_timeout_fails_the_trace_and_applies_no_effects() {
    let mut config = EngineConfig::default();
    config.agent_handler_timeout = Duration::from_millis(50);
    let h = harness_with(config);
    h.install(
        ScriptedAgent::new(manifest_for("slow", &["e"]))
            .delay(Duration::from_millis(500))
            .writes_shared(payload(json!({"late": true}))),
    )
    .await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Failed);
    assert_eq!(traces[0].error.as_deref(), Some("timeout"));

    let (_, shared) = h.orch.store().read_user_context(&h.user).unwrap();
    assert!(shared.is_empty());
}

#[tokio::test]
async fn tool_requests_are_routed_through_the_gate() {
    let h = harness();
    h.define_tool("send_notification", ApprovalMode::Always);
    let mut manifest = manifest_for("notifier", &["e"]);
    manifest.tools = troupe_core::test_support::subscriptions(&["send_notification"]);
    h.install(
        ScriptedAgent::new(manifest)
            .requests_tool("send_notification", payload(json!({"message": "hi"}))),
    )
    .await;

    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let pending = h.orch.list_pending_tools(&h.user);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tool_id, "send_notification");
    assert_eq!(pending[0].status, ToolExecutionStatus::Pending);
}

#[tokio::test]
async fn tool_requests_outside_the_allowlist_are_dropped() {
    let h = harness();
    h.define_tool("send_notification", ApprovalMode::Always);
    // Manifest declares no tools at all.
    h.install(
        ScriptedAgent::new(manifest_for("sneaky", &["e"]))
            .requests_tool("send_notification", JsonMap::new()),
    )
    .await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    assert!(h.orch.list_pending_tools(&h.user).is_empty());
    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Completed);
    assert!(traces[0].annotations.iter().any(|a| a.contains("allowlist")));
}

#[tokio::test]
async fn unknown_tool_request_is_contained() {
    let h = harness();
    let mut manifest = manifest_for("hopeful", &["e"]);
    manifest.tools = troupe_core::test_support::subscriptions(&["no_such_tool"]);
    h.install(ScriptedAgent::new(manifest).requests_tool("no_such_tool", JsonMap::new())).await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Completed);
    assert!(traces[0].annotations.iter().any(|a| a.contains("no_such_tool")));
}

#[tokio::test]
async fn cancellation_stops_the_frame_and_finalizes_the_trace() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("slow", &["e"])).delay(Duration::from_millis(500)),
    )
    .await;

    let token = h.orch.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));

    // The event is persisted and the interrupted agent has a failed trace.
    let events = h.orch.list_user_events(&h.user, 10);
    assert_eq!(events.len(), 1);
    let traces = h.orch.list_event_traces(&events[0].id);
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].status, TraceStatus::Failed);
    assert_eq!(traces[0].error.as_deref(), Some("cancelled"));
}
