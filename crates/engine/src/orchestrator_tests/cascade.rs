// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use troupe_core::test_support::{manifest_for, payload, ScriptedAgent};
use troupe_core::TraceStatus;

#[tokio::test]
async fn emitted_events_dispatch_after_the_parent_commits() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("planner", &["health_goal_updated"]))
            .emits("meal_plan_created", payload(json!({"meals": 3}))),
    )
    .await;
    let follower = ScriptedAgent::new(manifest_for("reminder", &["meal_plan_created"]));
    let seen = follower.seen();
    h.install(follower).await;

    h.orch
        .create_event(&h.user, "health_goal_updated", payload(json!({"target_weight": 70})))
        .await
        .unwrap();

    // Both events persisted, parent first.
    let events = h.orch.list_user_events(&h.user, 10);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "health_goal_updated");
    assert_eq!(events[0].event_type, "meal_plan_created");
    assert_eq!(events[0].source_agent, Some(h.agent("planner")));

    // The cascading frame observes the parent frame's committed event.
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].event.event_type, "meal_plan_created");
    assert_eq!(seen[0].context.recent_events.len(), 2);
}

#[tokio::test]
async fn cascading_agents_observe_parent_shared_context_writes() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("writer", &["e"]))
            .writes_shared(payload(json!({"written": true})))
            .emits("e_done", JsonMap::new()),
    )
    .await;
    let reader = ScriptedAgent::new(manifest_for("reader", &["e_done"]));
    let seen = reader.seen();
    h.install(reader).await;

    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen[0].context.shared_context.get("written"), Some(&json!(true)));
}

#[tokio::test]
async fn self_emitted_events_do_not_loop() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("echo", &["ping"])).emits("ping", JsonMap::new());
    let seen = agent.seen();
    h.install(agent).await;

    h.orch.create_event(&h.user, "ping", JsonMap::new()).await.unwrap();

    // The agent ran once; its own emission was dispatched but skipped it.
    assert_eq!(seen.lock().len(), 1);
    let events = h.orch.list_user_events(&h.user, 10);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].source_agent, Some(h.agent("echo")));
    assert!(h.orch.list_event_traces(&events[0].id).is_empty());
}

#[tokio::test]
async fn a_two_agent_cycle_stops_at_the_depth_bound() {
    let mut config = EngineConfig::default();
    config.max_event_depth = 4;
    let h = harness_with(config);
    h.install(ScriptedAgent::new(manifest_for("ping", &["tick"])).emits("tock", JsonMap::new()))
        .await;
    h.install(ScriptedAgent::new(manifest_for("pong", &["tock"])).emits("tick", JsonMap::new()))
        .await;

    h.orch.create_event(&h.user, "tick", JsonMap::new()).await.unwrap();

    // Depths 0..3 each persist one event and one trace; the dispatch at
    // depth 4 fails with DepthExceeded and persists nothing.
    let events = h.orch.list_user_events(&h.user, 100);
    assert_eq!(events.len(), 4);

    let trace_count: usize =
        events.iter().map(|e| h.orch.list_event_traces(&e.id).len()).sum();
    assert_eq!(trace_count, 4);

    // Parent events all remain committed despite the deep failure.
    assert!(events
        .iter()
        .all(|e| h.orch.list_event_traces(&e.id).iter().all(|t| t.status == TraceStatus::Completed)));
}

#[tokio::test]
async fn deep_failure_does_not_roll_back_shallow_commits() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("writer", &["e"]))
            .writes_shared(payload(json!({"committed": true})))
            .emits("e_next", JsonMap::new()),
    )
    .await;
    h.install(ScriptedAgent::new(manifest_for("breaker", &["e_next"])).fail_handling("down"))
        .await;

    h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let (_, shared) = h.orch.store().read_user_context(&h.user).unwrap();
    assert_eq!(shared.get("committed"), Some(&json!(true)));

    let events = h.orch.list_user_events(&h.user, 10);
    assert_eq!(events.len(), 2);
}
