//! Cascade specs: multi-agent chains, self-loop prevention, depth bound.

use crate::prelude::*;
use serde_json::json;
use troupe_core::test_support::{manifest_for, payload, subscriptions, ScriptedAgent};
use troupe_core::{JsonMap, ToolExecutionStatus, TraceStatus};

/// Cascade of three: an external `health_goal_updated` flows through
/// Cooking (emits `meal_plan_created`, requests `create_meal_plan`) into
/// Reminder (emits `reminder_scheduled`, requests `send_notification`).
#[tokio::test]
async fn cascade_of_three() {
    let h = harness();
    h.define_tool("create_meal_plan", troupe_core::ApprovalMode::Always);
    h.define_tool("send_notification", troupe_core::ApprovalMode::Always);

    h.install(ScriptedAgent::new(manifest_for("health_goal", &["goal_intake"]))).await;

    let mut cooking = manifest_for("cooking", &["health_goal_updated"]);
    cooking.tools = subscriptions(&["create_meal_plan"]);
    h.install(
        ScriptedAgent::new(cooking)
            .emits("meal_plan_created", payload(json!({"meals": 21})))
            .requests_tool("create_meal_plan", payload(json!({"target_weight": 70}))),
    )
    .await;

    let mut reminder = manifest_for("reminder", &["meal_plan_created"]);
    reminder.tools = subscriptions(&["send_notification"]);
    h.install(
        ScriptedAgent::new(reminder)
            .emits("reminder_scheduled", JsonMap::new())
            .requests_tool("send_notification", payload(json!({"message": "meal plan ready"}))),
    )
    .await;

    h.orch
        .create_event(&h.user, "health_goal_updated", payload(json!({"target_weight": 70})))
        .await
        .unwrap();

    // Three events persisted, in causal order.
    let events = h.events_oldest_first();
    let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(types, ["health_goal_updated", "meal_plan_created", "reminder_scheduled"]);
    assert_eq!(events[0].source_agent, None);
    assert_eq!(events[1].source_agent, Some(h.agent("cooking")));
    assert_eq!(events[2].source_agent, Some(h.agent("reminder")));

    // Two completed traces: Cooking on the parent, Reminder on the cascade.
    let cooking_traces = h.orch.list_event_traces(&events[0].id);
    assert_eq!(cooking_traces.len(), 1);
    assert_eq!(cooking_traces[0].agent_id, "cooking");
    assert_eq!(cooking_traces[0].status, TraceStatus::Completed);
    let reminder_traces = h.orch.list_event_traces(&events[1].id);
    assert_eq!(reminder_traces.len(), 1);
    assert_eq!(reminder_traces[0].agent_id, "reminder");
    assert_eq!(reminder_traces[0].status, TraceStatus::Completed);

    // Two tool executions queued behind the approval gate.
    let pending = h.orch.list_pending_tools(&h.user);
    let tools: Vec<_> = pending.iter().map(|e| e.tool_id.as_str()).collect();
    assert_eq!(tools, ["create_meal_plan", "send_notification"]);
    assert!(pending.iter().all(|e| e.status == ToolExecutionStatus::Pending));
}

/// Self-loop prevention: an agent subscribed to the event type it emits
/// runs once; its own emission is persisted but skips it.
#[tokio::test]
async fn self_loop_prevention() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("echo", &["ping"])).emits("ping", JsonMap::new());
    let seen = agent.seen();
    h.install(agent).await;

    h.orch.create_event(&h.user, "ping", JsonMap::new()).await.unwrap();

    assert_eq!(seen.lock().len(), 1);

    let events = h.events_oldest_first();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].source_agent, Some(h.agent("echo")));
    // The cascaded event produced no trace for its source.
    assert!(h.orch.list_event_traces(&events[1].id).is_empty());
}

/// Depth bound: a two-agent cycle produces exactly `max_event_depth`
/// events and traces; the next recursive dispatch fails with
/// DepthExceeded and everything already persisted stays persisted.
#[tokio::test]
async fn depth_bound_terminates_the_cycle() {
    let h = harness();
    h.install(ScriptedAgent::new(manifest_for("ping", &["tick"])).emits("tock", JsonMap::new()))
        .await;
    h.install(ScriptedAgent::new(manifest_for("pong", &["tock"])).emits("tick", JsonMap::new()))
        .await;

    h.orch.create_event(&h.user, "tick", JsonMap::new()).await.unwrap();

    let events = h.events_oldest_first();
    assert_eq!(events.len(), 10);

    let total_traces: usize =
        events.iter().map(|e| h.orch.list_event_traces(&e.id).len()).sum();
    assert_eq!(total_traces, 10);

    // The chain alternates tick/tock all the way down.
    for (n, event) in events.iter().enumerate() {
        let expected = if n % 2 == 0 { "tick" } else { "tock" };
        assert_eq!(event.event_type, expected);
    }
}
