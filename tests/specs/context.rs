//! Context specs: partial failure, permission gating, snapshots, merge.

use crate::prelude::*;
use serde_json::json;
use troupe_core::test_support::{manifest_for, payload, subscriptions, ScriptedAgent};
use troupe_core::{AgentManifest, JsonMap, Permissions, TraceStatus};

/// Partial failure: A raises, B succeeds on the same event. B's updates
/// commit, A's do not, both traces are terminal.
#[tokio::test]
async fn partial_failure_isolation() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("a", &["e"]))
            .writes_shared(payload(json!({"from_a": true})))
            .fail_handling("a blew up"),
    )
    .await;
    h.install(
        ScriptedAgent::new(manifest_for("b", &["e"])).writes_shared(payload(json!({"k": "v"}))),
    )
    .await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let shared = h.orch.read_shared_context(&h.user).await.unwrap();
    assert_eq!(shared.get("k"), Some(&json!("v")));
    assert!(shared.get("from_a").is_none());

    let traces = h.orch.list_event_traces(&event.id);
    let a = traces.iter().find(|t| t.agent_id == "a").unwrap();
    assert_eq!(a.status, TraceStatus::Failed);
    assert_eq!(a.error.as_deref(), Some("a blew up"));
    let b = traces.iter().find(|t| t.agent_id == "b").unwrap();
    assert_eq!(b.status, TraceStatus::Completed);
}

/// Permission denial: without `write_shared_context` the update is
/// dropped, the trace completes, and a warning annotation is recorded.
#[tokio::test]
async fn permission_denied_write_is_dropped_but_traced() {
    let h = harness();
    let manifest = AgentManifest::builder()
        .agent_id("z")
        .subscribed_events(subscriptions(&["e"]))
        .permissions(Permissions { read_shared_context: true, write_shared_context: false })
        .build();
    h.install(ScriptedAgent::new(manifest).writes_shared(payload(json!({"a": 1})))).await;

    let event = h.orch.create_event(&h.user, "e", JsonMap::new()).await.unwrap();

    let shared = h.orch.read_shared_context(&h.user).await.unwrap();
    assert!(shared.is_empty());

    let traces = h.orch.list_event_traces(&event.id);
    assert_eq!(traces[0].status, TraceStatus::Completed);
    assert!(!traces[0].annotations.is_empty());
}

/// The recent-events snapshot handed to an agent includes the event being
/// dispatched as its most recent element.
#[tokio::test]
async fn recent_events_include_the_current_event_first() {
    let h = harness();
    let agent = ScriptedAgent::new(manifest_for("watcher", &["observed"]));
    let seen = agent.seen();
    h.install(agent).await;

    for n in 0..3 {
        h.orch
            .create_event(&h.user, "background", payload(json!({"n": n})))
            .await
            .unwrap();
    }
    h.orch.create_event(&h.user, "observed", JsonMap::new()).await.unwrap();

    let seen = seen.lock();
    let recent = &seen[0].context.recent_events;
    assert_eq!(recent.len(), 4);
    assert_eq!(recent[0].event_type, "observed");
    assert!(recent[1..].iter().all(|e| e.event_type == "background"));
}

/// Shared-context merges are shallow: top-level keys overwrite, nested
/// mappings replace wholesale.
#[tokio::test]
async fn shared_context_merge_is_shallow_across_dispatches() {
    let h = harness();
    h.install(
        ScriptedAgent::new(manifest_for("seed", &["seed"]))
            .writes_shared(payload(json!({"keep": 1, "prefs": {"diet": "vegan", "units": "kg"}}))),
    )
    .await;
    h.install(
        ScriptedAgent::new(manifest_for("patch", &["patch"]))
            .writes_shared(payload(json!({"prefs": {"diet": "keto"}}))),
    )
    .await;

    h.orch.create_event(&h.user, "seed", JsonMap::new()).await.unwrap();
    h.orch.create_event(&h.user, "patch", JsonMap::new()).await.unwrap();

    let shared = h.orch.read_shared_context(&h.user).await.unwrap();
    assert_eq!(shared.get("keep"), Some(&json!(1)));
    // No deep merge: "units" disappeared with the replaced subtree.
    assert_eq!(shared.get("prefs"), Some(&json!({"diet": "keto"})));
}
