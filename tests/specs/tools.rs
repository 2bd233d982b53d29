//! Human-approval specs: gating, rejection, idempotence.

use crate::prelude::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use troupe_core::test_support::{manifest_for, payload, subscriptions, RecordingTool, ScriptedAgent};
use troupe_core::{ApprovalDecision, ApprovalMode, JsonMap, ToolExecutionStatus};
use troupe_engine::EngineError;

/// Install a notifier agent wired to a gated `send_notification` tool and
/// dispatch one triggering event. Returns the tool's call log.
async fn gated_fixture(h: &Harness) -> Arc<Mutex<Vec<JsonMap>>> {
    h.define_tool("send_notification", ApprovalMode::Always);
    let tool = RecordingTool::ok(payload(json!({"sent": true})));
    let calls = tool.calls();
    h.orch.register_tool("send_notification", Arc::new(tool));

    let mut manifest = manifest_for("notifier", &["notify"]);
    manifest.tools = subscriptions(&["send_notification"]);
    h.install(
        ScriptedAgent::new(manifest)
            .requests_tool("send_notification", payload(json!({"message": "hi"}))),
    )
    .await;

    h.orch.create_event(&h.user, "notify", JsonMap::new()).await.unwrap();
    calls
}

/// A gated tool stays pending and the implementation is never invoked
/// before approval.
#[tokio::test]
async fn gated_tool_waits_for_a_human() {
    let h = harness();
    let calls = gated_fixture(&h).await;

    let pending = h.orch.list_pending_tools(&h.user);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, ToolExecutionStatus::Pending);
    assert!(calls.lock().is_empty());
}

/// Rejection is terminal: the tool is never invoked and a second decision
/// is an InvalidState error.
#[tokio::test]
async fn rejection_is_terminal() {
    let h = harness();
    let calls = gated_fixture(&h).await;
    let execution_id = h.orch.list_pending_tools(&h.user)[0].id;

    let updated = h
        .orch
        .approve_tool(&h.user, &execution_id, ApprovalDecision::Rejected, Some("too risky".into()))
        .unwrap();
    assert_eq!(updated.status, ToolExecutionStatus::Rejected);
    assert!(calls.lock().is_empty());

    let err = h
        .orch
        .approve_tool(&h.user, &execution_id, ApprovalDecision::Approved, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert!(calls.lock().is_empty());
}

/// Approval drives the execution to completion exactly once.
#[tokio::test]
async fn approval_executes_exactly_once() {
    let h = harness();
    let calls = gated_fixture(&h).await;
    let execution_id = h.orch.list_pending_tools(&h.user)[0].id;

    let updated = h
        .orch
        .approve_tool(&h.user, &execution_id, ApprovalDecision::Approved, None)
        .unwrap();
    assert_eq!(updated.status, ToolExecutionStatus::Completed);
    assert_eq!(updated.result, Some(payload(json!({"sent": true}))));
    assert_eq!(calls.lock().len(), 1);

    // Approving again must not double-execute.
    let err = h
        .orch
        .approve_tool(&h.user, &execution_id, ApprovalDecision::Approved, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(calls.lock().len(), 1);

    assert!(h.orch.list_pending_tools(&h.user).is_empty());
}

/// Ungated tools run synchronously during dispatch and record their
/// outcome without any human in the loop.
#[tokio::test]
async fn ungated_tool_runs_during_dispatch() {
    let h = harness();
    h.define_tool("log_metric", ApprovalMode::Never);
    let tool = RecordingTool::ok(payload(json!({"ok": true})));
    let calls = tool.calls();
    h.orch.register_tool("log_metric", Arc::new(tool));

    let mut manifest = manifest_for("metrics", &["measured"]);
    manifest.tools = subscriptions(&["log_metric"]);
    h.install(ScriptedAgent::new(manifest).requests_tool("log_metric", JsonMap::new())).await;

    h.orch.create_event(&h.user, "measured", JsonMap::new()).await.unwrap();

    assert_eq!(calls.lock().len(), 1);
    assert!(h.orch.list_pending_tools(&h.user).is_empty());
}
