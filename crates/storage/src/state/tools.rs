// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool execution and approval change handlers.

use super::CoreState;
use crate::change::StateChange;

pub(crate) fn apply(state: &mut CoreState, change: &StateChange) {
    match change {
        StateChange::ToolExecutionCreated { execution } => {
            if !state.tool_executions.contains_key(execution.id.as_str()) {
                state.tool_executions.insert(execution.id.to_string(), execution.clone());
            }
        }

        StateChange::ToolExecutionTransitioned {
            execution_id,
            status,
            result,
            error,
            updated_at_ms,
        } => {
            if let Some(execution) = state.tool_executions.get_mut(execution_id) {
                // Guard: only legal state-machine edges apply; replaying a
                // transition a second time finds `from == to` and skips.
                if execution.status.can_transition_to(*status) {
                    execution.status = *status;
                    execution.result.clone_from(result);
                    execution.error.clone_from(error);
                    execution.updated_at_ms = *updated_at_ms;
                }
            }
        }

        StateChange::ApprovalRecorded { approval } => {
            // At most one approval per execution.
            state
                .approvals
                .entry(approval.execution_id.to_string())
                .or_insert_with(|| approval.clone());
        }

        _ => {}
    }
}
