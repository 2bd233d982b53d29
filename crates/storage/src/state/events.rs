// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-log and trace change handlers.

use super::CoreState;
use crate::change::StateChange;

pub(crate) fn apply(state: &mut CoreState, change: &StateChange) {
    match change {
        StateChange::EventAppended { event } => {
            let log = state.events.entry(event.user_id.to_string()).or_default();
            // Events are immutable and append-only: replay never re-appends.
            if !log.iter().any(|e| e.id == event.id) {
                log.push(event.clone());
            }
        }

        StateChange::TraceRecorded { trace } => {
            if !state.traces.contains_key(trace.id.as_str()) {
                state.traces.insert(trace.id.to_string(), trace.clone());
            }
        }

        StateChange::TraceFinalized { trace_id, status, error, annotations, finished_at_ms } => {
            if let Some(trace) = state.traces.get_mut(trace_id) {
                // Guard: a finalized trace stays finalized.
                if !trace.status.is_terminal() {
                    trace.status = *status;
                    trace.error.clone_from(error);
                    trace.annotations.clone_from(annotations);
                    trace.finished_at_ms = Some(*finished_at_ms);
                }
            }
        }

        _ => {}
    }
}
