// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation and agent-memory change handlers.

use super::CoreState;
use crate::change::StateChange;
use troupe_core::shallow_merge;

pub(crate) fn apply(state: &mut CoreState, change: &StateChange) {
    match change {
        StateChange::InstallationCreated { installation, memory } => {
            let user_installs =
                state.installations.entry(installation.user_id.to_string()).or_default();
            let id = installation.id.to_string();
            // Guard: an installation is created exactly once.
            if !user_installs.contains_key(&id) {
                user_installs.insert(id.clone(), installation.clone());
                state.memories.insert(id, memory.clone());
            }
        }

        StateChange::AgentMemoryMerged { installation_id, patch } => {
            if let Some(memory) = state.memories.get_mut(installation_id) {
                shallow_merge(memory, patch.clone());
            }
        }

        _ => {}
    }
}
