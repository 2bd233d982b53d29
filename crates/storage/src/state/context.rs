// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User and shared-context change handlers.

use super::types::UserRecord;
use super::CoreState;
use crate::change::StateChange;
use troupe_core::shallow_merge;

pub(crate) fn apply(state: &mut CoreState, change: &StateChange) {
    match change {
        StateChange::UserCreated { user_id, profile, created_at_ms } => {
            // Guard: replay must not clobber a profile written earlier.
            if !state.users.contains_key(user_id) {
                state.users.insert(
                    user_id.clone(),
                    UserRecord {
                        profile: profile.clone(),
                        shared_context: Default::default(),
                        created_at_ms: *created_at_ms,
                    },
                );
            }
        }

        StateChange::SharedContextMerged { user_id, patch } => {
            if let Some(user) = state.users.get_mut(user_id) {
                shallow_merge(&mut user.shared_context, patch.clone());
            }
        }

        _ => {}
    }
}
