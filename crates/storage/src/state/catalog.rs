// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Catalog change handlers: manifests and tool definitions.

use super::CoreState;
use crate::change::StateChange;

pub(crate) fn apply(state: &mut CoreState, change: &StateChange) {
    match change {
        StateChange::ManifestRegistered { manifest } => {
            // Last registration wins: re-registering a key updates the
            // catalog entry (status flips to deprecated/archived this way).
            state.manifests.insert(manifest.key().to_string(), manifest.clone());
        }

        StateChange::ToolDefined { definition } => {
            state.tool_definitions.insert(definition.tool_id.clone(), definition.clone());
        }

        _ => {}
    }
}
