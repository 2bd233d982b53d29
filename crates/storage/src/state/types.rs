// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage-only record types.

use serde::{Deserialize, Serialize};
use troupe_core::JsonMap;

/// Per-user state of record: profile and collaborative shared context.
///
/// Both are schemaless mappings; the profile is written by external
/// collaborators, the shared context by permitted agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub profile: JsonMap,
    #[serde(default)]
    pub shared_context: JsonMap,
    pub created_at_ms: u64,
}
