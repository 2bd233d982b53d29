// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain events: immutable, user-scoped, append-only.
//!
//! Events are facts. Once committed, a record never changes; the
//! orchestrator derives all agent activity from them.

use crate::json::JsonMap;
use crate::manifest::AgentId;
use crate::user::UserId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a committed event.
    pub struct EventId("evt-");
}

/// An immutable event in a user's log.
///
/// `source_agent` is `None` for externally-originated events and carries
/// the emitting agent's id for cascaded events. The id and timestamp are
/// assigned by the store at append time and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub user_id: UserId,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<AgentId>,
    #[serde(default)]
    pub payload: JsonMap,
    pub created_at_ms: u64,
}

impl EventRecord {
    /// True for events submitted by an external caller rather than an agent.
    pub fn is_external(&self) -> bool {
        self.source_agent.is_none()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
