// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user dispatch serialization.
//!
//! Two concurrent dispatches for the same user would race on shared
//! context and the recent-events snapshot; a keyed async mutex serializes
//! them while letting different users proceed in parallel. The lock is
//! held for the whole cascade, which spans multiple store commits.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use troupe_core::UserId;

/// Keyed async mutexes, one per user.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex for one user, created on first use.
    pub fn for_user(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.locks.lock().entry(user_id.to_string()).or_default())
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
