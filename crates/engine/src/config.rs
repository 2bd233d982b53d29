// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options consumed by the engine.
///
/// Loadable from TOML; unset keys fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for the store (journal + snapshots).
    pub state_dir: PathBuf,
    /// Optional projection-cache endpoint. Absent ⇒ the store is used
    /// directly.
    pub cache_url: Option<String>,
    /// Cascade bound: dispatches at this depth fail with `DepthExceeded`.
    pub max_event_depth: u32,
    /// Per-invocation agent handler timeout.
    #[serde(with = "duration_secs")]
    pub agent_handler_timeout: Duration,
    /// Size of the recent-events snapshot handed to agents.
    pub recent_events_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("troupe-state"),
            cache_url: None,
            max_event_depth: 10,
            agent_handler_timeout: Duration::from_secs(30),
            recent_events_limit: 10,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, crate::error::EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::error::EngineError::InvalidState(format!("config: {e}")))?;
        Self::from_toml(&text)
            .map_err(|e| crate::error::EngineError::InvalidState(format!("config: {e}")))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
