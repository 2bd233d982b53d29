// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Projection cache: a best-effort, invalidatable view of hot store data.
//!
//! The store is authoritative. A miss (or any cache failure) falls
//! through to the store; writers invalidate the relevant keys before
//! returning. Key space mirrors the wire collaborator:
//! `manifest:{agent_id}:{version}` (TTL 1h), `installations:{user_id}`
//! (TTL 5m), `shared_context:{user_id}` (TTL 5m).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use troupe_core::{AgentInstallation, AgentManifest, Clock, JsonMap, ManifestKey, UserId};

pub const MANIFEST_TTL: Duration = Duration::from_secs(3600);
pub const INSTALLATIONS_TTL: Duration = Duration::from_secs(300);
pub const SHARED_CONTEXT_TTL: Duration = Duration::from_secs(300);

/// Time-bounded projection of manifests, installations, and shared
/// context. A Redis-backed implementation would be wired the same way.
#[async_trait]
pub trait ProjectionCache: Send + Sync {
    async fn get_manifest(&self, key: &ManifestKey) -> Option<AgentManifest>;
    async fn put_manifest(&self, manifest: &AgentManifest);

    async fn get_installations(&self, user_id: &UserId) -> Option<Vec<AgentInstallation>>;
    async fn put_installations(&self, user_id: &UserId, installations: &[AgentInstallation]);

    async fn get_shared_context(&self, user_id: &UserId) -> Option<JsonMap>;
    async fn put_shared_context(&self, user_id: &UserId, context: &JsonMap);

    async fn invalidate_user_installations(&self, user_id: &UserId);
    async fn invalidate_shared_context(&self, user_id: &UserId);
}

fn manifest_key(key: &ManifestKey) -> String {
    format!("manifest:{}:{}", key.agent_id, key.version)
}

fn installations_key(user_id: &UserId) -> String {
    format!("installations:{user_id}")
}

fn shared_context_key(user_id: &UserId) -> String {
    format!("shared_context:{user_id}")
}

/// Cache disabled: every read misses, every write is a no-op.
#[derive(Default)]
pub struct NullCache;

#[async_trait]
impl ProjectionCache for NullCache {
    async fn get_manifest(&self, _key: &ManifestKey) -> Option<AgentManifest> {
        None
    }
    async fn put_manifest(&self, _manifest: &AgentManifest) {}

    async fn get_installations(&self, _user_id: &UserId) -> Option<Vec<AgentInstallation>> {
        None
    }
    async fn put_installations(&self, _user_id: &UserId, _installations: &[AgentInstallation]) {}

    async fn get_shared_context(&self, _user_id: &UserId) -> Option<JsonMap> {
        None
    }
    async fn put_shared_context(&self, _user_id: &UserId, _context: &JsonMap) {}

    async fn invalidate_user_installations(&self, _user_id: &UserId) {}
    async fn invalidate_shared_context(&self, _user_id: &UserId) {}
}

/// In-process TTL cache over a flat key space of JSON values.
pub struct MemoryCache<C: Clock> {
    entries: Mutex<HashMap<String, (serde_json::Value, Instant)>>,
    clock: C,
}

impl<C: Clock> MemoryCache<C> {
    pub fn new(clock: C) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    fn put_value<T: serde::Serialize>(&self, key: String, value: &T, ttl: Duration) {
        let encoded = match serde_json::to_value(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache encode failed, skipping");
                return;
            }
        };
        self.entries.lock().insert(key, (encoded, self.clock.now() + ttl));
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        let (value, deadline) = entries.get(key).cloned()?;
        if self.clock.now() >= deadline {
            entries.remove(key);
            return None;
        }
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                tracing::warn!(%key, error = %err, "cache decode failed, dropping entry");
                entries.remove(key);
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[async_trait]
impl<C: Clock + 'static> ProjectionCache for MemoryCache<C> {
    async fn get_manifest(&self, key: &ManifestKey) -> Option<AgentManifest> {
        self.get_value(&manifest_key(key))
    }

    async fn put_manifest(&self, manifest: &AgentManifest) {
        self.put_value(manifest_key(&manifest.key()), manifest, MANIFEST_TTL);
    }

    async fn get_installations(&self, user_id: &UserId) -> Option<Vec<AgentInstallation>> {
        self.get_value(&installations_key(user_id))
    }

    async fn put_installations(&self, user_id: &UserId, installations: &[AgentInstallation]) {
        self.put_value(installations_key(user_id), &installations, INSTALLATIONS_TTL);
    }

    async fn get_shared_context(&self, user_id: &UserId) -> Option<JsonMap> {
        self.get_value(&shared_context_key(user_id))
    }

    async fn put_shared_context(&self, user_id: &UserId, context: &JsonMap) {
        self.put_value(shared_context_key(user_id), context, SHARED_CONTEXT_TTL);
    }

    async fn invalidate_user_installations(&self, user_id: &UserId) {
        self.remove(&installations_key(user_id));
    }

    async fn invalidate_shared_context(&self, user_id: &UserId) {
        self.remove(&shared_context_key(user_id));
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
