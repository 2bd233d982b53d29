// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schemaless JSON-shaped mappings and the normative merge semantics.
//!
//! Payloads, shared context, and agent memory are all opaque
//! string-to-JSON mappings. The core never introspects their structure;
//! the only operation it defines over them is [`shallow_merge`].

/// Mapping from string keys to arbitrary JSON values.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Shallow merge: for each key in `patch`, replace the value at that key.
///
/// Keys absent from the patch are preserved. Nested mappings are
/// overwritten as atomic values, never merged recursively. Agents that
/// need a deep merge must express it as a whole-subtree replacement.
pub fn shallow_merge(target: &mut JsonMap, patch: JsonMap) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
