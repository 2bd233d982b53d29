// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_contract() {
    let config = EngineConfig::default();
    assert_eq!(config.max_event_depth, 10);
    assert_eq!(config.agent_handler_timeout, Duration::from_secs(30));
    assert_eq!(config.recent_events_limit, 10);
    assert!(config.cache_url.is_none());
}

#[test]
fn empty_toml_yields_defaults() {
    let config = EngineConfig::from_toml("").unwrap();
    assert_eq!(config.max_event_depth, 10);
}

#[test]
fn toml_overrides_selected_keys() {
    let config = EngineConfig::from_toml(
        r#"
        state_dir = "/var/lib/troupe"
        cache_url = "redis://localhost:6379/0"
        max_event_depth = 4
        agent_handler_timeout = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.state_dir, PathBuf::from("/var/lib/troupe"));
    assert_eq!(config.cache_url.as_deref(), Some("redis://localhost:6379/0"));
    assert_eq!(config.max_event_depth, 4);
    assert_eq!(config.agent_handler_timeout, Duration::from_secs(5));
    // Untouched keys keep their defaults.
    assert_eq!(config.recent_events_limit, 10);
}
