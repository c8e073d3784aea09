// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

// Env-var access is process-global, so these tests build configs by hand
// and only exercise the parsers through their fallback behavior.

fn valid_config() -> Config {
    let mut config = Config::from_env();
    config.chat.token = "token".to_string();
    config.database.url = "postgres://localhost/hearth".to_string();
    config.scheduler.digest_hour = 9;
    config.scheduler.digest_minute = 30;
    config
}

#[test]
fn valid_config_passes() {
    valid_config().validate().unwrap();
}

#[test]
fn missing_token_fails() {
    let mut config = valid_config();
    config.chat.token = String::new();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("CHAT_TOKEN"));
}

#[test]
fn missing_database_url_fails() {
    let mut config = valid_config();
    config.database.url = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn digest_slot_bounds() {
    let mut config = valid_config();
    config.scheduler.digest_hour = 24;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.scheduler.digest_minute = 60;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.scheduler.digest_hour = 23;
    config.scheduler.digest_minute = 59;
    config.validate().unwrap();
}

#[test]
fn unparseable_values_fall_back() {
    // Keys that are almost certainly unset resolve to their defaults
    assert_eq!(env_u32("HEARTH_TEST_UNSET_U32", 7), 7);
    assert!(env_bool("HEARTH_TEST_UNSET_BOOL", true));
    assert_eq!(env_secs("HEARTH_TEST_UNSET_SECS", 30), Duration::from_secs(30));
    assert!(env_i64_list("HEARTH_TEST_UNSET_LIST").is_empty());
    assert_eq!(env_str("HEARTH_TEST_UNSET_STR", "fallback"), "fallback");
    assert_eq!(env_opt("HEARTH_TEST_UNSET_OPT"), None);
}

#[test]
fn defaults_are_sane() {
    let config = Config::from_env();
    assert!(config.scheduler.sync_interval >= Duration::from_secs(60));
    assert!(config.presence_store.online_ttl < config.presence_store.away_ttl);
    assert!(config.shutdown_timeout >= Duration::from_secs(1));
    assert!(config.scheduler.max_concurrent >= 1);
}
