//! Integration tests for config directory lookup and `Config::load`.
//!
//! Run with: cargo test --test config_test
//!
//! Everything touching the process environment lives in a single test so
//! nothing else in this binary races on the variables.

use pushover_client::{Config, ConfigError};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const VARS: [&str; 4] = [
    "PUSHOVER_CONFIG_DIR",
    "PUSHOVER_KEYS",
    "PUSHOVER_ENDPOINT",
    "PUSHOVER_TIMEOUT",
];

/// Clears the pushover env vars on creation and again on drop.
struct EnvGuard;

impl EnvGuard {
    fn new() -> Self {
        for key in VARS {
            env::remove_var(key);
        }
        Self
    }

    fn set(&self, key: &str, value: impl AsRef<std::ffi::OsStr>) {
        env::set_var(key, value);
    }

    fn unset(&self, key: &str) {
        env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in VARS {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_load_from_config_dir() {
    let guard = EnvGuard::new();
    let temp_dir = TempDir::new().expect("temp dir");
    guard.set("PUSHOVER_CONFIG_DIR", temp_dir.path());

    // Directory override
    assert_eq!(
        Config::config_dir().expect("config dir"),
        temp_dir.path().to_path_buf()
    );

    // No config file: defaults, keys.json inside the directory
    let config = Config::load().expect("load without file");
    assert_eq!(config, Config::default());
    assert_eq!(
        config.keys_path().expect("keys path"),
        temp_dir.path().join("keys.json")
    );

    // Values from config.json
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"endpoint": "http://localhost:9000/send", "timeout_secs": 30, "keys_path": "/etc/pushover.json"}"#,
    )
    .expect("write config");
    let config = Config::load().expect("load with file");
    assert_eq!(config.endpoint, "http://localhost:9000/send");
    assert_eq!(config.timeout(), Duration::from_secs(30));
    assert_eq!(
        config.keys_path().expect("keys path"),
        PathBuf::from("/etc/pushover.json")
    );

    // Environment wins over the file
    guard.set("PUSHOVER_TIMEOUT", "0");
    guard.set("PUSHOVER_ENDPOINT", "http://localhost:9001/send");
    let config = Config::load().expect("load with env");
    assert_eq!(config.timeout(), Duration::ZERO);
    assert_eq!(config.endpoint, "http://localhost:9001/send");
    guard.unset("PUSHOVER_TIMEOUT");
    guard.unset("PUSHOVER_ENDPOINT");

    // Malformed file
    fs::write(&config_path, r#"{"timeout_secs": "soon""#).expect("write bad config");
    match Config::load() {
        Err(ConfigError::Parse { path, .. }) => assert_eq!(path, config_path),
        other => panic!("expected parse error, got {other:?}"),
    }
}
