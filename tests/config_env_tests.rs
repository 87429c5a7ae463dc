//! Integration tests for StreamConfig::from_env().
//!
//! Environment variables are process-global, so every test takes a global
//! mutex and restores the variables it touched before releasing it.

use std::env;
use std::sync::Mutex;
use std::time::Duration;

use millstream::config::StreamConfig;
use millstream::error::Error;

/// Global mutex to serialize all env-based tests.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// All environment variables read by StreamConfig::from_env().
const ALL_CONFIG_ENV_VARS: &[&str] = &[
    "MILLSTREAM_STREAM",
    "MILLSTREAM_GROUP",
    "MILLSTREAM_CONSUMER",
    "MILLSTREAM_POLL_TIMEOUT_MS",
];

/// Run `f` with a clean slate of millstream env vars, restoring the
/// original values afterwards.
fn with_clean_env(f: impl FnOnce()) {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(&str, Option<String>)> = ALL_CONFIG_ENV_VARS
        .iter()
        .map(|&name| (name, env::var(name).ok()))
        .collect();
    for name in ALL_CONFIG_ENV_VARS {
        env::remove_var(name);
    }

    f();

    for (name, value) in saved {
        match value {
            Some(v) => env::set_var(name, v),
            None => env::remove_var(name),
        }
    }
}

#[test]
fn test_from_env_defaults_when_nothing_is_set() {
    with_clean_env(|| {
        let config = StreamConfig::from_env().unwrap();
        assert_eq!(config, StreamConfig::default());
    });
}

#[test]
fn test_from_env_applies_overrides() {
    with_clean_env(|| {
        env::set_var("MILLSTREAM_STREAM", "orders");
        env::set_var("MILLSTREAM_GROUP", "billing");
        env::set_var("MILLSTREAM_CONSUMER", "billing-3");
        env::set_var("MILLSTREAM_POLL_TIMEOUT_MS", "250");

        let config = StreamConfig::from_env().unwrap();
        assert_eq!(config.stream, "orders");
        assert_eq!(config.group, "billing");
        assert_eq!(config.consumer, "billing-3");
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
    });
}

#[test]
fn test_from_env_rejects_non_numeric_poll_timeout() {
    with_clean_env(|| {
        env::set_var("MILLSTREAM_POLL_TIMEOUT_MS", "soon");
        let err = StreamConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    });
}

#[test]
fn test_from_env_rejects_zero_poll_timeout() {
    with_clean_env(|| {
        env::set_var("MILLSTREAM_POLL_TIMEOUT_MS", "0");
        let err = StreamConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    });
}

#[test]
fn test_from_env_rejects_empty_names() {
    with_clean_env(|| {
        env::set_var("MILLSTREAM_CONSUMER", "");
        let err = StreamConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    });
}
