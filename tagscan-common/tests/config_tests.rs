//! Configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate TAGSCAN_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::io::Write;
use tagscan_common::config::{TagscanConfig, DEFAULT_ASSET_URL_TEMPLATE};

fn clear_env() {
    for name in [
        "TAGSCAN_HOST",
        "TAGSCAN_PORT",
        "TAGSCAN_DATABASE",
        "TAGSCAN_JWT_SECRET",
        "TAGSCAN_VISION_API_KEY",
        "TAGSCAN_VISION_API_BASE",
        "TAGSCAN_VISION_MODEL",
        "TAGSCAN_LOG_LEVEL",
    ] {
        env::remove_var(name);
    }
}

#[test]
fn test_defaults() {
    let config = TagscanConfig::default();
    assert_eq!(config.server.port, 5730);
    assert_eq!(config.pipeline.max_concurrency, 4);
    assert_eq!(config.vision.timeout_secs, 60);
    assert_eq!(config.live.keep_alive_secs, 15);
    assert!(config.live.idle_timeout_secs.is_none());
    assert_eq!(config.assets.url_template, DEFAULT_ASSET_URL_TEMPLATE);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_toml_fills_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 9000

[auth]
jwt_secret = "s3cret"

[live]
idle_timeout_secs = 300
"#
    )
    .unwrap();

    let config = TagscanConfig::load_from_path(file.path()).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
    assert_eq!(config.live.idle_timeout_secs, Some(300));
    assert_eq!(config.live.channel_capacity, 64);
}

#[test]
fn test_malformed_toml_is_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server\nport = ").unwrap();
    assert!(TagscanConfig::load_from_path(file.path()).is_err());
}

#[test]
#[serial]
fn test_missing_file_degrades_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = TagscanConfig::resolve(Some(&missing)).unwrap();
    assert_eq!(config.server.port, 5730);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server]\nport = 9000\n[auth]\njwt_secret = \"from-toml\"").unwrap();

    env::set_var("TAGSCAN_PORT", "9100");
    env::set_var("TAGSCAN_JWT_SECRET", "from-env");
    let config = TagscanConfig::resolve(Some(file.path())).unwrap();
    clear_env();

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));
}

#[test]
#[serial]
fn test_unparsable_env_port_ignored() {
    clear_env();
    env::set_var("TAGSCAN_PORT", "not-a-port");
    let mut config = TagscanConfig::default();
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.server.port, 5730);
}

#[test]
fn test_validate_requires_secret() {
    let mut config = TagscanConfig::default();
    assert!(config.validate().is_err());

    config.auth.jwt_secret = Some("  ".to_string());
    assert!(config.validate().is_err());

    config.auth.jwt_secret = Some("s3cret".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_template_without_placeholder() {
    let mut config = TagscanConfig::default();
    config.auth.jwt_secret = Some("s3cret".to_string());
    config.assets.url_template = "https://example.test/item".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_timeout() {
    let mut config = TagscanConfig::default();
    config.auth.jwt_secret = Some("s3cret".to_string());
    config.vision.timeout_secs = 0;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));

    config.vision.timeout_secs = 1;
    assert!(config.validate().is_ok());
}
