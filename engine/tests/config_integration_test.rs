//! Integration tests for configuration management
//!
//! These tests load configuration from real files in temporary directories
//! and check defaults, overrides and validation failures.

use sdk::errors::EngineError;
use std::fs;
use tempfile::TempDir;
use waypoint_engine::config::Config;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[core]
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9100
client_queue_capacity = 32

[llm]
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
api_key_env = "WAYPOINT_TEST_KEY"
temperature = 0.0
max_tokens = 512
timeout_secs = 30
max_retries = 1

[geocoding]
max_locations = 3
confidence_threshold = 0.75
focus_zoom = 12
timeout_secs = 5
max_retries = 0

[map]
default_latitude = 51.5074
default_longitude = -0.1278
default_zoom = 10
min_zoom = 2
max_zoom = 18

[orchestrator]
max_rounds = 4
system_prompt = "Only move the map."
"#,
    );

    let config = Config::load_from_path(&path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.server.client_queue_capacity, 32);
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.timeout().as_secs(), 30);
    assert_eq!(config.geocoding.confidence_threshold, 0.75);
    assert_eq!(config.geocoding.focus_zoom, Some(12));
    assert_eq!(config.orchestrator.max_rounds, 4);
    assert_eq!(
        config.orchestrator.system_prompt.as_deref(),
        Some("Only move the map.")
    );

    let initial = config.map.initial_state();
    assert_eq!(initial.latitude, 51.5074);
    assert_eq!(initial.zoom, 10);
    assert_eq!(initial.version, 0);
    assert_eq!(config.map.clamp_zoom(25), 18);
    assert_eq!(config.map.clamp_zoom(-3), 2);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server]\nport = 8123\n");

    let config = Config::load_from_path(&path).unwrap();
    let defaults = Config::default();

    assert_eq!(config.server.port, 8123);
    assert_eq!(config.server.host, defaults.server.host);
    assert_eq!(config.llm.base_url, defaults.llm.base_url);
    assert_eq!(config.map.max_zoom, defaults.map.max_zoom);
    assert_eq!(config.orchestrator.max_rounds, defaults.orchestrator.max_rounds);
}

#[test]
fn test_written_config_reloads_identically() {
    let dir = TempDir::new().unwrap();
    let rendered = toml::to_string_pretty(&Config::default()).unwrap();
    let path = write_config(&dir, &rendered);

    let reloaded = Config::load_from_path(&path).unwrap();
    assert_eq!(toml::to_string_pretty(&reloaded).unwrap(), rendered);
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn test_invalid_toml_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server\nport = ");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("parse"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        "[core]\nlog_level = \"loud\"\n",
        "[map]\nmin_zoom = 10\nmax_zoom = 5\ndefault_zoom = 7\n",
        "[map]\ndefault_zoom = 30\n",
        "[map]\ndefault_latitude = 95.0\n",
        "[geocoding]\nconfidence_threshold = 1.5\n",
        "[orchestrator]\nmax_rounds = 0\n",
        "[llm]\ntimeout_secs = 0\n",
        "[server]\nclient_queue_capacity = 0\n",
    ];

    let dir = TempDir::new().unwrap();
    for case in cases {
        let path = write_config(&dir, case);
        let result = Config::load_from_path(&path);
        assert!(
            matches!(result, Err(EngineError::Config(_))),
            "accepted invalid config: {}",
            case
        );
    }
}
