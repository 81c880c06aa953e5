//! Unit tests for `WorkerConfig` parsing, defaults and validation.

use std::time::Duration;

use console_worker::{AppError, WorkerConfig};

fn sample_toml() -> &'static str {
    r#"
name = "Report Worker"
queue_name = "reportworker"
diagnostics_prefix = "Report JVM"
poll_timeout_seconds = 2
launch_wait_seconds = 10
debug = true
"#
}

#[test]
fn parses_full_config() {
    let config = WorkerConfig::from_toml_str(sample_toml()).expect("valid config");
    assert_eq!(config.name, "Report Worker");
    assert_eq!(config.queue_name, "reportworker");
    assert_eq!(config.diagnostics_prefix().as_deref(), Some("Report JVM"));
    assert_eq!(config.poll_timeout(), Duration::from_secs(2));
    assert_eq!(config.launch_wait(), Duration::from_secs(10));
    assert!(config.debug);
}

#[test]
fn minimal_config_uses_defaults() {
    let config = WorkerConfig::from_toml_str(r#"name = "Demo""#).expect("valid config");
    assert_eq!(config.queue_name, "consoleworker");
    assert_eq!(config.poll_timeout(), Duration::from_secs(5));
    assert_eq!(config.launch_wait(), Duration::ZERO);
    assert!(!config.debug);
}

#[test]
fn diagnostics_prefix_defaults_to_name() {
    let config = WorkerConfig::from_toml_str(r#"name = "Demo""#).expect("valid config");
    assert_eq!(config.diagnostics_prefix().as_deref(), Some("Demo Diagnostics"));
}

#[test]
fn empty_diagnostics_prefix_disables_prefix() {
    let config = WorkerConfig::from_toml_str(
        r#"
name = "Demo"
diagnostics_prefix = ""
"#,
    )
    .expect("valid config");
    assert_eq!(config.diagnostics_prefix(), None);
}

#[test]
fn missing_name_is_rejected() {
    let err = WorkerConfig::from_toml_str(r#"queue_name = "q""#).expect_err("name required");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn blank_name_is_rejected() {
    let err = WorkerConfig::from_toml_str(r#"name = "   ""#).expect_err("blank name");
    assert_eq!(err.to_string(), "config: name must not be empty");
}

#[test]
fn blank_queue_name_is_rejected() {
    let err = WorkerConfig::from_toml_str(
        r#"
name = "Demo"
queue_name = ""
"#,
    )
    .expect_err("blank queue name");
    assert_eq!(err.to_string(), "config: queue_name must not be empty");
}

#[test]
fn zero_poll_timeout_is_rejected() {
    let err = WorkerConfig::from_toml_str(
        r#"
name = "Demo"
poll_timeout_seconds = 0
"#,
    )
    .expect_err("zero timeout");
    assert!(err.to_string().contains("poll_timeout_seconds"));
}

#[test]
fn load_from_path_reads_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("config.toml");
    std::fs::write(&path, sample_toml()).expect("write config");

    let config = WorkerConfig::load_from_path(&path).expect("load");
    assert_eq!(config.name, "Report Worker");
}

#[test]
fn load_from_missing_path_is_config_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let err = WorkerConfig::load_from_path(temp.path().join("absent.toml"))
        .expect_err("missing file");
    assert!(err.to_string().starts_with("config: failed to read config:"));
}
