//! Loading and validating gateway configuration files.

use elster_rs::config::{RequestRow, Transport};
use elster_rs::{GatewayConfig, GatewayError};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

/// A complete file overrides defaults and nested sections.
#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"{
            "startup_delay_ms": 5000,
            "app_prefix": "wp",
            "requests": [
                {"signal": "SPEICHERISTTEMP", "frequency_s": 60, "member": "KESSEL"},
                {"signal": "GERAETE_ID", "frequency_s": 3600, "member": "ALL"}
            ],
            "mqtt": {"host": "broker.local", "username": "wp"},
            "bus": {"transport": "slcan", "port": "/dev/ttyUSB0", "bitrate": 20000}
        }"#,
    );
    let config = GatewayConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.startup_delay_ms, 5_000);
    assert_eq!(config.app_prefix, "wp");
    assert_eq!(config.uid_prefix, "stiebel");
    assert_eq!(config.request_rows().len(), 2);
    assert_eq!(config.request_rows()[1], RequestRow::new("GERAETE_ID", 3600, "ALL"));
    assert_eq!(config.mqtt.host, "broker.local");
    assert_eq!(config.mqtt.port, 1883);
    assert_eq!(config.mqtt.username.as_deref(), Some("wp"));
    assert_eq!(config.bus.transport, Transport::Slcan);
    assert_eq!(config.bus.port, "/dev/ttyUSB0");
}

/// An empty object yields the default configuration.
#[test]
fn test_empty_object_is_default() {
    let file = write_config("{}");
    let config = GatewayConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config, GatewayConfig::default());
}

/// Missing files, bad JSON and unknown transports are reported.
#[test]
fn test_load_errors() {
    let missing = GatewayConfig::load_from_file("/nonexistent/elster.json");
    assert!(matches!(missing, Err(GatewayError::Io(_))));

    let file = write_config("{ not json");
    assert!(matches!(GatewayConfig::load_from_file(file.path()), Err(GatewayError::Json(_))));

    let file = write_config(r#"{"bus": {"transport": "usb"}}"#);
    assert!(matches!(GatewayConfig::load_from_file(file.path()), Err(GatewayError::Json(_))));
}

/// Files are validated after parsing.
#[test]
fn test_loaded_file_is_validated() {
    let file = write_config(r#"{"requests": [{"signal": "SPEICHERISTTEMP", "frequency_s": 0, "member": "KESSEL"}]}"#);
    assert!(matches!(GatewayConfig::load_from_file(file.path()), Err(GatewayError::Config(_))));

    let file = write_config(r#"{"blacklist_timeout_threshold": 0}"#);
    assert!(matches!(GatewayConfig::load_from_file(file.path()), Err(GatewayError::Config(_))));

    let file = write_config(r#"{"max_requests_per_iteration": 0}"#);
    assert!(matches!(GatewayConfig::load_from_file(file.path()), Err(GatewayError::Config(_))));

    let file = write_config(r#"{"tick_interval_ms": 0}"#);
    match GatewayConfig::load_from_file(file.path()) {
        Err(GatewayError::Config(message)) => assert!(message.contains("tick_interval_ms")),
        other => panic!("expected config error, got {other:?}"),
    }
}

/// Without rows the built-in table is polled.
#[test]
fn test_builtin_table_when_no_rows() {
    let config = GatewayConfig::default();
    let rows = config.request_rows();
    assert!(rows.iter().any(|r| r.member == "ALL"));
    assert!(rows.iter().all(|r| r.frequency_s > 0));
}
