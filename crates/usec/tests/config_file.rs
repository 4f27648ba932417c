//! `SessionConfig` loaded from JSON files.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects, // test geometry math on small constants
    clippy::indexing_slicing
)]

use std::io::Write as _;
use std::path::PathBuf;

use usec::{SessionConfig, UpdateMode};

#[test]
fn partial_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "fast_write": false, "timeout_ms": 5000 }}"#).unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    let config: SessionConfig = serde_json::from_str(&text).unwrap();

    assert!(!config.fast_write);
    assert_eq!(config.timeout_ms, 5000);
    assert_eq!(config.max_transfer_bytes, 61_440);
    assert_eq!(config.device_paths, SessionConfig::default().device_paths);
    config.validate().unwrap();
}

#[test]
fn device_paths_are_overridable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usec.json");
    std::fs::write(
        &path,
        r#"{ "device_paths": ["/dev/sg1", "/dev/sg2", "/dev/sg3", "/dev/sg4"] }"#,
    )
    .unwrap();

    let config: SessionConfig =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config.device_paths[2], PathBuf::from("/dev/sg3"));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = serde_json::from_str::<SessionConfig>(r#"{ "fastwrite": true }"#).unwrap_err();
    assert!(err.to_string().contains("unknown field"));
}

#[test]
fn config_survives_a_json_round_trip() {
    let config = SessionConfig {
        fast_write: false,
        max_transfer_bytes: 32_768,
        ..SessionConfig::default()
    };
    let json = serde_json::to_string_pretty(&config).unwrap();
    assert_eq!(serde_json::from_str::<SessionConfig>(&json).unwrap(), config);
}

#[test]
fn update_modes_serialise_by_name() {
    let json = serde_json::to_string(&UpdateMode::Gc16).unwrap();
    assert_eq!(serde_json::from_str::<UpdateMode>(&json).unwrap(), UpdateMode::Gc16);
}
