// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! Configuration files on disk through the loader and into a running link.
//!
//! ## Test Categories
//!
//! - `test_load_*`: file formats
//! - `test_env_*`: placeholders and overrides
//! - `test_validation_*`: rejected configurations
//! - `test_runtime_*`: a loaded configuration driving the supervisor

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use panelbridge_config::{ConfigError, ConfigLoader, EnvSource, LogFormat, LogLevel};
use panelbridge_core::LinkError;
use panelbridge_serial::Supervisor;
use panelbridge_tests::prelude::*;

/// Loader that sees only the given variables.
fn isolated_loader(vars: &[(&str, &str)]) -> ConfigLoader {
    ConfigLoader::new().with_env_source(EnvSource::from_pairs(vars.iter().copied()))
}

fn write_config(extension: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{extension}"))
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_file() {
    let file = write_config("yaml", ConfigFixtures::yaml());
    let config = isolated_loader(&[]).load(file.path()).unwrap();

    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 19200);
    assert_eq!(config.link.send_spacing, Duration::from_millis(200));
    assert_eq!(config.link.stall_threshold, 3);
    assert_eq!(config.link.reconnect_delay, Duration::from_secs(30));
    assert_eq!(config.link.max_pending, Some(64));
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_load_toml_file() {
    let file = write_config("toml", ConfigFixtures::toml());
    let config = isolated_loader(&[]).load(file.path()).unwrap();

    assert_eq!(config.serial.port, "COM3");
    assert_eq!(config.link.send_spacing, Duration::from_millis(150));
    assert_eq!(config.link.reconnect_delay, Duration::from_secs(60));
    assert_eq!(config.link.stall_threshold, 5);
    assert_eq!(config.logging.level, LogLevel::Warn);
}

#[test]
fn test_load_json_file_uses_defaults() {
    let file = write_config("json", ConfigFixtures::json());
    let config = isolated_loader(&[]).load(file.path()).unwrap();

    assert_eq!(config.serial.port, "/dev/ttyS1");
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.link.send_spacing, Duration::from_millis(150));
    assert_eq!(config.link.max_pending, None);
    assert_eq!(config.resolver.event_marker, "!");
}

#[test]
fn test_load_unsupported_extension() {
    let file = write_config("ini", "[serial]\nport=COM1\n");
    let error = isolated_loader(&[]).load(file.path()).unwrap_err();
    assert!(matches!(error, ConfigError::UnsupportedFormat { .. }));
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn test_env_placeholders_and_overrides() {
    let file = write_config(
        "yaml",
        "serial:\n  port: ${PANEL_PORT:/dev/ttyUSB0}\nlink:\n  reconnect_delay: ${PANEL_DELAY}\n",
    );
    let loader = isolated_loader(&[
        ("PANEL_DELAY", "2m"),
        ("PANELBRIDGE_SERIAL_BAUD_RATE", "38400"),
        ("PANELBRIDGE_LOG_LEVEL", "error"),
    ]);

    let config = loader.load(file.path()).unwrap();

    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 38400);
    assert_eq!(config.link.reconnect_delay, Duration::from_secs(120));
    assert_eq!(config.logging.level, LogLevel::Error);
}

#[test]
fn test_env_override_supplies_missing_port() {
    let file = write_config("yaml", ConfigFixtures::yaml_without_port());

    let error = isolated_loader(&[]).load(file.path()).unwrap_err();
    assert!(matches!(error, ConfigError::Validation { ref field, .. } if field == "serial.port"));

    let config = isolated_loader(&[("PANELBRIDGE_SERIAL_PORT", "/dev/ttyACM0")])
        .load(file.path())
        .unwrap();
    assert_eq!(config.serial.port, "/dev/ttyACM0");
}

#[test]
fn test_env_invalid_override_names_variable() {
    let file = write_config("json", ConfigFixtures::json());
    let error = isolated_loader(&[("PANELBRIDGE_LINK_RECONNECT_DELAY", "soon")])
        .load(file.path())
        .unwrap_err();

    assert!(matches!(
        error,
        ConfigError::InvalidEnvVar { ref name, .. } if name == "PANELBRIDGE_LINK_RECONNECT_DELAY"
    ));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validation_rejects_zero_stall_threshold() {
    let file = write_config(
        "yaml",
        "serial:\n  port: /dev/ttyUSB0\nlink:\n  stall_threshold: 0\n",
    );
    let error = isolated_loader(&[]).load(file.path()).unwrap_err();
    assert!(
        matches!(error, ConfigError::Validation { ref field, .. } if field == "link.stall_threshold")
    );
}

#[test]
fn test_validation_rejects_unknown_sections() {
    let file = write_config("yaml", "serial:\n  port: /dev/ttyUSB0\ntelemetry:\n  enabled: true\n");
    assert!(isolated_loader(&[]).load(file.path()).is_err());
}

// =============================================================================
// Runtime
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_runtime_loaded_config_drives_supervisor() {
    init_test_logging();
    let file = write_config(
        "yaml",
        r#"
serial:
  port: /dev/ttyUSB0
link:
  send_spacing: 50ms
  stall_threshold: 2
resolver:
  event_marker: "*"
"#,
    );
    let config = isolated_loader(&[]).load(file.path()).unwrap();

    let factory = MockChannelFactory::new();
    let supervisor = Supervisor::builder(factory.clone())
        .options(config.link.clone())
        .resolver(config.resolver.clone())
        .build()
        .unwrap();
    let recorder = RecordingHandler::new("recorder");
    supervisor.register_handler(recorder.clone());

    supervisor.start().await.unwrap();
    let mut panel = factory.next_panel(PANEL_TIMEOUT).await.unwrap();

    for request in PanelRequests::batch(3) {
        supervisor.send(request).unwrap();
    }
    let mut times = Vec::new();
    for _ in 0..3 {
        times.push(panel.next_request_timed().await.unwrap().1);
    }
    assert_min_spacing(&times, Duration::from_millis(50));
    assert!(
        wait_until(Duration::from_secs(1), || supervisor.counters().messages_sent == 3).await
    );

    // Custom marker classifies the frame as an event, which runs the check
    // against the lowered threshold.
    panel.send_line("*ZN 4 OPEN").await.unwrap();
    assert!(wait_until(Duration::from_secs(1), || supervisor.state().is_recovering()).await);

    assert_eq!(recorder.events().len(), 1);
    assert_eq!(
        supervisor.health().last_error_type.as_deref(),
        Some("stalled")
    );
    supervisor.stop().await;
}

#[tokio::test]
async fn test_runtime_builder_rejects_invalid_resolver() {
    let config = isolated_loader(&[])
        .with_validation(false)
        .load_from_str(
            "resolver:\n  event_marker: \"\"\n",
            panelbridge_config::ConfigFormat::Yaml,
        )
        .unwrap();

    let error = Supervisor::builder(MockChannelFactory::new())
        .resolver(config.resolver)
        .build()
        .unwrap_err();
    assert!(matches!(error, LinkError::InvalidSettings { .. }));
}
