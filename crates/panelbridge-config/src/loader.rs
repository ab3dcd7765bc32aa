// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reading a [`BridgeConfig`] from disk or from a string.
//!
//! A load goes through these stages in order:
//!
//! 1. the format is taken from the file extension (`yaml`/`yml`, `toml`, `json`)
//! 2. `${NAME}` and `${NAME:fallback}` placeholders are substituted in the raw text
//! 3. the text is deserialized
//! 4. `PANELBRIDGE_*` variables override individual keys
//! 5. the result is validated, unless the caller turned that off
//!
//! Recognized overrides, shown with the default prefix:
//!
//! ```text
//! PANELBRIDGE_SERIAL_PORT=/dev/ttyUSB1
//! PANELBRIDGE_SERIAL_BAUD_RATE=19200
//! PANELBRIDGE_LINK_RECONNECT_DELAY=30s
//! PANELBRIDGE_LOG_LEVEL=debug
//! ```

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{BridgeConfig, LogLevel};

/// Prefix of override variables unless [`ConfigLoader::with_env_prefix`] says otherwise.
pub const DEFAULT_ENV_PREFIX: &str = "PANELBRIDGE";

// =============================================================================
// EnvSource
// =============================================================================

/// Where placeholders and overrides are looked up.
///
/// Tests use [`EnvSource::from_pairs`] so they never see the real environment.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// `std::env`.
    #[default]
    Process,
    /// Fixed name/value table.
    Map(HashMap<String, String>),
}

impl EnvSource {
    /// Fixed source holding `pairs`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Value of `name`, if set.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Map(vars) => vars.get(name).cloned(),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads and checks bridge configurations.
///
/// ```no_run
/// use panelbridge_config::{ConfigLoader, EnvSource};
///
/// let config = ConfigLoader::new()
///     .with_env_source(EnvSource::from_pairs([("PANELBRIDGE_LOG_LEVEL", "debug")]))
///     .load("bridge.yaml")?;
/// # Ok::<(), panelbridge_config::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    /// Placeholders and overrides both hang off this flag.
    use_env: bool,
    validate: bool,
    env: EnvSource,
}

impl ConfigLoader {
    /// Loader with the default prefix, the process environment and validation on.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_owned(),
            use_env: true,
            validate: true,
            env: EnvSource::Process,
        }
    }

    /// Replaces [`DEFAULT_ENV_PREFIX`].
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Turns placeholder substitution and overrides on or off.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Skips validation when `false`, for callers that patch the result
    /// (command-line port, baud rate) and validate afterwards.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Replaces the environment placeholders and overrides are read from.
    pub fn with_env_source(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Loads `path`, picking the format from its extension.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let format = ConfigFormat::from_path(path)?;
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::file_not_found(path),
            _ => ConfigError::io(path, e),
        })?;

        let config = self
            .deserialize(&self.substitute(&raw), format)
            .map_err(|e| match e {
                ConfigError::Serialization { message } => ConfigError::parse(path, message),
                other => other,
            })?;

        let config = self.finish(config)?;
        debug!(summary = %config.summary(), "Configuration loaded");
        Ok(config)
    }

    /// Same as [`load`](Self::load) for text already in memory.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
        let config = self.deserialize(&self.substitute(content), format)?;
        self.finish(config)
    }

    /// Defaults with overrides applied, for running without a file.
    pub fn load_defaults(&self) -> ConfigResult<BridgeConfig> {
        self.finish(BridgeConfig::default())
    }

    fn finish(&self, mut config: BridgeConfig) -> ConfigResult<BridgeConfig> {
        if self.use_env {
            self.apply_env_overrides(&mut config)?;
        }
        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    fn deserialize(&self, content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
        match format {
            ConfigFormat::Yaml => from_yaml(content),
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
        }
    }

    fn substitute(&self, content: &str) -> String {
        if self.use_env {
            self.resolve_env_placeholders(content)
        } else {
            content.to_owned()
        }
    }

    /// Replaces `${NAME}` with the variable and `${NAME:fallback}` with the
    /// variable or the fallback. A placeholder that resolves to nothing, or
    /// is never closed, is copied through unchanged.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let body_and_tail = &rest[start + 2..];
            let Some(len) = body_and_tail.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };

            let body = &body_and_tail[..len];
            let (name, fallback) = match body.split_once(':') {
                Some((name, fallback)) => (name, Some(fallback)),
                None => (body, None),
            };
            match self.env.get(name).as_deref().or(fallback) {
                Some(value) => out.push_str(value),
                None => {
                    warn!(name, "Placeholder references an unset variable");
                    out.push_str(&rest[start..start + 2 + len + 1]);
                }
            }
            rest = &body_and_tail[len + 1..];
        }

        out.push_str(rest);
        out
    }

    /// Value of `<prefix>_<key>` together with the full variable name.
    fn lookup(&self, key: &str) -> Option<(String, String)> {
        let name = format!("{}_{key}", self.env_prefix);
        self.env.get(&name).map(|value| (name, value))
    }

    fn apply_env_overrides(&self, config: &mut BridgeConfig) -> ConfigResult<()> {
        if let Some((_, port)) = self.lookup("SERIAL_PORT") {
            config.serial.port = port;
        }
        if let Some((name, value)) = self.lookup("SERIAL_BAUD_RATE") {
            config.serial.baud_rate = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(name, "expected a baud rate"))?;
        }
        if let Some((name, value)) = self.lookup("LINK_RECONNECT_DELAY") {
            config.link.reconnect_delay = humantime::parse_duration(value.trim())
                .map_err(|e| ConfigError::invalid_env_var(name, e.to_string()))?;
        }
        if let Some((name, value)) = self.lookup("LOG_LEVEL") {
            config.logging.level = value
                .parse::<LogLevel>()
                .map_err(|message| ConfigError::invalid_env_var(name, message))?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml`, `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Format for `path`, by case-insensitive extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ConfigError::unsupported_format("(no extension)"));
        };
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::unsupported_format(ext)),
        }
    }

    /// Canonical extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Loads `path` with the process environment and validation on.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load(path)
}

/// Loads `content` with the process environment and validation on.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<BridgeConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

/// YAML goes through the `config` crate, which also yields serde errors
/// with the offending key path.
fn from_yaml<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogFormat;
    use panelbridge_serial::Parity;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_env_source(EnvSource::from_pairs(Vec::<(String, String)>::new()))
    }

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml() {
        let file = write_temp(
            ".yaml",
            r#"
serial:
  port: /dev/ttyUSB0
  baud_rate: 19200
  parity: even

link:
  send_spacing: 200ms
  stall_threshold: 8
  reconnect_delay: 30s
  max_pending: 64

logging:
  level: debug
  format: json
"#,
        );

        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.link.send_spacing, Duration::from_millis(200));
        assert_eq!(config.link.stall_threshold, 8);
        assert_eq!(config.link.reconnect_delay, Duration::from_secs(30));
        assert_eq!(config.link.max_pending, Some(64));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.resolver.event_marker, "!");
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r##"
[serial]
port = "COM3"

[resolver]
event_marker = "#"
error_code = "NAK"
"##,
        );

        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.resolver.event_marker, "#");
        assert_eq!(config.resolver.error_code, "NAK");
        assert_eq!(config.link.send_spacing, Duration::from_millis(150));
    }

    #[test]
    fn test_load_json() {
        let config = isolated()
            .load_from_str(
                r#"{"serial": {"port": "/dev/ttyS1"}, "link": {"reconnect_delay": "1m"}}"#,
                ConfigFormat::Json,
            )
            .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyS1");
        assert_eq!(config.link.reconnect_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("bridge.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("bridge.TOML")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(ConfigFormat::from_path(Path::new("bridge.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("bridge")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let error = isolated().load("/nonexistent/bridge.yaml").unwrap_err();
        assert!(matches!(error, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let file = write_temp(".toml", "[serial\nport = ");
        let error = isolated().load(file.path()).unwrap_err();
        match error {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let result = isolated().load_from_str(
            "[serial]\nport = \"COM1\"\n[gateway]\nid = \"x\"\n",
            ConfigFormat::Toml,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_placeholders() {
        let loader = ConfigLoader::new()
            .with_env_source(EnvSource::from_pairs([("PANEL_TTY", "/dev/ttyACM0")]));

        let config = loader
            .load_from_str(
                "[serial]\nport = \"${PANEL_TTY}\"\nbaud_rate = ${PANEL_BAUD:4800}\n",
                ConfigFormat::Toml,
            )
            .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 4800);
    }

    #[test]
    fn test_unresolved_placeholder_is_kept() {
        let loader = isolated();
        assert_eq!(
            loader.resolve_env_placeholders("port = \"${MISSING}\""),
            "port = \"${MISSING}\""
        );
        assert_eq!(loader.resolve_env_placeholders("${UNCLOSED"), "${UNCLOSED");
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new()
            .with_env_source(EnvSource::from_pairs([
                ("PANELBRIDGE_SERIAL_PORT", "/dev/ttyUSB9"),
                ("PANELBRIDGE_SERIAL_BAUD_RATE", "38400"),
                ("PANELBRIDGE_LINK_RECONNECT_DELAY", "2m 30s"),
                ("PANELBRIDGE_LOG_LEVEL", "warn"),
            ]));

        let config = loader
            .load_from_str("[serial]\nport = \"/dev/ttyUSB0\"\n", ConfigFormat::Toml)
            .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB9");
        assert_eq!(config.serial.baud_rate, 38400);
        assert_eq!(config.link.reconnect_delay, Duration::from_secs(150));
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_env_override() {
        let loader = ConfigLoader::new()
            .with_env_source(EnvSource::from_pairs([("PANELBRIDGE_SERIAL_BAUD_RATE", "fast")]));

        let error = loader.load_defaults().unwrap_err();
        assert!(matches!(
            error,
            ConfigError::InvalidEnvVar { ref name, .. } if name == "PANELBRIDGE_SERIAL_BAUD_RATE"
        ));
    }

    #[test]
    fn test_custom_prefix_and_disabled_validation() {
        let loader = ConfigLoader::new()
            .with_env_prefix("PB")
            .with_env_source(EnvSource::from_pairs([("PB_LOG_LEVEL", "trace")]))
            .with_validation(false);

        let config = loader.load_defaults().unwrap();
        assert!(config.serial.port.is_empty());
        assert_eq!(config.logging.level, LogLevel::Trace);
    }

    #[test]
    fn test_validation_runs_after_overrides() {
        let loader = ConfigLoader::new()
            .with_env_source(EnvSource::from_pairs([("PANELBRIDGE_SERIAL_PORT", "/dev/ttyUSB0")]));
        assert!(loader.load_defaults().is_ok());
        assert!(isolated().load_defaults().is_err());
    }
}
