/*!
 * Configuration types for the HPP locator
 */

use hpp_locator_connect::GrpcSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LocatorError, Result};

/// Port the naming service listens on unless told otherwise
pub const DEFAULT_NAME_SERVICE_PORT: u16 = 2809;

/// Where the naming service lives and which namespace to bind from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Host running the naming service
    pub host: String,

    /// Naming service port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Appended to "hpp" to form the root naming id, e.g. "-test"
    #[serde(default)]
    pub namespace_suffix: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LocatorConfig {
    /// Configuration for `host` with the default port and no suffix
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_NAME_SERVICE_PORT,
            namespace_suffix: String::new(),
            transport: TransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_namespace_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.namespace_suffix = suffix.into();
        self
    }

    /// Reject configurations that cannot name a naming service
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(LocatorError::Config(
                "naming service host must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(LocatorError::Config(
                "naming service port must not be 0".to_string(),
            ));
        }
        if self.namespace_suffix.contains('/') {
            return Err(LocatorError::Config(format!(
                "namespace suffix '{}' must not contain '/'",
                self.namespace_suffix
            )));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LocatorConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Timeouts for the gRPC binding, in milliseconds.
///
/// Applied on every connect of a gRPC locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Give up dialing a server after this long (None = no limit)
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Give up waiting for a reply after this long (None = no limit)
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl TransportConfig {
    pub fn grpc_settings(&self) -> GrpcSettings {
        GrpcSettings {
            connect_timeout: self.connect_timeout_ms.map(Duration::from_millis),
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_NAME_SERVICE_PORT
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_uses_defaults() {
        let config = LocatorConfig::new("planner");
        assert_eq!(config.host, "planner");
        assert_eq!(config.port, 2809);
        assert_eq!(config.namespace_suffix, "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = LocatorConfig::new("planner")
            .with_port(12809)
            .with_namespace_suffix("-test");
        assert_eq!(config.port, 12809);
        assert_eq!(config.namespace_suffix, "-test");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            LocatorConfig::new("  ").validate(),
            Err(LocatorError::Config(_))
        ));
        assert!(LocatorConfig::new("planner").with_port(0).validate().is_err());
        assert!(LocatorConfig::new("planner")
            .with_namespace_suffix("a/b")
            .validate()
            .is_err());
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config: LocatorConfig = toml::from_str(r#"host = "planner""#).unwrap();
        assert_eq!(config, LocatorConfig::new("planner"));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
            host = "10.0.0.5"
            port = 12809
            namespace_suffix = "-sim"

            [transport]
            connect_timeout_ms = 1500

            [logging]
            log_level = "debug"
        "#;

        let config: LocatorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port, 12809);
        assert_eq!(config.namespace_suffix, "-sim");
        assert_eq!(config.logging.log_level, LogLevel::Debug);

        let settings = config.transport.grpc_settings();
        assert_eq!(settings.connect_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.request_timeout, None);
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let config = LocatorConfig::new("planner").with_namespace_suffix("-test");

        config.to_file(file.path()).unwrap();
        let loaded = LocatorConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_host_is_a_config_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "port = 2809\n").unwrap();

        assert!(matches!(
            LocatorConfig::from_file(file.path()),
            Err(LocatorError::Config(_))
        ));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
