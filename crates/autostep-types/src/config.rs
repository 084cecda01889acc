//! Global configuration types for Autostep.
//!
//! `AutostepConfig` represents the optional `config.toml` under the data
//! root. Every field has a default so a missing file is a valid config.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutostepConfig {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Export spans through the OpenTelemetry stdout exporter.
    #[serde(default)]
    pub otel: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otel: false,
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Timeout applied to `run` steps that do not set `timeout_seconds`.
    #[serde(default)]
    pub default_command_timeout_secs: Option<u64>,
}

/// `[service]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name registered for Safe Mode startup.
    #[serde(default = "default_service_name")]
    pub name: String,
}

fn default_service_name() -> String {
    "Autostep".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = AutostepConfig::default();
        assert_eq!(config.log.level, "info");
        assert!(!config.log.otel);
        assert!(config.runner.default_command_timeout_secs.is_none());
        assert_eq!(config.service.name, "Autostep");
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: AutostepConfig = toml::from_str("").unwrap();
        assert_eq!(config, AutostepConfig::default());
    }

    #[test]
    fn test_config_deserialize_with_values() {
        let toml_str = r#"
[log]
level = "debug"
otel = true

[runner]
default_command_timeout_secs = 600

[service]
name = "AutostepSvc"
"#;
        let config: AutostepConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log.level, "debug");
        assert!(config.log.otel);
        assert_eq!(config.runner.default_command_timeout_secs, Some(600));
        assert_eq!(config.service.name, "AutostepSvc");
    }
}
