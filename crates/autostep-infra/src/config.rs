//! Configuration loader for Autostep.
//!
//! Reads `config.toml` from the data root and deserializes it into
//! [`AutostepConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use autostep_types::config::AutostepConfig;

/// Load configuration from `config_path`.
///
/// - If the file does not exist, returns [`AutostepConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_config(config_path: &Path) -> AutostepConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AutostepConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AutostepConfig::default();
        }
    };

    match toml::from_str::<AutostepConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AutostepConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).await;
        assert_eq!(config, AutostepConfig::default());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
[log]
level = "debug"
otel = true

[runner]
default_command_timeout_secs = 600

[service]
name = "AcmeAutostep"
"#,
        )
        .await
        .unwrap();

        let config = load_config(&config_path).await;
        assert_eq!(config.log.level, "debug");
        assert!(config.log.otel);
        assert_eq!(config.runner.default_command_timeout_secs, Some(600));
        assert_eq!(config.service.name, "AcmeAutostep");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&config_path).await;
        assert_eq!(config.service.name, "Autostep");
        assert!(config.runner.default_command_timeout_secs.is_none());
    }
}
