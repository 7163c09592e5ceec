use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    dispatcher::DispatcherConfig, fleet::FleetConfig, observability::ObservabilityConfig,
};
use crate::validation::ConfigValidator;
use crate::{ConfigError, ConfigResult};

/// 未显式指定配置文件时依次查找的路径
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/dispatch.toml",
    "dispatch.toml",
    "/etc/dispatch/config.toml",
];

/// 环境变量前缀，例如 `DISPATCH_DISPATCHER__IDLE_INTERVAL_MS=200`
pub const ENV_PREFIX: &str = "DISPATCH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub dispatcher: DispatcherConfig,
    pub fleet: FleetConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> ConfigResult<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(ConfigError::File(format!("配置文件不存在: {path}")));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: AppConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.dispatcher.validate()?;
        self.fleet.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogFormat;
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.dispatcher.enabled);
        assert_eq!(config.dispatcher.idle_interval_ms, 100);
        assert_eq!(config.dispatcher.requeue_backoff_ms, 50);
        assert_eq!(config.dispatcher.max_assignment_attempts, None);
        assert!(config.fleet.seed_default_truck);
        assert!(config.fleet.trucks.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_app_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_with_partial_sections() {
        let toml_str = r#"
            [dispatcher]
            idle_interval_ms = 250
            max_assignment_attempts = 20

            [[fleet.trucks]]
            capacity = 100
            reliability = 0.9

            [[fleet.trucks]]
            capacity = 150
            reliability = 0.8
        "#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.dispatcher.idle_interval_ms, 250);
        assert_eq!(config.dispatcher.requeue_backoff_ms, 50);
        assert_eq!(config.dispatcher.max_assignment_attempts, Some(20));
        assert_eq!(config.fleet.trucks.len(), 2);
        assert_eq!(config.fleet.trucks[1].capacity, 150);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let toml_str = r#"
            [dispatcher]
            idle_interval_ms = 0
        "#;
        assert!(matches!(
            AppConfig::from_toml(toml_str),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("dispatcher = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_app_config_serialization() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        assert!(toml_str.contains("[dispatcher]"));
        assert!(toml_str.contains("idle_interval_ms = 100"));

        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [dispatcher]
            requeue_backoff_ms = 75
            in_progress_delay_ms = 0

            [observability]
            log_format = "json"
            "#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.dispatcher.requeue_backoff_ms, 75);
        assert_eq!(config.dispatcher.in_progress_delay_ms, 0);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Some("/nonexistent/dispatch.toml"));
        assert!(matches!(result, Err(ConfigError::File(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatcher\nidle_interval_ms = ").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let result = AppConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
