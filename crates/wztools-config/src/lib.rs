// wztools-config - TOML configuration for the wztools utilities
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from WZTOOLS_CONFIG env var
// 3. Config file contents from WZTOOLS_CONFIG_CONTENT env var
// 4. Default config file locations (./wztools.toml, ./.wztools.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod env_overrides;
mod load;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use load::{load_toml, load_toml_as, ConfigError};

/// Main tools configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub datalake: DatalakeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub command: CommandConfig,
}

/// Data lake location and default lookup keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatalakeConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_key: Option<String>,
    #[serde(default)]
    pub read_layout: ReadLayout,
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for DatalakeConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            dataset: None,
            special_key: None,
            read_layout: ReadLayout::default(),
        }
    }
}

/// Directory layout used when resolving ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadLayout {
    /// `{root}/{YYYY}/{MM}/{DD}`
    #[default]
    Flat,
    /// `{root}/{dataset}/{YYYY}/{MM}/{DD}`
    Dataset,
}

impl std::fmt::Display for ReadLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadLayout::Flat => write!(f, "flat"),
            ReadLayout::Dataset => write!(f, "dataset"),
        }
    }
}

impl std::str::FromStr for ReadLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(ReadLayout::Flat),
            "dataset" => Ok(ReadLayout::Dataset),
            _ => anyhow::bail!("Unsupported read layout: {}. Supported: flat, dataset", s),
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logger_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_console")]
    pub console: bool,
}

fn default_logger_name() -> String {
    "wztools".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_console() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            name: default_logger_name(),
            level: default_log_level(),
            file: None,
            console: default_console(),
        }
    }
}

/// Command runner defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub stop_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ToolsConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if config file is missing.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Parse inline TOML content (no env or file lookups).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse inline config content")
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: ToolsConfig) {
        self.datalake = other.datalake;
        self.logging = other.logging;
        self.command = other.command;
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration from inline content plus overrides from an `EnvSource`.
    pub fn load_with_env<E: EnvSource>(inline_config: Option<&str>, env: &E) -> Result<Self> {
        let mut config = ToolsConfig::default();

        if let Some(inline) = inline_config {
            config.merge(Self::from_toml_str(inline)?);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_layout_from_str() {
        assert_eq!("flat".parse::<ReadLayout>().unwrap(), ReadLayout::Flat);
        assert_eq!("DATASET".parse::<ReadLayout>().unwrap(), ReadLayout::Dataset);
        assert!("hive".parse::<ReadLayout>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = ToolsConfig::default();
        assert_eq!(config.datalake.root, PathBuf::from("./data"));
        assert_eq!(config.datalake.read_layout, ReadLayout::Flat);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.console);
        assert!(config.command.timeout().is_none());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config = ToolsConfig::from_toml_str(
            r#"
            [datalake]
            root = "/lake"
            dataset = "era5"
            read_layout = "dataset"

            [command]
            timeout_secs = 30
            stop_keywords = ["FATAL"]
            "#,
        )
        .unwrap();

        assert_eq!(config.datalake.root, PathBuf::from("/lake"));
        assert_eq!(config.datalake.dataset.as_deref(), Some("era5"));
        assert!(config.datalake.special_key.is_none());
        assert_eq!(config.datalake.read_layout, ReadLayout::Dataset);
        assert_eq!(config.logging, LoggingConfig::default());
        assert_eq!(config.command.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.command.stop_keywords, vec!["FATAL".to_string()]);
    }

    #[test]
    fn test_to_toml_string_round_trips() {
        let mut config = ToolsConfig::default();
        config.datalake.special_key = Some("v2".to_string());
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(ToolsConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
