// Configuration source loading.
//
// Priority order:
// 1. Environment variables (WZTOOLS_* prefix)
// 2. Config file path from WZTOOLS_CONFIG
// 3. Inline config content from WZTOOLS_CONFIG_CONTENT
// 4. Default config files (./wztools.toml, ./.wztools.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::load::load_toml_as;
use crate::ToolsConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["./wztools.toml", "./.wztools.toml"];

/// Load configuration using the process environment and default file locations.
pub fn load_config() -> Result<ToolsConfig> {
    let mut config = ToolsConfig::default();

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<ToolsConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        let config = load_toml_as(&path)?;
        return Ok(Some(config));
    }

    if let Ok(content) = env::var(format!("{}CONFIG_CONTENT", ENV_PREFIX)) {
        let config: ToolsConfig = toml::from_str(&content)
            .context("Failed to parse inline config from WZTOOLS_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in DEFAULT_CONFIG_FILES {
        if Path::new(path).exists() {
            let config = load_toml_as(path)?;
            return Ok(Some(config));
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<ToolsConfig> {
    let file_config: ToolsConfig = load_toml_as(path.as_ref())?;

    let mut config = ToolsConfig::default();
    config.merge(file_config);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;

    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
pub fn load_or_default() -> Result<ToolsConfig> {
    let mut config = ToolsConfig::default();

    match load_from_file() {
        Ok(Some(file_config)) => config.merge(file_config),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring unreadable config file: {:#}", e),
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;

    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
