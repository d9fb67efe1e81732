use super::{ReadLayout, ToolsConfig};
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "WZTOOLS_";

/// Abstraction over environment-variable lookups so tests (and embedders)
/// can supply their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the `WZTOOLS_` prefix
    fn get(&self, key: &str) -> Option<String>;
}

impl EnvSource for std::collections::HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

/// Apply environment-variable overrides (highest priority) to the config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut ToolsConfig, env: &E) -> Result<()> {
    // Data lake
    if let Some(root) = get_env_string(env, "DATALAKE_ROOT") {
        config.datalake.root = PathBuf::from(root);
    }
    if let Some(dataset) = get_env_string(env, "DATASET") {
        config.datalake.dataset = Some(dataset);
    }
    if let Some(key) = get_env_string(env, "SPECIAL_KEY") {
        config.datalake.special_key = Some(key);
    }
    if let Some(layout) = get_env_string(env, "READ_LAYOUT") {
        config.datalake.read_layout = layout
            .parse::<ReadLayout>()
            .context("Invalid WZTOOLS_READ_LAYOUT value")?;
    }

    // Logging
    if let Some(name) = get_env_string(env, "LOG_NAME") {
        config.logging.name = name;
    }
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(file) = get_env_string(env, "LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }
    if let Some(console) = get_env_bool(env, "LOG_CONSOLE")? {
        config.logging.console = console;
    }

    // Command runner
    if let Some(secs) = get_env_u64(env, "COMMAND_TIMEOUT_SECS")? {
        config.command.timeout_secs = Some(secs);
    }
    if let Some(keywords) = get_env_string(env, "COMMAND_STOP_KEYWORDS") {
        config.command.stop_keywords = keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(cwd) = get_env_string(env, "COMMAND_CWD") {
        config.command.cwd = Some(PathBuf::from(cwd));
    }

    Ok(())
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .parse::<u64>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_bool<E: EnvSource>(env: &E, key: &str) -> Result<Option<bool>> {
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val.parse::<bool>().map_err(|e| {
                anyhow!(
                    "Failed to parse {}{} (expected bool): {}",
                    ENV_PREFIX,
                    key,
                    e
                )
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}
