// Configuration validation
//
// Validates that required fields are present and values are sensible

use super::*;
use anyhow::{bail, Result};
use tracing::warn;

/// Timeouts beyond a day are almost always a unit mistake (ms vs s)
const LONG_TIMEOUT_SECS: u64 = 24 * 60 * 60;

pub fn validate_config(config: &ToolsConfig) -> Result<()> {
    validate_datalake_config(&config.datalake)?;
    validate_logging_config(&config.logging)?;
    validate_command_config(&config.command)?;
    Ok(())
}

fn validate_datalake_config(config: &DatalakeConfig) -> Result<()> {
    if config.root.as_os_str().is_empty() {
        bail!(
            "Data lake root is required\n\n\
            How to fix:\n\
              • Environment: export {}DATALAKE_ROOT=/data/lake\n\
              • TOML: [datalake]\n              root = \"/data/lake\"",
            ENV_PREFIX
        );
    }

    if config.read_layout == ReadLayout::Dataset && config.dataset.is_none() {
        warn!("datalake.read_layout is 'dataset' but no default dataset is configured");
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    if config.name.is_empty() {
        bail!("logging.name must not be empty");
    }

    if config.level.parse::<tracing::Level>().is_err() {
        bail!(
            "Invalid logging.level '{}'. Supported: trace, debug, info, warn, error",
            config.level
        );
    }

    if !config.console && config.file.is_none() {
        warn!("logging.console is disabled and no logging.file is set; log output is discarded");
    }

    Ok(())
}

fn validate_command_config(config: &CommandConfig) -> Result<()> {
    if let Some(secs) = config.timeout_secs {
        if secs == 0 {
            bail!("command.timeout_secs must be greater than 0");
        }
        if secs > LONG_TIMEOUT_SECS {
            warn!(
                timeout_secs = secs,
                "command.timeout_secs is very large; was it meant in seconds?"
            );
        }
    }

    if config.stop_keywords.iter().any(|k| k.is_empty()) {
        bail!("command.stop_keywords must not contain empty strings (they match every line)");
    }

    Ok(())
}
