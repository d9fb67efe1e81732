//! Generic TOML file loading.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a TOML file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing or unreadable
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML (or does not match the target type)
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Load a TOML file fully into a generic table.
pub fn load_toml(path: impl AsRef<Path>) -> Result<toml::Table, ConfigError> {
    load_toml_as(path)
}

/// Load a TOML file into any deserializable type.
pub fn load_toml_as<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
