use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring a logger
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to open log file '{}': {source}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid log level '{0}'. Supported: trace, debug, info, warn, error")]
    InvalidLevel(String),
}

pub type Result<T> = std::result::Result<T, LoggingError>;
