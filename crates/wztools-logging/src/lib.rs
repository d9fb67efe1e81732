//! Named loggers with console and file sinks.
//!
//! Each logger owns its own `tracing` dispatch, so its output never reaches
//! another logger's sinks. Loggers live in a process-wide registry keyed by
//! name: asking for the same name twice hands back the same logger and never
//! attaches a second console or file sink.
//!
//! ```no_run
//! use wztools_logging::{get_logger, LoggerOptions};
//!
//! let log = get_logger(LoggerOptions::named("ingest").log_file("ingest.log"))?;
//! log.info("starting");
//! # Ok::<(), wztools_logging::LoggingError>(())
//! ```

mod error;
mod format;
mod logger;
mod registry;

pub use error::{LoggingError, Result};
pub use logger::{Logger, LoggerOptions};
pub use registry::{get_logger, logger, registry, LoggerRegistry};
pub use tracing::Level;

/// Name of the process-wide default logger
pub const DEFAULT_LOGGER_NAME: &str = "root";

/// Parse a level name (`trace`, `debug`, `info`, `warn`, `error`).
pub fn parse_level(level: &str) -> Result<Level> {
    level
        .parse::<Level>()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert!(matches!(
            parse_level("verbose"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }
}
