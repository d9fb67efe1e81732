// wztools - utilities for time-partitioned Parquet data lakes and analysis scripts
//
// Re-exports the member crates and holds the glue the CLI needs:
// timestamp parsing, layout mapping and logger setup from config.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

pub use wztools_command as command;
pub use wztools_config as config;
pub use wztools_datalake as datalake;
pub use wztools_logging as logging;
pub use wztools_utils as utils;

use wztools_config::{LoggingConfig, ReadLayout};
use wztools_datalake::PathLayout;
use wztools_logging::{Logger, LoggerOptions};

/// Accepted timestamp formats, tried in order
const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse `YYYY-mm-ddTHH:MM[:SS]` (a space may replace the `T`).
pub fn parse_time(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .with_context(|| {
            format!(
                "Invalid timestamp '{}'. Expected YYYY-mm-ddTHH:MM[:SS]",
                value
            )
        })
}

/// Parse a `LON,LAT` pair.
pub fn parse_point(value: &str) -> Result<(f64, f64)> {
    let (lon, lat) = value
        .split_once(',')
        .with_context(|| format!("Invalid point '{}'. Expected LON,LAT", value))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid longitude in '{}'", value))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid latitude in '{}'", value))?;
    anyhow::ensure!(
        lon.is_finite() && lat.is_finite(),
        "Invalid point '{}': coordinates must be finite",
        value
    );
    Ok((lon, lat))
}

/// Reject empty stop keywords; an empty keyword matches every line.
pub fn check_stop_keywords(keywords: &[String]) -> Result<()> {
    anyhow::ensure!(
        keywords.iter().all(|keyword| !keyword.is_empty()),
        "Stop keywords must not be empty (they match every line)"
    );
    Ok(())
}

pub fn path_layout(layout: ReadLayout) -> PathLayout {
    match layout {
        ReadLayout::Flat => PathLayout::Flat,
        ReadLayout::Dataset => PathLayout::Dataset,
    }
}

/// Map a run status code onto a process exit code.
///
/// The negative sentinels become 1 (failure or timeout) and 2 (stopped by
/// keyword); other negative codes (signal deaths) become 1.
pub fn exit_code(status: i32) -> u8 {
    match status {
        wztools_command::STATUS_STOPPED => 2,
        0..=255 => status as u8,
        _ => 1,
    }
}

/// Build the named logger described by `[logging]`, with an optional level
/// override, and install it as the global subscriber.
pub fn init_logging(config: &LoggingConfig, level_override: Option<&str>) -> Result<Logger> {
    let level = wztools_logging::parse_level(level_override.unwrap_or(&config.level))?;

    let mut options = LoggerOptions::named(&config.name)
        .console(config.console)
        .level(level);
    if let Some(file) = &config.file {
        options = options.log_file(file);
    }

    let logger = wztools_logging::get_logger(options)
        .with_context(|| format!("Failed to initialize logger '{}'", config.name))?;
    if !logger.install_global() {
        tracing::debug!("Global subscriber already set, keeping existing one");
    }
    Ok(logger)
}
