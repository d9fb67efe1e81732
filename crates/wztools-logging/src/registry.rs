//! Process-wide logger registry keyed by name.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::Result;
use crate::logger::{FileSink, Logger, LoggerOptions};

static REGISTRY: Lazy<LoggerRegistry> = Lazy::new(LoggerRegistry::new);

static DEFAULT_LOGGER: Lazy<Logger> = Lazy::new(|| {
    let options = LoggerOptions::default();
    REGISTRY.register(&options)
});

/// Name-keyed store of configured loggers.
///
/// A name is configured once; later requests for the same name return the
/// same handle, attaching only the sinks it does not have yet.
#[derive(Default)]
pub struct LoggerRegistry {
    loggers: Mutex<HashMap<String, Logger>>,
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the logger for `options.name`, creating or updating it.
    pub fn get_or_configure(&self, options: &LoggerOptions) -> Result<Logger> {
        let mut loggers = self.loggers.lock();

        let needs_file = loggers
            .get(&options.name)
            .map_or(true, |existing| !existing.has_file());
        let file = match (&options.log_file, needs_file) {
            (Some(path), true) => Some(FileSink::open(path)?),
            _ => None,
        };

        if let Some(existing) = loggers.get(&options.name) {
            if existing.reconfigure(options.add_console, file, options.level) {
                tracing::debug!(logger = %options.name, "Reconfigured logger");
            }
            return Ok(existing.clone());
        }

        let logger = Logger::new(&options.name, options.add_console, file, options.level);
        loggers.insert(options.name.clone(), logger.clone());
        Ok(logger)
    }

    /// Infallible registration for options without a file sink.
    fn register(&self, options: &LoggerOptions) -> Logger {
        let mut loggers = self.loggers.lock();
        loggers
            .entry(options.name.clone())
            .or_insert_with(|| Logger::new(&options.name, options.add_console, None, options.level))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Logger> {
        self.loggers.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.loggers.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.lock().is_empty()
    }
}

/// Get (or create) a named logger from the process-wide registry.
pub fn get_logger(options: LoggerOptions) -> Result<Logger> {
    REGISTRY.get_or_configure(&options)
}

/// The process-wide default logger (console only, INFO).
pub fn logger() -> Logger {
    DEFAULT_LOGGER.clone()
}

/// The process-wide registry.
pub fn registry() -> &'static LoggerRegistry {
    &REGISTRY
}
