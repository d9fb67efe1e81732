//! Named logger handles.

use parking_lot::RwLock;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::prelude::*;

use crate::error::{LoggingError, Result};
use crate::format::{LineStyle, NamedFormat};

/// Options accepted by [`crate::get_logger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Logger identity; calls with the same name share one logger
    pub name: String,
    /// Append log lines to this file
    pub log_file: Option<PathBuf>,
    /// Write log lines to stderr
    pub add_console: bool,
    /// Minimum severity
    pub level: Level,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            name: crate::DEFAULT_LOGGER_NAME.to_string(),
            log_file: None,
            add_console: true,
            level: Level::INFO,
        }
    }
}

impl LoggerOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn console(mut self, add_console: bool) -> Self {
        self.add_console = add_console;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

/// An opened log file shared by every rebuild of a logger's dispatch.
#[derive(Debug, Clone)]
pub(crate) struct FileSink {
    path: PathBuf,
    file: Arc<File>,
}

impl FileSink {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggingError::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(file),
        })
    }
}

struct LoggerState {
    console: bool,
    file: Option<FileSink>,
    level: Level,
    dispatch: Dispatch,
}

struct LoggerInner {
    name: Arc<str>,
    state: RwLock<LoggerState>,
}

/// Handle to a named logger.
///
/// Clones share the same sinks. A logger never forwards events to any other
/// subscriber: it owns its dispatch.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("console", &state.console)
            .field("file", &state.file.as_ref().map(|s| &s.path))
            .field("level", &state.level)
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(name: &str, console: bool, file: Option<FileSink>, level: Level) -> Self {
        let name: Arc<str> = Arc::from(name);
        let dispatch = build_dispatch(&name, console, file.as_ref(), level);
        Self {
            inner: Arc::new(LoggerInner {
                name,
                state: RwLock::new(LoggerState {
                    console,
                    file,
                    level,
                    dispatch,
                }),
            }),
        }
    }

    /// Attach missing sinks and update the level. Returns true if anything changed.
    ///
    /// At most one console sink and one file sink are ever attached; a second
    /// file path is ignored.
    pub(crate) fn reconfigure(&self, add_console: bool, file: Option<FileSink>, level: Level) -> bool {
        let mut state = self.inner.state.write();
        let mut changed = false;

        if add_console && !state.console {
            state.console = true;
            changed = true;
        }
        if state.file.is_none() {
            if let Some(sink) = file {
                state.file = Some(sink);
                changed = true;
            }
        }
        if state.level != level {
            state.level = level;
            changed = true;
        }

        if changed {
            state.dispatch = build_dispatch(&self.inner.name, state.console, state.file.as_ref(), level);
        }
        changed
    }

    pub(crate) fn has_file(&self) -> bool {
        self.inner.state.read().file.is_some()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn level(&self) -> Level {
        self.inner.state.read().level
    }

    pub fn has_console(&self) -> bool {
        self.inner.state.read().console
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.inner.state.read().file.as_ref().map(|s| s.path.clone())
    }

    /// The dispatch currently backing this logger.
    pub fn dispatch(&self) -> Dispatch {
        self.inner.state.read().dispatch.clone()
    }

    /// Run `f` with this logger as the thread's default subscriber, so plain
    /// `tracing` macros inside `f` land in this logger's sinks.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch(), f)
    }

    /// Install this logger as the process-wide default subscriber.
    ///
    /// Returns false if a global subscriber was already set. Later
    /// reconfiguration of this logger does not affect the installed copy.
    pub fn install_global(&self) -> bool {
        tracing::dispatcher::set_global_default(self.dispatch()).is_ok()
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        level <= self.level()
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.in_scope(|| match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            _ => tracing::trace!("{}", message),
        });
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::WARN, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, message);
    }
}

fn build_dispatch(name: &Arc<str>, console: bool, file: Option<&FileSink>, level: Level) -> Dispatch {
    // stdout is left to callers (CLI output, subprocess echo)
    let console_layer = console.then(|| {
        tracing_fmt::layer()
            .event_format(NamedFormat::new(name.clone(), LineStyle::Console))
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
    });

    let file_layer = file.map(|sink| {
        tracing_fmt::layer()
            .event_format(NamedFormat::new(name.clone(), LineStyle::File))
            .with_ansi(false)
            .with_writer(sink.file.clone())
    });

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(console_layer)
        .with(file_layer);

    Dispatch::new(subscriber)
}
