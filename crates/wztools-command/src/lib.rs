//! Shell command runner with streaming log capture.
//!
//! [`run_cmd`] launches a command, logs every stdout line at INFO and every
//! stderr line at WARN as it arrives, and returns the accumulated output. A
//! wall-clock timeout and a list of stop keywords can end the run early.
//! Failures never escape as errors: they are folded into the status code.

use std::path::PathBuf;
use std::time::Duration;

mod runner;

pub use runner::run_cmd;

/// Status code for launch, wait, read failures and timeouts
pub const STATUS_FAILED: i32 = -1;
/// Status code for a run terminated by a stop keyword
pub const STATUS_STOPPED: i32 = -2;

/// How to run a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    /// Working directory; the current one when `None`
    pub cwd: Option<PathBuf>,
    /// Run through the platform shell (`sh -c`); otherwise split on whitespace
    pub shell: bool,
    /// Kill the process once this much wall-clock time has passed
    pub timeout: Option<Duration>,
    /// Kill the process as soon as an output line contains one of these
    pub stop_keywords: Vec<String>,
}

impl Default for CommandOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            shell: true,
            timeout: None,
            stop_keywords: Vec::new(),
        }
    }
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn stop_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The process exited on its own (negative values are signal deaths)
    Exited(i32),
    /// The timeout expired and the process was killed
    TimedOut,
    /// An output line contained `keyword` and the process was killed
    Stopped { keyword: String },
    /// The process could not be launched, waited on, or read from
    Failed(String),
}

impl RunStatus {
    /// Integer status code: the exit code, or -1 / -2 for the sentinel outcomes.
    pub fn code(&self) -> i32 {
        match self {
            RunStatus::Exited(code) => *code,
            RunStatus::TimedOut | RunStatus::Failed(_) => STATUS_FAILED,
            RunStatus::Stopped { .. } => STATUS_STOPPED,
        }
    }
}

/// Result of [`run_cmd`]: status plus everything read from both streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn code(&self) -> i32 {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status == RunStatus::Exited(0)
    }

    /// `(status_code, stdout, stderr)`
    pub fn into_parts(self) -> (i32, String, String) {
        (self.status.code(), self.stdout, self.stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RunStatus::Exited(0).code(), 0);
        assert_eq!(RunStatus::Exited(3).code(), 3);
        assert_eq!(RunStatus::TimedOut.code(), STATUS_FAILED);
        assert_eq!(RunStatus::Failed("boom".into()).code(), STATUS_FAILED);
        assert_eq!(
            RunStatus::Stopped {
                keyword: "STOP".into()
            }
            .code(),
            STATUS_STOPPED
        );
    }

    #[test]
    fn test_options_builder() {
        let options = CommandOptions::new()
            .cwd("/tmp")
            .timeout(Duration::from_secs(5))
            .stop_keywords(["STOP", "FATAL"]);
        assert!(options.shell);
        assert_eq!(options.cwd, Some(PathBuf::from("/tmp")));
        assert_eq!(options.stop_keywords, vec!["STOP", "FATAL"]);
    }
}
