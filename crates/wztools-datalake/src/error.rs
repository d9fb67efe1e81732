//! Error types for datalake path operations.

use chrono::NaiveDateTime;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E101: Partition directory could not be created
    E101CreateDir,
    /// E102: No data file exists in the requested range
    E102NoFilesFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E101CreateDir => "E101",
            Self::E102NoFilesFound => "E102",
        }
    }
}

/// Errors that can occur while building or resolving data file paths
#[derive(Debug, Error)]
pub enum DatalakeError {
    /// Partition directory creation failed (permissions, invalid path)
    #[error("[{code}] Failed to create partition directory '{}': {source}", path.display())]
    CreateDir {
        code: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The range scan found nothing on disk
    #[error("[{code}] No files found for key '{special_key}' under '{}' between {start} and {end}", root.display())]
    NoFilesFound {
        code: &'static str,
        root: PathBuf,
        special_key: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl DatalakeError {
    /// Create a directory creation error with error code
    pub fn create_dir(path: PathBuf, source: std::io::Error) -> Self {
        Self::CreateDir {
            code: ErrorCode::E101CreateDir.as_str(),
            path,
            source,
        }
    }

    /// Create a "no files found" error with error code
    pub fn no_files_found(
        root: PathBuf,
        special_key: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self::NoFilesFound {
            code: ErrorCode::E102NoFilesFound.as_str(),
            root,
            special_key,
            start,
            end,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::CreateDir { .. } => ErrorCode::E101CreateDir,
            Self::NoFilesFound { .. } => ErrorCode::E102NoFilesFound,
        }
    }

    /// True for the "search yielded nothing" signal, as opposed to I/O failures.
    pub fn is_no_files_found(&self) -> bool {
        matches!(self, Self::NoFilesFound { .. })
    }
}

/// Result type alias for DatalakeError
pub type Result<T> = std::result::Result<T, DatalakeError>;
