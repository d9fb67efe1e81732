//! Partition path generation for time-based organization
//!
//! Generates hour-partitioned paths:
//! {root}/{dataset}/{YYYY}/{MM}/{DD}/{YYYYMMDD}_{HH}_{special_key}.parquet

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{DatalakeError, Result};

/// File extension of every data file in the lake
pub const DATA_FILE_EXTENSION: &str = "parquet";

/// Whether the dataset-name directory segment is part of a partition path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PathLayout {
    /// `{root}/{YYYY}/{MM}/{DD}/...` (what the range resolver reads by default)
    #[default]
    Flat,
    /// `{root}/{dataset}/{YYYY}/{MM}/{DD}/...` (what the path builder writes)
    Dataset,
}

impl fmt::Display for PathLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathLayout::Flat => write!(f, "flat"),
            PathLayout::Dataset => write!(f, "dataset"),
        }
    }
}

impl FromStr for PathLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(PathLayout::Flat),
            "dataset" => Ok(PathLayout::Dataset),
            other => Err(format!(
                "Unsupported path layout: {}. Supported: flat, dataset",
                other
            )),
        }
    }
}

/// Identifies one file slot: a dataset, an hour, and a special key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub dataset: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub special_key: String,
}

impl PartitionKey {
    /// Derive the slot containing `time`. Minutes and seconds are dropped.
    pub fn from_timestamp(dataset: &str, special_key: &str, time: NaiveDateTime) -> Self {
        Self {
            dataset: dataset.to_string(),
            year: time.year(),
            month: time.month(),
            day: time.day(),
            hour: time.hour(),
            special_key: special_key.to_string(),
        }
    }

    /// `{YYYYMMDD}_{HH}_{special_key}.parquet`
    pub fn file_name(&self) -> String {
        format!(
            "{:04}{:02}{:02}_{:02}_{}.{}",
            self.year, self.month, self.day, self.hour, self.special_key, DATA_FILE_EXTENSION
        )
    }

    /// Partition directory under `root` for the given layout.
    pub fn partition_dir(&self, root: &Path, layout: PathLayout) -> PathBuf {
        let mut dir = root.to_path_buf();
        if layout == PathLayout::Dataset {
            dir.push(&self.dataset);
        }
        dir.push(self.year.to_string());
        dir.push(format!("{:02}", self.month));
        dir.push(format!("{:02}", self.day));
        dir
    }

    pub fn file_path(&self, root: &Path, layout: PathLayout) -> PathBuf {
        self.partition_dir(root, layout).join(self.file_name())
    }
}

/// Compute a data file path without touching the filesystem.
pub fn data_path(
    root: &Path,
    dataset: &str,
    special_key: &str,
    time: NaiveDateTime,
    layout: PathLayout,
) -> PathBuf {
    PartitionKey::from_timestamp(dataset, special_key, time).file_path(root, layout)
}

/// Generate the storage path for the data file holding `time`.
///
/// Creates `{root}/{dataset}/{YYYY}/{MM}/{DD}` (and any missing ancestors) on
/// every call; the file itself is left for the caller to write.
pub fn generate_data_path(
    root: &Path,
    dataset: &str,
    special_key: &str,
    time: NaiveDateTime,
) -> Result<PathBuf> {
    let key = PartitionKey::from_timestamp(dataset, special_key, time);
    let dir = key.partition_dir(root, PathLayout::Dataset);

    std::fs::create_dir_all(&dir).map_err(|e| DatalakeError::create_dir(dir.clone(), e))?;

    let path = dir.join(key.file_name());
    tracing::debug!("Generated data path: {}", path.display());
    Ok(path)
}
