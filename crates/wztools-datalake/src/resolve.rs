//! Range resolution: find the data files that exist for an hour range.
//!
//! The resolver regenerates the candidate path for every hour in
//! `[start, end]` and keeps the ones present on disk. It never creates
//! anything.

use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{DatalakeError, Result};
use crate::partition::{PartitionKey, PathLayout};

/// Iterator over `start, start + 1h, ...` while `<= end`.
///
/// Sub-hour components of `start` are kept as given.
#[derive(Debug, Clone)]
pub struct HourSteps {
    next: Option<NaiveDateTime>,
    end: NaiveDateTime,
}

impl Iterator for HourSteps {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|t| *t <= self.end)?;
        self.next = current.checked_add_signed(Duration::hours(1));
        Some(current)
    }
}

/// Hour steps from `start` to `end`, inclusive. Empty when `start > end`.
pub fn hours(start: NaiveDateTime, end: NaiveDateTime) -> HourSteps {
    HourSteps {
        next: Some(start),
        end,
    }
}

/// A range lookup over one dataset and special key.
#[derive(Debug, Clone)]
pub struct RangeQuery<'a> {
    root: &'a Path,
    dataset: &'a str,
    special_key: &'a str,
    layout: PathLayout,
}

impl<'a> RangeQuery<'a> {
    /// Query with the default [`PathLayout::Flat`] read layout.
    pub fn new(root: &'a Path, dataset: &'a str, special_key: &'a str) -> Self {
        Self {
            root,
            dataset,
            special_key,
            layout: PathLayout::default(),
        }
    }

    pub fn layout(mut self, layout: PathLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Hour slots scanned for `[start, end]`.
    pub fn hours(start: NaiveDateTime, end: NaiveDateTime) -> HourSteps {
        hours(start, end)
    }

    /// Every candidate path in the range, whether or not it exists.
    pub fn candidates(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<PathBuf> {
        let mut visited = HashSet::new();
        hours(start, end)
            .filter(|t| visited.insert(*t))
            .map(|t| {
                PartitionKey::from_timestamp(self.dataset, self.special_key, t)
                    .file_path(self.root, self.layout)
            })
            .collect()
    }

    /// Existing data files in the range, in ascending time order.
    ///
    /// Fails with [`DatalakeError::NoFilesFound`] when none exist.
    pub fn resolve(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Vec<PathBuf>> {
        let candidates = self.candidates(start, end);
        let scanned = candidates.len();

        let found: Vec<PathBuf> = candidates.into_iter().filter(|p| p.exists()).collect();

        tracing::debug!(
            dataset = self.dataset,
            special_key = self.special_key,
            layout = %self.layout,
            scanned,
            found = found.len(),
            "Resolved data paths"
        );

        if found.is_empty() {
            return Err(DatalakeError::no_files_found(
                self.root.to_path_buf(),
                self.special_key.to_string(),
                start,
                end,
            ));
        }
        Ok(found)
    }
}

/// Get the existing data files between `start` and `end` (both inclusive).
///
/// Paths are built without the dataset directory segment
/// (`{root}/{YYYY}/{MM}/{DD}/...`); use [`RangeQuery::layout`] to read the
/// layout written by [`crate::generate_data_path`].
pub fn get_data_paths(
    root: &Path,
    dataset: &str,
    special_key: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<PathBuf>> {
    RangeQuery::new(root, dataset, special_key).resolve(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_hours_inclusive() {
        let steps: Vec<_> = hours(at(5, 22, 0), at(6, 1, 0)).collect();
        assert_eq!(
            steps,
            vec![at(5, 22, 0), at(5, 23, 0), at(6, 0, 0), at(6, 1, 0)]
        );
    }

    #[test]
    fn test_hours_single_slot() {
        assert_eq!(hours(at(5, 7, 0), at(5, 7, 0)).count(), 1);
        assert_eq!(RangeQuery::hours(at(5, 7, 0), at(5, 7, 0)).count(), 1);
    }

    #[test]
    fn test_hours_reversed_range_is_empty() {
        assert_eq!(hours(at(5, 8, 0), at(5, 7, 0)).count(), 0);
    }

    #[test]
    fn test_hours_keeps_sub_hour_offset() {
        // 07:30 -> 08:30; 09:30 is past the end
        let steps: Vec<_> = hours(at(5, 7, 30), at(5, 9, 0)).collect();
        assert_eq!(steps, vec![at(5, 7, 30), at(5, 8, 30)]);
    }

    #[test]
    fn test_candidates_use_flat_layout_by_default() {
        let root = Path::new("/lake");
        let paths = RangeQuery::new(root, "tv1", "k").candidates(at(5, 7, 0), at(5, 8, 0));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/lake/2024/03/05/20240305_07_k.parquet"),
                PathBuf::from("/lake/2024/03/05/20240305_08_k.parquet"),
            ]
        );
    }

    #[test]
    fn test_resolve_filters_to_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let query = RangeQuery::new(tmp.path(), "tv1", "k");
        let all = query.candidates(at(5, 0, 0), at(5, 5, 0));
        touch(&all[1]);
        touch(&all[4]);

        let found = query.resolve(at(5, 0, 0), at(5, 5, 0)).unwrap();
        assert_eq!(found, vec![all[1].clone(), all[4].clone()]);
    }

    #[test]
    fn test_resolve_empty_range_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = get_data_paths(tmp.path(), "tv1", "k", at(5, 0, 0), at(5, 23, 0)).unwrap_err();
        assert!(err.is_no_files_found());
        assert_eq!(err.code().as_str(), "E102");
    }

    #[test]
    fn test_resolve_reversed_range_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let query = RangeQuery::new(tmp.path(), "tv1", "k");
        touch(&query.candidates(at(5, 7, 0), at(5, 7, 0))[0]);

        let err = query.resolve(at(5, 8, 0), at(5, 7, 0)).unwrap_err();
        assert!(err.is_no_files_found());
    }

    #[test]
    fn test_resolve_does_not_create_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let _ = get_data_paths(tmp.path(), "tv1", "k", at(5, 0, 0), at(5, 3, 0));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
