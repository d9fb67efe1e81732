//! Time-partitioned data lake layout.
//!
//! One Parquet file per (dataset, hour, special key), stored under
//! `{root}/{dataset}/{YYYY}/{MM}/{DD}/{YYYYMMDD}_{HH}_{special_key}.parquet`.
//! The filesystem is the only index: a slot "exists" when its file does.

mod error;
mod partition;
mod resolve;

pub use error::{DatalakeError, ErrorCode, Result};
pub use partition::{
    data_path, generate_data_path, PartitionKey, PathLayout, DATA_FILE_EXTENSION,
};
pub use resolve::{get_data_paths, hours, HourSteps, RangeQuery};
