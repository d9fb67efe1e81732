//! Tick placement for a two-row time axis: hours on the top row, dates on
//! the row below, each date labeled only where it first appears.
//!
//! Only positions and labels are computed; drawing is left to the renderer.

use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDateTime, Timelike};
use thiserror::Error;

/// Candidate hour intervals, tried in order against the first sample's hour
const DEFAULT_INTERVALS: [usize; 4] = [2, 3, 5, 7];
/// Vertical gap between the rows, relative to the hour font size
const DATE_ROW_GAP: f64 = 1.5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeAxisError {
    #[error("Invalid date format '{0}'")]
    InvalidDateFormat(String),
}

/// Reject formats chrono cannot render; formatting them would panic.
fn check_format(format: &str) -> Result<(), TimeAxisError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(TimeAxisError::InvalidDateFormat(format.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisOptions {
    pub hour_fontsize: f64,
    pub date_fontsize: f64,
    /// Label every n-th sample; derived from the first sample when `None`
    pub hour_interval: Option<usize>,
    pub rotation: f64,
    pub date_format: String,
}

impl Default for AxisOptions {
    fn default() -> Self {
        Self {
            hour_fontsize: 10.0,
            date_fontsize: 12.0,
            hour_interval: None,
            rotation: 0.0,
            date_format: "%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub time: NaiveDateTime,
    pub label: String,
}

impl Tick {
    fn new(time: NaiveDateTime, format: &str) -> Self {
        Self {
            time,
            label: time.format(format).to_string(),
        }
    }
}

/// Ticks and styling for both rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DualAxisTicks {
    /// Top row, sorted by time
    pub hour_ticks: Vec<Tick>,
    /// Bottom row, one tick per distinct date
    pub date_ticks: Vec<Tick>,
    pub hour_fontsize: f64,
    pub date_fontsize: f64,
    pub rotation: f64,
    /// Outward offset of the date row from the main axis
    pub date_row_offset: f64,
}

pub struct DualTimeAxis;

impl DualTimeAxis {
    pub fn compute(
        times: &[NaiveDateTime],
        options: &AxisOptions,
    ) -> Result<DualAxisTicks, TimeAxisError> {
        check_format(&options.date_format)?;

        let mut hour_ticks = Vec::new();
        let mut date_ticks: Vec<Tick> = Vec::new();

        if let Some(first) = times.first() {
            let interval = options
                .hour_interval
                .unwrap_or_else(|| default_interval(first.hour()))
                .max(1);

            hour_ticks = times
                .iter()
                .step_by(interval)
                .map(|t| Tick::new(*t, "%H"))
                .collect();

            for &time in times {
                let date = Tick::new(time, &options.date_format);
                if date_ticks.iter().any(|d| d.label == date.label) {
                    continue;
                }
                date_ticks.push(date);

                if !hour_ticks.iter().any(|h| h.time == time) {
                    hour_ticks.push(Tick::new(time, "%H"));
                    // Neighbouring hour labels would overlap the new one
                    let before = time - Duration::hours(1);
                    let after = time + Duration::hours(1);
                    hour_ticks.retain(|h| h.time != before && h.time != after);
                }
            }

            hour_ticks.sort_by_key(|tick| tick.time);
        }

        Ok(DualAxisTicks {
            hour_ticks,
            date_ticks,
            hour_fontsize: options.hour_fontsize,
            date_fontsize: options.date_fontsize,
            rotation: options.rotation,
            date_row_offset: options.hour_fontsize * DATE_ROW_GAP,
        })
    }
}

fn default_interval(hour: u32) -> usize {
    DEFAULT_INTERVALS
        .into_iter()
        .find(|i| hour as usize % i == 0)
        .unwrap_or(1)
}
