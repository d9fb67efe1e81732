//! Small standalone helpers: error reports, nearest-point lookup and
//! dual-row time axis ticks.

pub mod debug;
pub mod spatial;
pub mod time_axis;

pub use debug::{error_info, format_error, is_system_frame, parse_backtrace, ErrorReport, Frame};
pub use spatial::{fetch_nearest_point, NearestPointIndex, SpatialError};
pub use time_axis::{AxisOptions, DualAxisTicks, DualTimeAxis, Tick, TimeAxisError};
