//! Common types shared by the precipitation graph preprocessing crates.
//!
//! - [`BoundingBox`]: a lon/lat rectangle used for window cutting and cell extents
//! - [`LowResGrid`]: the regular low-resolution analysis grid laid over the
//!   irregular high-resolution nodes
//! - [`TimeSplit`]: the train/test partition of absolute time-step indices

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{CommonError, CommonResult};
pub use grid::{CellCoord, LowResGrid};
pub use time::{split_by_years, TimeSplit, YearSplitParams};
