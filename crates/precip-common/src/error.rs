//! Error types for grid and time definitions.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

/// Errors raised while building grids, windows or time splits.
#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid grid definition: {0}")]
    InvalidGrid(String),

    #[error("Invalid time split: {0}")]
    InvalidTimeSplit(String),
}
