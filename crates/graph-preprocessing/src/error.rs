//! Error types for graph preprocessing.

use std::path::PathBuf;

use precip_common::CommonError;
use thiserror::Error;

/// Errors that can occur while preprocessing graphs and targets.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// Arrays that must be aligned have different shapes.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reference statistics required by the standardization mode are missing.
    #[error("reference statistics not available: {0}")]
    MissingReferenceStats(String),

    /// A feature has zero spread and cannot be standardized.
    #[error("cannot standardize {0}: standard deviation is zero or undefined")]
    DegenerateStatistics(String),

    /// A requested time step is beyond the precipitation series.
    #[error("time step {requested} is outside the precipitation series of {available} steps")]
    TimeRangeExceeded { requested: usize, available: usize },

    /// Filesystem error while reading or writing an artifact.
    #[error("artifact I/O error on {path}: {source}")]
    ArtifactIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// NumPy array encoding/decoding error.
    #[error("npy error on {path}: {message}")]
    Npy { path: PathBuf, message: String },

    /// Graph encoding/decoding error.
    #[error("graph encoding error on {path}: {message}")]
    GraphEncoding { path: PathBuf, message: String },

    /// Grid, window or time split definition error.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl PreprocessError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl std::fmt::Debug,
        actual: impl std::fmt::Debug,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an ArtifactIo error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    /// Create an Npy error.
    pub fn npy(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Npy {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessError>;
