//! Configuration for a preprocessing run.

use std::path::{Path, PathBuf};

use precip_common::{BoundingBox, LowResGrid, YearSplitParams};
use serde::{Deserialize, Serialize};

use crate::edges::EdgeThresholds;
use crate::error::{PreprocessError, Result};
use crate::standardize::StandardizationMode;

/// Configuration for the preprocessing pipeline.
///
/// Every field has a default, so a YAML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Western window bound (degrees).
    pub lon_min: f64,
    /// Eastern window bound (degrees).
    pub lon_max: f64,
    /// Southern window bound (degrees).
    pub lat_min: f64,
    /// Northern window bound (degrees).
    pub lat_max: f64,

    /// Low-resolution grid spacing (degrees).
    pub interval: f64,

    /// Padding added around a cell to build its 9-cell membership (degrees).
    pub offset_9_cells: f64,

    /// Expected number of time steps in the precipitation series, if known.
    pub time_dim: Option<usize>,

    /// Precipitation (mm) at or above which a node counts as raining.
    pub precipitation_threshold: f32,

    /// Maximum lon/lat offsets for two nodes to share an edge.
    #[serde(flatten)]
    pub edges: EdgeThresholds,

    /// Log progress every this many cells.
    pub progress_every: usize,

    /// Tag appended to the mask and graph artifact names.
    pub suffix: String,

    /// Directory receiving the artifacts.
    pub output_path: PathBuf,

    /// Where the lon/lat/elevation statistics come from.
    pub standardization: StandardizationMode,

    /// `(lat, lon, elevation)` reference table, required in reference mode.
    pub reference_stats_path: Option<PathBuf>,

    /// Calendar-year train/test split.
    pub time_split: YearSplitParams,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            lon_min: 6.50,
            lon_max: 14.25,
            lat_min: 43.50,
            lat_max: 47.50,
            interval: 0.25,
            offset_9_cells: 0.25,
            time_dim: None,
            precipitation_threshold: 0.1,
            edges: EdgeThresholds::default(),
            progress_every: 10,
            suffix: String::new(),
            output_path: PathBuf::from("."),
            standardization: StandardizationMode::Reference,
            reference_stats_path: None,
            time_split: YearSplitParams::default(),
        }
    }
}

impl PreprocessConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PreprocessError::config(format!("invalid YAML: {e}")))
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PreprocessError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    /// The lon/lat window cut out of the full dataset.
    pub fn window(&self) -> BoundingBox {
        BoundingBox::new(self.lon_min, self.lat_min, self.lon_max, self.lat_max)
    }

    /// The low-resolution grid laid over the window.
    pub fn grid(&self) -> Result<LowResGrid> {
        Ok(LowResGrid::from_window(&self.window(), self.interval)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.window().validate()?;

        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(PreprocessError::config("interval must be > 0"));
        }

        if !(self.offset_9_cells.is_finite() && self.offset_9_cells >= 0.0) {
            return Err(PreprocessError::config("offset_9_cells must be >= 0"));
        }

        if !(self.precipitation_threshold.is_finite() && self.precipitation_threshold > 0.0) {
            return Err(PreprocessError::config("precipitation_threshold must be > 0"));
        }

        self.edges.validate()?;

        if self.progress_every == 0 {
            return Err(PreprocessError::config("progress_every must be > 0"));
        }

        if self.time_dim == Some(0) {
            return Err(PreprocessError::config("time_dim must be > 0 when set"));
        }

        self.time_split.validate()?;

        Ok(())
    }
}
