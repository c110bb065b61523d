//! Standardization of node coordinates and elevation.

use std::path::Path;

use ndarray::{Array2, ArrayView1};
use ndarray_npy::read_npy;
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::nodes::HighResNodes;

/// Where standardization statistics come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardizationMode {
    /// Precomputed statistics shared across regions and runs.
    #[default]
    Reference,
    /// Statistics of the current filtered nodes.
    Local,
}

impl StandardizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for StandardizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mean and population standard deviation of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStats {
    pub mean: f64,
    pub std: f64,
}

impl AxisStats {
    fn of(values: ArrayView1<f64>, feature: &str) -> Result<Self> {
        let mean = values
            .mean()
            .ok_or_else(|| PreprocessError::DegenerateStatistics(format!("{feature} (no values)")))?;
        let std = values.std(0.0);
        if !(std.is_finite() && std > 0.0) {
            return Err(PreprocessError::DegenerateStatistics(feature.to_string()));
        }
        Ok(Self { mean, std })
    }

    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Statistics for the three node features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub lon: AxisStats,
    pub lat: AxisStats,
    pub elevation: AxisStats,
}

impl FeatureStats {
    /// Statistics of a reference table whose columns are `(lat, lon, elevation)`.
    pub fn from_reference_table(table: &Array2<f64>) -> Result<Self> {
        if table.ncols() != 3 {
            return Err(PreprocessError::shape_mismatch(
                "reference statistics columns",
                3,
                table.ncols(),
            ));
        }
        Ok(Self {
            lat: AxisStats::of(table.column(0), "reference latitude")?,
            lon: AxisStats::of(table.column(1), "reference longitude")?,
            elevation: AxisStats::of(table.column(2), "reference elevation")?,
        })
    }

    /// Statistics of the nodes themselves.
    pub fn from_nodes(nodes: &HighResNodes) -> Result<Self> {
        Ok(Self {
            lon: AxisStats::of(nodes.lon.view(), "longitude")?,
            lat: AxisStats::of(nodes.lat.view(), "latitude")?,
            elevation: AxisStats::of(nodes.elevation.view(), "elevation")?,
        })
    }

    /// Statistics that leave values unchanged.
    pub fn identity() -> Self {
        let unit = AxisStats { mean: 0.0, std: 1.0 };
        Self {
            lon: unit,
            lat: unit,
            elevation: unit,
        }
    }

    /// Standardized feature matrix, shape `(n_nodes, 3)`, columns `(lon, lat, elevation)`.
    pub fn standardize(&self, nodes: &HighResNodes) -> Array2<f64> {
        let mut x = Array2::zeros((nodes.len(), 3));
        x.column_mut(0).assign(&nodes.lon.mapv(|v| self.lon.apply(v)));
        x.column_mut(1).assign(&nodes.lat.mapv(|v| self.lat.apply(v)));
        x.column_mut(2)
            .assign(&nodes.elevation.mapv(|v| self.elevation.apply(v)));
        x
    }
}

/// Load a `(lat, lon, elevation)` reference table stored as `.npy`.
pub fn load_reference_table(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PreprocessError::MissingReferenceStats(format!(
            "{} does not exist",
            path.display()
        )));
    }
    read_npy(path).map_err(|e| PreprocessError::npy(path, e))
}

/// `(lon, lat)` pairs, shape `(n_nodes, 2)`.
pub fn positions(nodes: &HighResNodes) -> Array2<f64> {
    let mut pos = Array2::zeros((nodes.len(), 2));
    pos.column_mut(0).assign(&nodes.lon);
    pos.column_mut(1).assign(&nodes.lat);
    pos
}
