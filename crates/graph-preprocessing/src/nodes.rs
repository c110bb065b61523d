//! High-resolution node arrays.

use ndarray::{Array1, Array2, Axis};

use crate::error::{PreprocessError, Result};

/// Irregular high-resolution points with their precipitation series.
///
/// All arrays are aligned on the node axis. Precipitation is stored
/// node-major, shape `(n_nodes, n_times)`, and may contain NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct HighResNodes {
    pub lon: Array1<f64>,
    pub lat: Array1<f64>,
    pub elevation: Array1<f64>,
    pub precipitation: Array2<f32>,
}

impl HighResNodes {
    /// Bundle aligned node arrays, rejecting mismatched node counts.
    pub fn new(
        lon: Array1<f64>,
        lat: Array1<f64>,
        elevation: Array1<f64>,
        precipitation: Array2<f32>,
    ) -> Result<Self> {
        let n = lon.len();
        if lat.len() != n {
            return Err(PreprocessError::shape_mismatch("lat", n, lat.len()));
        }
        if elevation.len() != n {
            return Err(PreprocessError::shape_mismatch("elevation", n, elevation.len()));
        }
        if precipitation.nrows() != n {
            return Err(PreprocessError::shape_mismatch(
                "precipitation nodes",
                n,
                precipitation.nrows(),
            ));
        }

        Ok(Self {
            lon,
            lat,
            elevation,
            precipitation,
        })
    }

    /// Build from a precipitation array laid out `(time, node)`, as gridded
    /// datasets store it.
    pub fn from_time_major(
        lon: Array1<f64>,
        lat: Array1<f64>,
        elevation: Array1<f64>,
        precipitation: Array2<f32>,
    ) -> Result<Self> {
        let node_major = precipitation.reversed_axes().as_standard_layout().into_owned();
        Self::new(lon, lat, elevation, node_major)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }

    /// Number of time steps in the precipitation series.
    pub fn n_times(&self) -> usize {
        self.precipitation.ncols()
    }

    /// Whether a node has at least one non-NaN precipitation value.
    pub fn has_data(&self, node: usize) -> bool {
        self.precipitation.row(node).iter().any(|v| !v.is_nan())
    }

    /// Keep only the given nodes, in the given order.
    pub fn select(&self, nodes: &[usize]) -> Self {
        Self {
            lon: self.lon.select(Axis(0), nodes),
            lat: self.lat.select(Axis(0), nodes),
            elevation: self.elevation.select(Axis(0), nodes),
            precipitation: self.precipitation.select(Axis(0), nodes),
        }
    }
}
