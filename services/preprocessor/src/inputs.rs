//! Loading the gridded inputs from disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use graph_preprocessing::{HighResNodes, PreprocessError};
use ndarray::{Array1, Array2};
use ndarray_npy::read_npy;
use tracing::info;

/// Locations of the input files.
#[derive(Debug, Clone)]
pub struct InputPaths {
    /// Directory holding `lon.npy`, `lat.npy` and `pr.npy`.
    pub precipitation_dir: PathBuf,
    pub elevation_file: PathBuf,
    pub time_index_file: PathBuf,
}

fn load_npy<T: ndarray_npy::ReadNpyExt>(path: &Path) -> Result<T> {
    read_npy(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load node coordinates, elevation and the `(time, node)` precipitation array.
pub fn load_nodes(paths: &InputPaths) -> Result<HighResNodes> {
    let dir = &paths.precipitation_dir;
    let lon: Array1<f64> = load_npy(&dir.join("lon.npy"))?;
    let lat: Array1<f64> = load_npy(&dir.join("lat.npy"))?;
    let pr: Array2<f32> = load_npy(&dir.join("pr.npy"))?;
    let elevation: Array1<f64> = load_npy(&paths.elevation_file)?;

    if pr.ncols() != lon.len() {
        return Err(PreprocessError::shape_mismatch("pr.npy nodes", lon.len(), pr.ncols()).into());
    }

    info!(
        nodes = lon.len(),
        times = pr.nrows(),
        dir = %dir.display(),
        "Loaded precipitation"
    );

    Ok(HighResNodes::from_time_major(lon, lat, elevation, pr)?)
}

/// Load the per-year lists of absolute time indices.
pub fn load_time_index(path: &Path) -> Result<Vec<Vec<usize>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read time index {}", path.display()))?;
    let years: Vec<Vec<usize>> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse time index {}", path.display()))?;
    info!(years = years.len(), path = %path.display(), "Loaded time index");
    Ok(years)
}
