//! Common test fixtures for precipitation preprocessing tests.
//!
//! This module provides pre-defined windows, time layouts and small
//! scenarios that come up repeatedly in the test suite.

use std::path::Path;

use ndarray::array;
use ndarray_npy::write_npy;

use crate::generators::NodeCloud;

/// Common window definitions as `(lon_min, lat_min, lon_max, lat_max)`.
pub mod window {
    /// 2 x 2 unit cells at the origin
    pub const UNIT_2X2: (f64, f64, f64, f64) = (0.0, 0.0, 2.0, 2.0);

    /// 5 x 5 cells of 0.25 degrees, large enough to have interior cells
    pub const SMALL_5X5: (f64, f64, f64, f64) = (10.0, 45.0, 11.25, 46.25);
}

/// Per-year time index layouts.
pub mod time {
    /// Contiguous absolute indices, one list per year, with the given lengths.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::fixtures::time::yearly_indices;
    ///
    /// let years = yearly_indices(&[3, 2]);
    /// assert_eq!(years, vec![vec![0, 1, 2], vec![3, 4]]);
    /// ```
    pub fn yearly_indices(lengths: &[usize]) -> Vec<Vec<usize>> {
        let mut start = 0;
        lengths
            .iter()
            .map(|&len| {
                let year: Vec<usize> = (start..start + len).collect();
                start += len;
                year
            })
            .collect()
    }
}

/// The four-node scenario: one node at the centre of each cell of a 2 x 2
/// grid with unit cells, each with precipitation `[0.05, 0.2]`.
pub fn four_node_scenario() -> NodeCloud {
    NodeCloud {
        lon: array![0.5, 1.5, 0.5, 1.5],
        lat: array![0.5, 0.5, 1.5, 1.5],
        elevation: array![100.0, 200.0, 300.0, 400.0],
        precipitation: array![[0.05, 0.2], [0.05, 0.2], [0.05, 0.2], [0.05, 0.2]],
    }
}

/// Write a node cloud in the on-disk layout the preprocessor binary reads:
/// `lon.npy`, `lat.npy`, `pr.npy` (time-major) in `precipitation_dir`,
/// `elevation.npy` and `time_index.json` next to it.
pub fn write_input_files(
    dir: &Path,
    cloud: &NodeCloud,
    years: &[Vec<usize>],
) -> std::io::Result<InputFiles> {
    let files = InputFiles::in_dir(dir);
    std::fs::create_dir_all(&files.precipitation_dir)?;

    let to_io = |e: ndarray_npy::WriteNpyError| std::io::Error::new(std::io::ErrorKind::Other, e);
    write_npy(files.precipitation_dir.join("lon.npy"), &cloud.lon).map_err(to_io)?;
    write_npy(files.precipitation_dir.join("lat.npy"), &cloud.lat).map_err(to_io)?;
    write_npy(files.precipitation_dir.join("pr.npy"), &cloud.time_major()).map_err(to_io)?;
    write_npy(&files.elevation_file, &cloud.elevation).map_err(to_io)?;

    let json = serde_json::to_string(years)?;
    std::fs::write(&files.time_index_file, json)?;
    Ok(files)
}

/// Write a `(lat, lon, elevation)` reference table built from a cloud.
pub fn write_reference_table(path: &Path, cloud: &NodeCloud) -> std::io::Result<()> {
    let n = cloud.len();
    let mut table = ndarray::Array2::<f64>::zeros((n, 3));
    table.column_mut(0).assign(&cloud.lat);
    table.column_mut(1).assign(&cloud.lon);
    table.column_mut(2).assign(&cloud.elevation);
    write_npy(path, &table).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Paths produced by [`write_input_files`].
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub precipitation_dir: std::path::PathBuf,
    pub elevation_file: std::path::PathBuf,
    pub time_index_file: std::path::PathBuf,
}

impl InputFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            precipitation_dir: dir.join("precipitation"),
            elevation_file: dir.join("elevation.npy"),
            time_index_file: dir.join("time_index.json"),
        }
    }
}
