//! The regular low-resolution grid laid over the high-resolution nodes.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::BoundingBox;

/// Row/column position of a low-resolution cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    pub lat_idx: usize,
    pub lon_idx: usize,
}

/// Specification of the low-resolution lon/lat grid.
///
/// Cell origins (lower-left corners) follow `arange(min, max, interval)` on
/// each axis. Cells are numbered row-major: `lat_idx * lon_dim + lon_idx`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowResGrid {
    /// Longitude of the first cell origin
    pub lon_min: f64,
    /// Latitude of the first cell origin
    pub lat_min: f64,
    /// Cell size in degrees on both axes
    pub interval: f64,
    /// Number of cells along longitude
    pub lon_dim: usize,
    /// Number of cells along latitude
    pub lat_dim: usize,
}

impl LowResGrid {
    /// Lay a grid of `interval`-sized cells over a window.
    pub fn from_window(window: &BoundingBox, interval: f64) -> CommonResult<Self> {
        window.validate()?;
        if !(interval.is_finite() && interval > 0.0) {
            return Err(CommonError::InvalidGrid(format!(
                "interval must be a positive number, got {interval}"
            )));
        }

        Ok(Self {
            lon_min: window.lon_min,
            lat_min: window.lat_min,
            interval,
            lon_dim: arange_len(window.lon_min, window.lon_max, interval),
            lat_dim: arange_len(window.lat_min, window.lat_max, interval),
        })
    }

    /// Total number of cells (`space_low_res_dim`).
    pub fn len(&self) -> usize {
        self.lon_dim * self.lat_dim
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.lon_dim == 0 || self.lat_dim == 0
    }

    /// Row-major cell index of a grid position.
    pub fn cell_index(&self, lat_idx: usize, lon_idx: usize) -> usize {
        lat_idx * self.lon_dim + lon_idx
    }

    /// Grid position of a cell index.
    pub fn coord(&self, cell: usize) -> CellCoord {
        CellCoord {
            lat_idx: cell / self.lon_dim,
            lon_idx: cell % self.lon_dim,
        }
    }

    /// Longitude of the lower-left corner of column `lon_idx`.
    pub fn lon_origin(&self, lon_idx: usize) -> f64 {
        self.lon_min + lon_idx as f64 * self.interval
    }

    /// Latitude of the lower-left corner of row `lat_idx`.
    pub fn lat_origin(&self, lat_idx: usize) -> f64 {
        self.lat_min + lat_idx as f64 * self.interval
    }

    /// Closed extent of a single cell.
    pub fn cell_bbox(&self, cell: usize) -> BoundingBox {
        let c = self.coord(cell);
        let lon = self.lon_origin(c.lon_idx);
        let lat = self.lat_origin(c.lat_idx);
        BoundingBox::new(lon, lat, lon + self.interval, lat + self.interval)
    }

    /// Closed extent covered by the whole grid.
    pub fn extent(&self) -> BoundingBox {
        BoundingBox::new(
            self.lon_min,
            self.lat_min,
            self.lon_origin(self.lon_dim),
            self.lat_origin(self.lat_dim),
        )
    }

    /// A cell is interior when it has a full 8-neighbourhood.
    pub fn is_interior(&self, cell: usize) -> bool {
        let c = self.coord(cell);
        c.lat_idx >= 1
            && c.lon_idx >= 1
            && c.lat_idx + 1 < self.lat_dim
            && c.lon_idx + 1 < self.lon_dim
    }

    /// All interior cells, ascending.
    pub fn interior_cells(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&cell| self.is_interior(cell))
    }

    /// The 3x3 block centred on `cell`, clipped to the grid, in row-major order.
    pub fn neighbourhood(&self, cell: usize) -> Vec<usize> {
        self.block(cell, 1)
    }

    /// The (2r+1)x(2r+1) block centred on `cell`, clipped to the grid.
    pub fn block(&self, cell: usize, radius: usize) -> Vec<usize> {
        let c = self.coord(cell);
        let lat_lo = c.lat_idx.saturating_sub(radius);
        let lon_lo = c.lon_idx.saturating_sub(radius);
        let lat_hi = (c.lat_idx + radius).min(self.lat_dim - 1);
        let lon_hi = (c.lon_idx + radius).min(self.lon_dim - 1);

        let mut cells = Vec::with_capacity((lat_hi - lat_lo + 1) * (lon_hi - lon_lo + 1));
        for lat_idx in lat_lo..=lat_hi {
            for lon_idx in lon_lo..=lon_hi {
                cells.push(self.cell_index(lat_idx, lon_idx));
            }
        }
        cells
    }

    /// The cell owning a point.
    ///
    /// Cells are closed below and open above, except the last row and column
    /// which are also closed above so the grid extent is covered without gaps.
    /// Returns `None` for points outside the extent (or NaN coordinates).
    pub fn home_cell(&self, lon: f64, lat: f64) -> Option<usize> {
        let lon_idx = axis_index(self.lon_min, self.interval, self.lon_dim, lon)?;
        let lat_idx = axis_index(self.lat_min, self.interval, self.lat_dim, lat)?;
        Some(self.cell_index(lat_idx, lon_idx))
    }
}

/// Number of values produced by `arange(start, stop, step)`.
fn arange_len(start: f64, stop: f64, step: f64) -> usize {
    ((stop - start) / step).ceil().max(0.0) as usize
}

/// Column (or row) owning `value` on one axis, compared against the exact
/// origins `min + k * interval` so boundary points agree with the cell extents.
fn axis_index(min: f64, interval: f64, dim: usize, value: f64) -> Option<usize> {
    if dim == 0 || !(value >= min) {
        return None;
    }
    let origin = |k: usize| min + k as f64 * interval;

    let mut k = (((value - min) / interval).floor() as usize).min(dim - 1);
    while k > 0 && value < origin(k) {
        k -= 1;
    }
    while k + 1 < dim && value >= origin(k + 1) {
        k += 1;
    }

    if k == dim - 1 && value > origin(k) + interval {
        return None;
    }
    Some(k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn italy() -> LowResGrid {
        LowResGrid::from_window(&BoundingBox::new(6.5, 43.5, 14.25, 47.5), 0.25).unwrap()
    }

    #[test]
    fn test_grid_dimensions_follow_arange() {
        let grid = italy();
        assert_eq!(grid.lon_dim, 31);
        assert_eq!(grid.lat_dim, 16);
        assert_eq!(grid.len(), 496);
    }

    #[test]
    fn test_partial_last_cell_is_counted() {
        let grid = LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 2.5, 1.0), 1.0).unwrap();
        assert_eq!(grid.lon_dim, 3);
        assert_eq!(grid.lat_dim, 1);
    }

    #[test]
    fn test_cell_index_roundtrip() {
        let grid = italy();
        let cell = grid.cell_index(3, 7);
        assert_eq!(cell, 3 * 31 + 7);
        assert_eq!(grid.coord(cell), CellCoord { lat_idx: 3, lon_idx: 7 });
    }

    #[test]
    fn test_home_cell_boundaries() {
        let grid = LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 2.0, 2.0), 1.0).unwrap();
        assert_eq!(grid.home_cell(0.0, 0.0), Some(0));
        // Shared boundary goes to the upper cell (closed lower bound)
        assert_eq!(grid.home_cell(1.0, 0.5), Some(1));
        assert_eq!(grid.home_cell(0.5, 1.0), Some(2));
        // Outer boundary stays in the last cell
        assert_eq!(grid.home_cell(2.0, 2.0), Some(3));
        assert_eq!(grid.home_cell(2.01, 0.5), None);
        assert_eq!(grid.home_cell(-0.01, 0.5), None);
        assert_eq!(grid.home_cell(f64::NAN, 0.5), None);
    }

    #[test]
    fn test_interior_cells() {
        let grid = LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 4.0, 3.0), 1.0).unwrap();
        let interior: Vec<usize> = grid.interior_cells().collect();
        assert_eq!(interior, vec![5, 6]);

        let tiny = LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 2.0, 2.0), 1.0).unwrap();
        assert_eq!(tiny.interior_cells().count(), 0);
    }

    #[test]
    fn test_neighbourhood_clipped_at_corner() {
        let grid = LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 4.0, 3.0), 1.0).unwrap();
        assert_eq!(grid.neighbourhood(5), vec![0, 1, 2, 4, 5, 6, 8, 9, 10]);
        assert_eq!(grid.neighbourhood(0), vec![0, 1, 4, 5]);
    }
}
