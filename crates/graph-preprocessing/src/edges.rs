//! Proximity graph over the high-resolution nodes.
//!
//! Two distinct nodes `i`, `j` are connected when `|lon_i - lon_j| < lon_diff_max`
//! and `|lat_i - lat_j| < lat_diff_max`. Both directions are stored. The edge
//! attribute is the `(Δlon, Δlat)` offset from source to target, each component
//! divided by its maximum absolute value over the whole edge set.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PreprocessError, Result};

/// Longitude threshold, calibrated for a 0.25° grid so only immediate
/// high-resolution neighbours connect.
pub const LON_DIFF_MAX: f64 = 0.25 / 8.0 * 2.0;

/// Latitude threshold, calibrated for a 0.25° grid.
pub const LAT_DIFF_MAX: f64 = 0.25 / 10.0 * 2.0;

/// Maximum coordinate offsets for two nodes to share an edge.
///
/// These need re-calibration whenever the high-resolution spacing changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeThresholds {
    pub lon_diff_max: f64,
    pub lat_diff_max: f64,
}

impl Default for EdgeThresholds {
    fn default() -> Self {
        Self {
            lon_diff_max: LON_DIFF_MAX,
            lat_diff_max: LAT_DIFF_MAX,
        }
    }
}

impl EdgeThresholds {
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.lon_diff_max) || !positive(self.lat_diff_max) {
            return Err(PreprocessError::config(format!(
                "edge thresholds must be > 0, got lon {} lat {}",
                self.lon_diff_max, self.lat_diff_max
            )));
        }
        Ok(())
    }

    fn connects(&self, dlon: f64, dlat: f64) -> bool {
        dlon.abs() < self.lon_diff_max && dlat.abs() < self.lat_diff_max
    }
}

/// Directed edge list with normalized offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSet {
    /// `(2, n_edges)`: row 0 sources, row 1 targets.
    pub edge_index: Array2<i64>,
    /// `(n_edges, 2)`: normalized `(Δlon, Δlat)`.
    pub edge_attr: Array2<f64>,
}

impl EdgeSet {
    pub fn len(&self) -> usize {
        self.edge_index.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(source, target)` pairs in storage order.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edge_index
            .row(0)
            .into_iter()
            .zip(self.edge_index.row(1))
            .map(|(&s, &t)| (s as usize, t as usize))
    }
}

/// Build the proximity graph.
///
/// Nodes are bucketed on a grid of the thresholds so each node is only
/// compared with nearby buckets. Edges come out ordered by source, then
/// target, exactly as an all-pairs scan would produce them.
pub fn build_edges(lon: &Array1<f64>, lat: &Array1<f64>, thresholds: &EdgeThresholds) -> EdgeSet {
    let n = lon.len();
    let buckets = SpatialBuckets::build(lon, lat, thresholds);

    let neighbours: Vec<Vec<(usize, f64, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut found: Vec<(usize, f64, f64)> = buckets
                .candidates(lon[i], lat[i])
                .filter(|&j| j != i)
                .filter_map(|j| {
                    let dlon = lon[j] - lon[i];
                    let dlat = lat[j] - lat[i];
                    thresholds.connects(dlon, dlat).then_some((j, dlon, dlat))
                })
                .collect();
            found.sort_unstable_by_key(|&(j, _, _)| j);
            found
        })
        .collect();

    let n_edges: usize = neighbours.iter().map(Vec::len).sum();
    let mut edge_index = Array2::<i64>::zeros((2, n_edges));
    let mut edge_attr = Array2::<f64>::zeros((n_edges, 2));

    let mut e = 0;
    for (i, found) in neighbours.into_iter().enumerate() {
        for (j, dlon, dlat) in found {
            edge_index[[0, e]] = i as i64;
            edge_index[[1, e]] = j as i64;
            edge_attr[[e, 0]] = dlon;
            edge_attr[[e, 1]] = dlat;
            e += 1;
        }
    }

    normalize_columns(&mut edge_attr);

    info!(nodes = n, edges = n_edges, "Edge construction complete");

    EdgeSet {
        edge_index,
        edge_attr,
    }
}

/// Divide each column by its maximum absolute value.
///
/// Columns whose maximum is zero (or an empty edge set) are left unchanged.
pub fn normalize_columns(attr: &mut Array2<f64>) {
    for mut column in attr.columns_mut() {
        let max_abs = column.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        if max_abs > 0.0 {
            column.mapv_inplace(|v| v / max_abs);
        }
    }
}

/// Nodes grouped by `(floor(lon / lon_diff_max), floor(lat / lat_diff_max))`.
struct SpatialBuckets {
    cells: HashMap<(i64, i64), Vec<usize>>,
    lon_width: f64,
    lat_width: f64,
}

/// Buckets searched on each side of a node's own bucket. One suffices for
/// offsets below the bucket width; the extra ring absorbs rounding in the
/// bucket keys so the strict threshold test stays the only criterion.
const SEARCH_RADIUS: i64 = 2;

impl SpatialBuckets {
    fn build(lon: &Array1<f64>, lat: &Array1<f64>, thresholds: &EdgeThresholds) -> Self {
        let mut buckets = Self {
            cells: HashMap::new(),
            lon_width: thresholds.lon_diff_max,
            lat_width: thresholds.lat_diff_max,
        };
        for (i, (&x, &y)) in lon.iter().zip(lat.iter()).enumerate() {
            let key = buckets.key(x, y);
            buckets.cells.entry(key).or_default().push(i);
        }
        buckets
    }

    fn key(&self, lon: f64, lat: f64) -> (i64, i64) {
        (
            (lon / self.lon_width).floor() as i64,
            (lat / self.lat_width).floor() as i64,
        )
    }

    fn candidates(&self, lon: f64, lat: f64) -> impl Iterator<Item = usize> + '_ {
        let (kx, ky) = self.key(lon, lat);
        (-SEARCH_RADIUS..=SEARCH_RADIUS)
            .flat_map(move |dx| (-SEARCH_RADIUS..=SEARCH_RADIUS).map(move |dy| (kx + dx, ky + dy)))
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .copied()
    }
}
