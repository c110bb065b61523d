//! Synthetic high-resolution node clouds.
//!
//! The generators are deterministic so that tests can assert exact counts
//! and repeated runs produce identical data.

use ndarray::{Array1, Array2};

/// Raw node arrays as a preprocessing run receives them.
///
/// Precipitation is node-major, shape `(n_nodes, n_times)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCloud {
    pub lon: Array1<f64>,
    pub lat: Array1<f64>,
    pub elevation: Array1<f64>,
    pub precipitation: Array2<f32>,
}

impl NodeCloud {
    pub fn len(&self) -> usize {
        self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lon.is_empty()
    }

    pub fn n_times(&self) -> usize {
        self.precipitation.ncols()
    }

    /// Precipitation laid out `(time, node)`, as gridded datasets store it.
    pub fn time_major(&self) -> Array2<f32> {
        self.precipitation.t().as_standard_layout().into_owned()
    }

    /// Mark the whole series of `nodes` as missing.
    pub fn with_missing_nodes(mut self, nodes: &[usize]) -> Self {
        for &n in nodes {
            self.precipitation.row_mut(n).fill(f32::NAN);
        }
        self
    }

    /// Mark a single `(node, time)` value as missing.
    pub fn with_missing_value(mut self, node: usize, t: usize) -> Self {
        self.precipitation[[node, t]] = f32::NAN;
        self
    }

    /// Mark every node inside `[lon_min, lon_max) x [lat_min, lat_max)` as missing.
    pub fn with_missing_region(self, lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Self {
        let inside: Vec<usize> = (0..self.len())
            .filter(|&n| {
                let (lon, lat) = (self.lon[n], self.lat[n]);
                lon >= lon_min && lon < lon_max && lat >= lat_min && lat < lat_max
            })
            .collect();
        self.with_missing_nodes(&inside)
    }
}

/// Synthetic precipitation (mm) for one node and time step.
///
/// Cycles through `0.0, 0.05, ..., 0.5`, so roughly one value in five is
/// below a 0.1 mm threshold.
pub fn synthetic_precipitation(node: usize, t: usize) -> f32 {
    ((node * 7 + t * 3) % 11) as f32 * 0.05
}

/// Synthetic terrain height (m) at a location.
pub fn synthetic_elevation(lon: f64, lat: f64) -> f64 {
    500.0 + 300.0 * (lon * 3.0).sin() + 200.0 * (lat * 2.0).cos()
}

/// Creates a regular lattice of nodes starting half a step inside
/// `(lon_min, lat_min)`.
///
/// Nodes are laid out row by row (latitude outer, longitude inner), so node
/// `r * lon_steps + c` sits at
/// `(lon_min + (c + 0.5) * dlon, lat_min + (r + 0.5) * dlat)`.
///
/// # Example
///
/// ```
/// use test_utils::create_node_lattice;
///
/// let cloud = create_node_lattice((0.0, 0.0), (4, 2), (0.5, 0.5), 3);
/// assert_eq!(cloud.len(), 8);
/// assert_eq!(cloud.lon[1], 0.75);
/// assert_eq!(cloud.lat[4], 0.75);
/// assert_eq!(cloud.n_times(), 3);
/// ```
pub fn create_node_lattice(
    origin: (f64, f64),
    steps: (usize, usize),
    spacing: (f64, f64),
    n_times: usize,
) -> NodeCloud {
    let (lon_min, lat_min) = origin;
    let (lon_steps, lat_steps) = steps;
    let (dlon, dlat) = spacing;
    let n = lon_steps * lat_steps;

    let mut lon = Vec::with_capacity(n);
    let mut lat = Vec::with_capacity(n);
    for r in 0..lat_steps {
        for c in 0..lon_steps {
            lon.push(lon_min + (c as f64 + 0.5) * dlon);
            lat.push(lat_min + (r as f64 + 0.5) * dlat);
        }
    }

    let elevation = lon
        .iter()
        .zip(&lat)
        .map(|(&x, &y)| synthetic_elevation(x, y))
        .collect::<Vec<_>>();

    NodeCloud {
        lon: Array1::from(lon),
        lat: Array1::from(lat),
        elevation: Array1::from(elevation),
        precipitation: Array2::from_shape_fn((n, n_times), |(node, t)| {
            synthetic_precipitation(node, t)
        }),
    }
}

/// A lattice with `per_cell` nodes per axis in every cell of a
/// `cols x rows` grid of square `interval` cells anchored at `origin`.
pub fn create_cell_cloud(
    origin: (f64, f64),
    cols: usize,
    rows: usize,
    interval: f64,
    per_cell: usize,
    n_times: usize,
) -> NodeCloud {
    let step = interval / per_cell as f64;
    create_node_lattice(origin, (cols * per_cell, rows * per_cell), (step, step), n_times)
}
