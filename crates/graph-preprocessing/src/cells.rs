//! Mapping high-resolution nodes onto low-resolution cells.
//!
//! Every cell gets two memberships over the nodes:
//!
//! - **1-cell**: nodes inside the cell itself, closed below and open above
//!   (the last row/column is also closed above), so each node in the grid
//!   extent belongs to exactly one cell
//! - **9-cell**: nodes inside the cell box padded by `offset_9_cells` on every
//!   side (closed), unioned with the 1-cell members
//!
//! A cell is valid when at least one 1-cell member has a non-NaN value
//! somewhere in its precipitation series.

use std::time::Instant;

use ndarray::Array2;
use precip_common::LowResGrid;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::nodes::HighResNodes;

/// The low-resolution cell owning a node, and whether that cell is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAssignment {
    pub cell_index: usize,
    pub valid: bool,
}

impl CellAssignment {
    /// Signed encoding used by the `cell_idx_array` artifact:
    /// the cell index, negated when the cell is invalid.
    ///
    /// The sign cannot carry validity for cell 0; `cell_valid_array` does.
    pub fn signed(&self) -> i64 {
        if self.valid {
            self.cell_index as i64
        } else {
            -(self.cell_index as i64)
        }
    }
}

/// Result of scanning a single cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellScan {
    /// Nodes owned by the cell, ascending
    pub members_1: Vec<usize>,
    /// Nodes inside the padded cell box (superset of `members_1`), ascending
    pub members_9: Vec<usize>,
    pub valid: bool,
}

/// Cell memberships for every node of the window.
#[derive(Debug, Clone)]
pub struct CellMapping {
    /// `(n_cells, n_nodes)` 1-cell membership.
    pub mask_1_cell: Array2<bool>,
    /// `(n_cells, n_nodes)` 9-cell membership.
    pub mask_9_cells: Array2<bool>,
    /// Validity per cell.
    pub cell_valid: Vec<bool>,
    /// Owning cell per node; `None` for nodes outside the grid extent.
    pub assignments: Vec<Option<CellAssignment>>,
}

impl CellMapping {
    /// Number of valid cells.
    pub fn valid_cells(&self) -> usize {
        self.cell_valid.iter().filter(|&&v| v).count()
    }
}

/// Scans the low-resolution grid cell by cell.
pub struct CellMapper<'a> {
    grid: &'a LowResGrid,
    offset_9_cells: f64,
    progress_every: usize,
}

impl<'a> CellMapper<'a> {
    pub fn new(grid: &'a LowResGrid, offset_9_cells: f64) -> Self {
        Self {
            grid,
            offset_9_cells,
            progress_every: 10,
        }
    }

    /// Log progress every `n` cells.
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n.max(1);
        self
    }

    /// Map every node of the window onto the grid.
    pub fn map(&self, nodes: &HighResNodes) -> CellMapping {
        let n_cells = self.grid.len();
        let n_nodes = nodes.len();
        let start = Instant::now();

        let index = NodeBuckets::build(self.grid, nodes);

        let mut mapping = CellMapping {
            mask_1_cell: Array2::from_elem((n_cells, n_nodes), false),
            mask_9_cells: Array2::from_elem((n_cells, n_nodes), false),
            cell_valid: vec![false; n_cells],
            assignments: vec![None; n_nodes],
        };

        for cell in 0..n_cells {
            let scan = self.scan_cell(cell, nodes, &index);
            merge_scan(&mut mapping, cell, scan);

            if self.reports_progress(cell + 1) {
                info!(cell, total = n_cells, "Cell scan progress");
            }
        }

        info!(
            cells = n_cells,
            valid_cells = mapping.valid_cells(),
            nodes = n_nodes,
            unassigned = mapping.assignments.iter().filter(|a| a.is_none()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cell mapping complete"
        );

        mapping
    }

    /// Compute both memberships and the validity of one cell.
    fn reports_progress(&self, done: usize) -> bool {
        done % self.progress_every == 0
    }

    fn scan_cell(&self, cell: usize, nodes: &HighResNodes, index: &NodeBuckets) -> CellScan {
        let members_1 = index.buckets[cell].clone();
        let valid = members_1.iter().any(|&n| index.has_data[n]);

        let padded = self.grid.cell_bbox(cell).padded(self.offset_9_cells);
        let radius = (self.offset_9_cells / self.grid.interval).ceil() as usize + 1;

        let mut members_9: Vec<usize> = self
            .grid
            .block(cell, radius)
            .into_iter()
            .flat_map(|neighbour| index.buckets[neighbour].iter().copied())
            .filter(|&n| padded.contains_point(nodes.lon[n], nodes.lat[n]))
            .chain(members_1.iter().copied())
            .collect();
        members_9.sort_unstable();
        members_9.dedup();

        CellScan {
            members_1,
            members_9,
            valid,
        }
    }
}

/// Fold one cell's scan into the mapping.
fn merge_scan(mapping: &mut CellMapping, cell: usize, scan: CellScan) {
    for &n in &scan.members_1 {
        mapping.mask_1_cell[[cell, n]] = true;
        mapping.assignments[n] = Some(CellAssignment {
            cell_index: cell,
            valid: scan.valid,
        });
    }
    for &n in &scan.members_9 {
        mapping.mask_9_cells[[cell, n]] = true;
    }
    mapping.cell_valid[cell] = scan.valid;
}

/// Nodes grouped by home cell, plus per-node data availability.
struct NodeBuckets {
    buckets: Vec<Vec<usize>>,
    has_data: Vec<bool>,
}

impl NodeBuckets {
    fn build(grid: &LowResGrid, nodes: &HighResNodes) -> Self {
        let mut buckets = vec![Vec::new(); grid.len()];
        for n in 0..nodes.len() {
            if let Some(cell) = grid.home_cell(nodes.lon[n], nodes.lat[n]) {
                buckets[cell].push(n);
            }
        }
        let has_data = (0..nodes.len()).map(|n| nodes.has_data(n)).collect();
        Self { buckets, has_data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};
    use precip_common::BoundingBox;

    fn grid_3x3() -> LowResGrid {
        LowResGrid::from_window(&BoundingBox::new(0.0, 0.0, 3.0, 3.0), 1.0).unwrap()
    }

    fn nodes_at(points: &[(f64, f64)], pr: Array2<f32>) -> HighResNodes {
        HighResNodes::new(
            points.iter().map(|p| p.0).collect::<Array1<f64>>(),
            points.iter().map(|p| p.1).collect::<Array1<f64>>(),
            Array1::zeros(points.len()),
            pr,
        )
        .unwrap()
    }

    #[test]
    fn test_signed_encoding() {
        let valid = CellAssignment { cell_index: 7, valid: true };
        let invalid = CellAssignment { cell_index: 7, valid: false };
        assert_eq!(valid.signed(), 7);
        assert_eq!(invalid.signed(), -7);

        let zero_valid = CellAssignment { cell_index: 0, valid: true };
        let zero_invalid = CellAssignment { cell_index: 0, valid: false };
        assert_eq!(zero_valid.signed(), zero_invalid.signed());
    }

    #[test]
    fn test_boundary_node_goes_to_one_cell() {
        let grid = grid_3x3();
        let nodes = nodes_at(&[(1.0, 1.0)], Array2::zeros((1, 1)));
        let mapping = CellMapper::new(&grid, 0.5).map(&nodes);

        let owners: Vec<usize> = (0..grid.len())
            .filter(|&c| mapping.mask_1_cell[[c, 0]])
            .collect();
        assert_eq!(owners, vec![4]);
        // Corner of four cells, inside each of their padded boxes
        for c in [0, 1, 3, 4] {
            assert!(mapping.mask_9_cells[[c, 0]], "cell {c}");
        }
    }

    #[test]
    fn test_nine_cell_mask_uses_padding() {
        let grid = grid_3x3();
        // Centre cell 4 spans [1, 2]; with pad 0.25 the 9-cell box is [0.75, 2.25]
        let nodes = nodes_at(
            &[(1.5, 1.5), (0.8, 1.5), (0.7, 1.5), (2.25, 2.25)],
            Array2::zeros((4, 1)),
        );
        let mapping = CellMapper::new(&grid, 0.25).map(&nodes);

        assert_eq!(mapping.mask_1_cell.row(4).to_vec(), vec![true, false, false, false]);
        assert_eq!(mapping.mask_9_cells.row(4).to_vec(), vec![true, true, false, true]);
    }

    #[test]
    fn test_all_nan_cell_is_invalid() {
        let grid = grid_3x3();
        let nodes = nodes_at(
            &[(0.5, 0.5), (1.5, 0.5), (1.6, 0.6)],
            array![[f32::NAN, f32::NAN], [f32::NAN, f32::NAN], [f32::NAN, 0.0]],
        );
        let mapping = CellMapper::new(&grid, 1.0).map(&nodes);

        assert!(!mapping.cell_valid[0]);
        assert!(mapping.cell_valid[1]);
        assert_eq!(
            mapping.assignments[0],
            Some(CellAssignment { cell_index: 0, valid: false })
        );
        // Node 1 has no data itself but its cell is valid
        assert_eq!(
            mapping.assignments[1],
            Some(CellAssignment { cell_index: 1, valid: true })
        );
        assert_eq!(mapping.valid_cells(), 1);
    }

    #[test]
    fn test_progress_cadence() {
        let grid = grid_3x3();
        let every_cell = CellMapper::new(&grid, 1.0).with_progress_every(0);
        assert!((1..=9).all(|done| every_cell.reports_progress(done)));

        let default = CellMapper::new(&grid, 1.0);
        assert!(!default.reports_progress(9));
        assert!(default.reports_progress(10));
    }

    #[test]
    fn test_scan_membership_is_subset() {
        let grid = grid_3x3();
        let points: Vec<(f64, f64)> = (0..30)
            .map(|i| ((i % 6) as f64 * 0.5, (i / 6) as f64 * 0.6))
            .collect();
        let nodes = nodes_at(&points, Array2::zeros((points.len(), 1)));
        let mapping = CellMapper::new(&grid, 0.3).map(&nodes);

        for c in 0..grid.len() {
            for n in 0..nodes.len() {
                if mapping.mask_1_cell[[c, n]] {
                    assert!(mapping.mask_9_cells[[c, n]]);
                }
            }
        }
    }
}
