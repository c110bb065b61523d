//! Selecting the cells that take part in training and the nodes they need.

use ndarray::{Array2, Axis};
use precip_common::LowResGrid;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cells::{CellAssignment, CellMapping};
use crate::nodes::HighResNodes;

/// The low-resolution cells retained for training.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCellSpace {
    /// Interior cells with data, usable as training examples (ascending).
    pub valid_examples_space: Vec<usize>,
    /// Valid example cells plus their 8 neighbours (ascending, deduplicated).
    pub graph_cells_space: Vec<usize>,
}

impl GraphCellSpace {
    /// Derive both cell sets from per-cell validity.
    pub fn select(grid: &LowResGrid, cell_valid: &[bool]) -> Self {
        let valid_examples_space: Vec<usize> = grid
            .interior_cells()
            .filter(|&cell| cell_valid[cell])
            .collect();

        let mut graph_cells_space: Vec<usize> = valid_examples_space
            .iter()
            .flat_map(|&cell| grid.neighbourhood(cell))
            .collect();
        graph_cells_space.sort_unstable();
        graph_cells_space.dedup();

        Self {
            valid_examples_space,
            graph_cells_space,
        }
    }

    /// True when no cell can serve as a training example.
    pub fn is_empty(&self) -> bool {
        self.valid_examples_space.is_empty()
    }

    pub fn is_valid_example(&self, cell: usize) -> bool {
        self.valid_examples_space.binary_search(&cell).is_ok()
    }

    pub fn is_graph_cell(&self, cell: usize) -> bool {
        self.graph_cells_space.binary_search(&cell).is_ok()
    }
}

/// Node arrays and masks restricted to the graph cell space.
#[derive(Debug, Clone)]
pub struct FilteredNodes {
    pub nodes: HighResNodes,
    /// `(n_cells, n_kept)` 1-cell membership.
    pub mask_1_cell: Array2<bool>,
    /// `(n_cells, n_kept)` 9-cell membership.
    pub mask_9_cells: Array2<bool>,
    /// Owning cell of each kept node.
    pub assignments: Vec<CellAssignment>,
    /// Position of each kept node in the windowed arrays.
    pub kept: Vec<usize>,
}

impl FilteredNodes {
    /// `cell_idx_array` artifact: signed owning cell per node.
    pub fn cell_idx_array(&self) -> Vec<i64> {
        self.assignments.iter().map(CellAssignment::signed).collect()
    }

    /// `cell_valid_array` artifact: validity of each node's owning cell.
    pub fn cell_valid_array(&self) -> Vec<bool> {
        self.assignments.iter().map(|a| a.valid).collect()
    }

    /// Absolute owning cell per node.
    pub fn low_res(&self) -> Vec<i64> {
        self.assignments.iter().map(|a| a.cell_index as i64).collect()
    }

    /// Nodes owned by `cell`, ascending.
    pub fn members_1(&self, cell: usize) -> Vec<usize> {
        self.mask_1_cell
            .row(cell)
            .iter()
            .enumerate()
            .filter_map(|(n, &inside)| inside.then_some(n))
            .collect()
    }
}

/// Drop every node whose owning cell is outside the graph cell space.
///
/// Node arrays and mask columns are filtered identically, so they stay aligned.
pub fn filter_to_graph_space(
    nodes: &HighResNodes,
    mapping: &CellMapping,
    space: &GraphCellSpace,
) -> FilteredNodes {
    let (kept, assignments): (Vec<usize>, Vec<CellAssignment>) = mapping
        .assignments
        .iter()
        .enumerate()
        .filter_map(|(n, assignment)| {
            assignment
                .filter(|a| space.is_graph_cell(a.cell_index))
                .map(|a| (n, a))
        })
        .unzip();

    info!(
        windowed = nodes.len(),
        kept = kept.len(),
        valid_examples = space.valid_examples_space.len(),
        graph_cells = space.graph_cells_space.len(),
        "Filtered nodes to graph cell space"
    );

    FilteredNodes {
        nodes: nodes.select(&kept),
        mask_1_cell: mapping.mask_1_cell.select(Axis(1), &kept),
        mask_9_cells: mapping.mask_9_cells.select(Axis(1), &kept),
        assignments,
        kept,
    }
}
