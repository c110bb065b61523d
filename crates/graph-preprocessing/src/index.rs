//! Flat `(time, cell)` example indices used to address training samples.

use std::time::Instant;

use tracing::info;

use crate::space::{FilteredNodes, GraphCellSpace};
use crate::targets::TrainingTargets;

/// Encode a `(time, cell)` pair as `t * space_dim + s`.
pub fn encode_key(t: usize, s: usize, space_dim: usize) -> i64 {
    (t * space_dim + s) as i64
}

/// Inverse of [`encode_key`].
pub fn decode_key(k: i64, space_dim: usize) -> (usize, usize) {
    let k = k as usize;
    (k / space_dim, k % space_dim)
}

/// Classification and regression example indices.
///
/// Both lists follow the cell scan order (cells ascending, then times in
/// list order) and are not numerically sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingIndex {
    pub idx_train_cl: Vec<i64>,
    pub idx_train_reg: Vec<i64>,
}

impl TrainingIndex {
    fn merge(&mut self, other: CellExamples) {
        self.idx_train_cl.extend(other.cl);
        self.idx_train_reg.extend(other.reg);
    }
}

/// Examples contributed by a single cell.
#[derive(Debug, Default)]
struct CellExamples {
    cl: Vec<i64>,
    reg: Vec<i64>,
}

pub struct IndexBuilder<'a> {
    space: &'a GraphCellSpace,
    space_dim: usize,
    progress_every: usize,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(space: &'a GraphCellSpace, space_dim: usize) -> Self {
        Self {
            space,
            space_dim,
            progress_every: 10,
        }
    }

    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n.max(1);
        self
    }

    /// Every valid example cell at every time in `times`, cell-major.
    pub fn encoder_index(&self, times: &[usize]) -> Vec<i64> {
        self.space
            .valid_examples_space
            .iter()
            .flat_map(|&s| times.iter().map(move |&t| encode_key(t, s, self.space_dim)))
            .collect()
    }

    /// Keep `(t, s)` when any node owned by `s` has a defined target at `t`.
    ///
    /// `train_times` are absolute steps and index the target columns directly.
    pub fn training_index(
        &self,
        filtered: &FilteredNodes,
        targets: &TrainingTargets,
        train_times: &[usize],
    ) -> TrainingIndex {
        let start = Instant::now();
        let mut index = TrainingIndex::default();

        for (done, &s) in self.space.valid_examples_space.iter().enumerate() {
            let members = filtered.members_1(s);
            index.merge(self.scan_cell(s, &members, targets, train_times));

            if self.reports_progress(done + 1) {
                info!(cell = s, done = done + 1, "Space index done");
            }
        }

        info!(
            cl = index.idx_train_cl.len(),
            reg = index.idx_train_reg.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Built training index"
        );
        index
    }

    fn reports_progress(&self, done: usize) -> bool {
        done % self.progress_every == 0
    }

    fn scan_cell(
        &self,
        s: usize,
        members: &[usize],
        targets: &TrainingTargets,
        train_times: &[usize],
    ) -> CellExamples {
        let mut out = CellExamples::default();
        if members.is_empty() {
            return out;
        }
        for &t in train_times {
            let (cl, reg) = targets.any_defined(members, t);
            if cl {
                let k = encode_key(t, s, self.space_dim);
                out.cl.push(k);
                if reg {
                    out.reg.push(k);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::CellAssignment;
    use crate::nodes::HighResNodes;
    use ndarray::{array, Array1, Array2};

    fn one_node_cell(pr: Array2<f32>) -> (GraphCellSpace, FilteredNodes) {
        let space = GraphCellSpace {
            valid_examples_space: vec![4],
            graph_cells_space: (0..9).collect(),
        };
        let mut mask_1 = Array2::from_elem((9, 1), false);
        mask_1[[4, 0]] = true;
        let nodes = HighResNodes::new(
            Array1::from(vec![1.5]),
            Array1::from(vec![1.5]),
            Array1::from(vec![0.0]),
            pr,
        )
        .unwrap();
        let filtered = FilteredNodes {
            nodes,
            mask_9_cells: mask_1.clone(),
            mask_1_cell: mask_1,
            assignments: vec![CellAssignment { cell_index: 4, valid: true }],
            kept: vec![0],
        };
        (space, filtered)
    }

    #[test]
    fn test_key_roundtrip() {
        let k = encode_key(7, 5, 9);
        assert_eq!(k, 68);
        assert_eq!(decode_key(k, 9), (7, 5));
    }

    #[test]
    fn test_training_index_respects_targets() {
        let pr = array![[f32::NAN, 0.05, 0.5]];
        let (space, filtered) = one_node_cell(pr.clone());
        let targets = TrainingTargets::derive(&pr, 3, 0.1).unwrap();

        let index = IndexBuilder::new(&space, 9).training_index(&filtered, &targets, &[0, 1, 2]);

        assert_eq!(index.idx_train_cl, vec![encode_key(1, 4, 9), encode_key(2, 4, 9)]);
        assert_eq!(index.idx_train_reg, vec![encode_key(2, 4, 9)]);
    }

    #[test]
    fn test_training_index_only_uses_listed_times() {
        let pr = array![[0.5f32, 0.5, 0.5]];
        let (space, filtered) = one_node_cell(pr.clone());
        let targets = TrainingTargets::derive(&pr, 3, 0.1).unwrap();

        let index = IndexBuilder::new(&space, 9).training_index(&filtered, &targets, &[2]);
        assert_eq!(index.idx_train_cl, vec![22]);
    }

    #[test]
    fn test_progress_cadence() {
        let (space, _) = one_node_cell(array![[0.5f32]]);
        let builder = IndexBuilder::new(&space, 9).with_progress_every(3);
        assert!(!builder.reports_progress(2));
        assert!(builder.reports_progress(3));
        assert!(builder.reports_progress(6));
        assert!(IndexBuilder::new(&space, 9)
            .with_progress_every(0)
            .reports_progress(1));
    }

    #[test]
    fn test_encoder_index_is_cell_major() {
        let space = GraphCellSpace {
            valid_examples_space: vec![6, 7],
            graph_cells_space: (0..16).collect(),
        };
        let idx = IndexBuilder::new(&space, 16).encoder_index(&[3, 1]);
        assert_eq!(idx, vec![3 * 16 + 6, 16 + 6, 3 * 16 + 7, 16 + 7]);
    }
}
