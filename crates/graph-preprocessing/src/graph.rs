//! Graph objects handed to the dataset layer.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::edges::EdgeSet;

/// Graph used during training; carries no targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainGraph {
    pub num_nodes: usize,
    /// `(n_nodes, 3)` standardized `(lon, lat, elevation)`.
    pub x: Array2<f64>,
    /// `(2, n_edges)` source/target node indices.
    pub edge_index: Array2<i64>,
    /// `(n_edges, 2)` normalized `(Δlon, Δlat)`.
    pub edge_attr: Array2<f64>,
    /// Owning low-resolution cell per node.
    pub low_res: Array1<i64>,
}

/// Graph used for inference over the test period.
///
/// `pr_cl` and `pr_reg` are zero-filled output buffers shaped like `y`;
/// they are only written by the inference stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestGraph {
    pub num_nodes: usize,
    /// `(n_nodes, 2)` raw `(lon, lat)`.
    pub pos: Array2<f64>,
    pub x: Array2<f64>,
    pub edge_index: Array2<i64>,
    pub edge_attr: Array2<f64>,
    pub low_res: Array1<i64>,
    /// `(n_nodes, n_test_steps)` raw precipitation over the test period.
    pub y: Array2<f32>,
    pub pr_cl: Array2<f32>,
    pub pr_reg: Array2<f32>,
}

/// Everything shared by both graph variants.
#[derive(Debug, Clone)]
pub struct GraphParts {
    pub pos: Array2<f64>,
    pub x: Array2<f64>,
    pub edges: EdgeSet,
    pub low_res: Array1<i64>,
}

impl GraphParts {
    pub fn num_nodes(&self) -> usize {
        self.x.nrows()
    }

    /// Build the training graph.
    pub fn train_graph(&self) -> TrainGraph {
        TrainGraph {
            num_nodes: self.num_nodes(),
            x: self.x.clone(),
            edge_index: self.edges.edge_index.clone(),
            edge_attr: self.edges.edge_attr.clone(),
            low_res: self.low_res.clone(),
        }
    }

    /// Build the test graph around the test-period targets.
    pub fn test_graph(&self, y: Array2<f32>) -> TestGraph {
        let buffer = Array2::zeros(y.raw_dim());
        TestGraph {
            num_nodes: self.num_nodes(),
            pos: self.pos.clone(),
            x: self.x.clone(),
            edge_index: self.edges.edge_index.clone(),
            edge_attr: self.edges.edge_attr.clone(),
            low_res: self.low_res.clone(),
            pr_cl: buffer.clone(),
            pr_reg: buffer,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn parts() -> GraphParts {
        GraphParts {
            pos: array![[0.5, 0.5], [0.55, 0.5]],
            x: array![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            edges: EdgeSet {
                edge_index: array![[0, 1], [1, 0]],
                edge_attr: array![[1.0, 0.0], [-1.0, 0.0]],
            },
            low_res: array![4, 4],
        }
    }

    #[test]
    fn test_train_graph_has_no_targets() {
        let g = parts().train_graph();
        assert_eq!(g.num_nodes, 2);
        assert_eq!(g.edge_index.ncols(), 2);
        assert_eq!(g.low_res.to_vec(), vec![4, 4]);
    }

    #[test]
    fn test_test_graph_buffers_match_targets() {
        let y = array![[0.0f32, 1.0, 2.0], [f32::NAN, 0.5, 0.0]];
        let g = parts().test_graph(y);
        assert_eq!(g.y.dim(), (2, 3));
        assert_eq!(g.pr_cl.dim(), (2, 3));
        assert_eq!(g.pr_reg.dim(), (2, 3));
        assert!(g.pr_cl.iter().all(|&v| v == 0.0));
        assert_eq!(g.pos[[1, 0]], 0.55);
    }
}
