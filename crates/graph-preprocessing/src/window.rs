//! Cutting the high-resolution dataset down to the study window.

use precip_common::BoundingBox;

use crate::nodes::HighResNodes;

/// Keep the nodes whose `(lon, lat)` lies inside the closed window,
/// preserving their relative order.
///
/// An empty result is valid; callers decide whether to warn about it.
pub fn cut_window(nodes: &HighResNodes, window: &BoundingBox) -> HighResNodes {
    let inside: Vec<usize> = nodes
        .lon
        .iter()
        .zip(nodes.lat.iter())
        .enumerate()
        .filter(|(_, (&lon, &lat))| window.contains_point(lon, lat))
        .map(|(i, _)| i)
        .collect();

    nodes.select(&inside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_cut_window_keeps_closed_rectangle_in_order() {
        let nodes = HighResNodes::new(
            array![0.0, 1.0, 2.0, 2.5, 1.5],
            array![0.0, 1.0, 2.0, 1.0, -0.1],
            array![10.0, 11.0, 12.0, 13.0, 14.0],
            Array2::from_shape_fn((5, 2), |(n, t)| (n * 10 + t) as f32),
        )
        .unwrap();

        let cut = cut_window(&nodes, &BoundingBox::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(cut.lon.to_vec(), vec![0.0, 1.0, 2.0]);
        assert_eq!(cut.elevation.to_vec(), vec![10.0, 11.0, 12.0]);
        assert_eq!(cut.precipitation.row(2).to_vec(), vec![20.0, 21.0]);
    }

    #[test]
    fn test_cut_window_can_be_empty() {
        let nodes = HighResNodes::new(
            array![5.0],
            array![5.0],
            array![0.0],
            Array2::zeros((1, 4)),
        )
        .unwrap();
        let cut = cut_window(&nodes, &BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(cut.is_empty());
        assert_eq!(cut.n_times(), 4);
    }
}
