//! End-to-end tests of the preprocessing pipeline on synthetic node clouds.

use std::collections::HashSet;

use graph_preprocessing::{
    decode_key, CellMapper, EdgeThresholds, HighResNodes, PipelineInputs, PreprocessConfig,
    PreprocessOutput, Preprocessor, StandardizationMode, TrainingTargets,
};
use precip_common::{split_by_years, LowResGrid, TimeSplit, YearSplitParams};
use test_utils::{create_cell_cloud, fixtures, four_node_scenario, NodeCloud};

const THRESHOLD: f32 = 0.1;

fn nodes_from(cloud: &NodeCloud) -> HighResNodes {
    HighResNodes::new(
        cloud.lon.clone(),
        cloud.lat.clone(),
        cloud.elevation.clone(),
        cloud.precipitation.clone(),
    )
    .unwrap()
}

fn config_for(window: (f64, f64, f64, f64), interval: f64) -> PreprocessConfig {
    let (lon_min, lat_min, lon_max, lat_max) = window;
    PreprocessConfig {
        lon_min,
        lon_max,
        lat_min,
        lat_max,
        interval,
        offset_9_cells: interval,
        precipitation_threshold: THRESHOLD,
        standardization: StandardizationMode::Local,
        ..PreprocessConfig::default()
    }
}

/// 5 x 5 cells of 0.25 degrees, 16 nodes per cell, 8 time steps.
///
/// Cell 6 (second row, second column) has no data at all, and a few
/// single values are missing elsewhere.
fn small_cloud() -> NodeCloud {
    create_cell_cloud((10.0, 45.0), 5, 5, 0.25, 4, 8)
        .with_missing_region(10.25, 45.25, 10.5, 45.5)
        .with_missing_value(0, 2)
        .with_missing_value(200, 5)
        .with_missing_value(321, 0)
}

fn small_split() -> TimeSplit {
    let params = YearSplitParams {
        first_year: 2001,
        first_test_year: 2003,
        end_year: 2003,
        holdout_steps: 1,
        warmup_steps: 1,
    };
    split_by_years(&fixtures::time::yearly_indices(&[3, 3, 2]), &params).unwrap()
}

fn small_config() -> PreprocessConfig {
    PreprocessConfig {
        edges: EdgeThresholds {
            lon_diff_max: 0.1,
            lat_diff_max: 0.1,
        },
        ..config_for(fixtures::window::SMALL_5X5, 0.25)
    }
}

fn run_small() -> PreprocessOutput {
    Preprocessor::new(small_config())
        .unwrap()
        .run(PipelineInputs {
            nodes: nodes_from(&small_cloud()),
            time_split: small_split(),
            reference_table: None,
        })
        .unwrap()
}

#[test]
fn test_four_node_scenario() {
    let cloud = four_node_scenario();
    let nodes = nodes_from(&cloud);
    let config = config_for(fixtures::window::UNIT_2X2, 1.0);
    let grid = config.grid().unwrap();
    assert_eq!(grid.len(), 4);

    let mapping = CellMapper::new(&grid, config.offset_9_cells).map(&nodes);
    for cell in 0..4 {
        let members: Vec<usize> = (0..4).filter(|&n| mapping.mask_1_cell[[cell, n]]).collect();
        assert_eq!(members.len(), 1, "cell {cell}");
    }
    let owners: HashSet<usize> = mapping
        .assignments
        .iter()
        .map(|a| a.unwrap().cell_index)
        .collect();
    assert_eq!(owners.len(), 4);

    let targets = TrainingTargets::derive(&nodes.precipitation, 2, THRESHOLD).unwrap();
    for node in 0..4 {
        assert_eq!(targets.classification.row(node).to_vec(), vec![0.0, 1.0]);
    }

    let output = Preprocessor::new(config)
        .unwrap()
        .run(PipelineInputs {
            nodes,
            time_split: TimeSplit::new(vec![0], vec![1]),
            reference_table: None,
        })
        .unwrap();
    assert!(output.is_degenerate());
    assert!(output.space.valid_examples_space.is_empty());
    assert!(output.index.idx_train_cl.is_empty());
    assert!(output.index.idx_train_reg.is_empty());
    assert!(output.idx_train_ae.is_empty());
    assert!(output.idx_test.is_empty());
}

#[test]
fn test_small_cloud_spaces() {
    let output = run_small();
    assert_eq!(output.space.valid_examples_space, vec![7, 8, 11, 12, 13, 16, 17, 18]);
    assert_eq!(output.space.graph_cells_space, (1..25).collect::<Vec<_>>());
    assert_eq!(output.report.filtered_nodes, 24 * 16);
    assert!(!output.is_degenerate());
}

#[test]
fn test_graph_space_covers_valid_examples_and_neighbours() {
    let output = run_small();
    let grid = LowResGrid::from_window(&small_config().window(), 0.25).unwrap();
    let valid: HashSet<usize> = output.space.valid_examples_space.iter().copied().collect();

    for cell in &output.space.valid_examples_space {
        assert!(output.space.is_graph_cell(*cell));
    }
    for &cell in &output.space.graph_cells_space {
        let reached = valid.contains(&cell)
            || grid.neighbourhood(cell).iter().any(|n| valid.contains(n));
        assert!(reached, "cell {cell} is not next to a valid example");
    }
}

#[test]
fn test_masks_are_nested_and_ownership_unique() {
    let output = run_small();
    let filtered = &output.filtered;
    let (n_cells, n_nodes) = filtered.mask_1_cell.dim();
    assert_eq!(filtered.mask_9_cells.dim(), (n_cells, n_nodes));

    for cell in 0..n_cells {
        for node in 0..n_nodes {
            if filtered.mask_1_cell[[cell, node]] {
                assert!(filtered.mask_9_cells[[cell, node]]);
            }
        }
    }
    for node in 0..n_nodes {
        let owners = filtered.mask_1_cell.column(node).iter().filter(|&&m| m).count();
        assert_eq!(owners, 1, "node {node}");
    }
}

#[test]
fn test_cell_idx_array_carries_validity() {
    let output = run_small();
    let signed = output.filtered.cell_idx_array();
    let low_res = output.filtered.low_res();

    for (s, l) in signed.iter().zip(&low_res) {
        assert_eq!(s.abs(), *l);
        assert!(output.space.is_graph_cell(*l as usize));
    }
    assert!(signed.contains(&-6));
    assert!(signed.iter().filter(|&&s| s < 0).all(|&s| s == -6));
    assert_eq!(output.train_graph.low_res.to_vec(), low_res);
}

#[test]
fn test_edges_are_symmetric_with_opposite_attributes() {
    let output = run_small();
    let graph = &output.train_graph;
    assert!(graph.edge_index.ncols() > 0);

    let mut by_pair = std::collections::HashMap::new();
    for e in 0..graph.edge_index.ncols() {
        let (i, j) = (graph.edge_index[[0, e]], graph.edge_index[[1, e]]);
        assert_ne!(i, j);
        by_pair.insert((i, j), (graph.edge_attr[[e, 0]], graph.edge_attr[[e, 1]]));
    }
    for (&(i, j), &(dlon, dlat)) in &by_pair {
        let &(rlon, rlat) = by_pair.get(&(j, i)).expect("reverse edge");
        assert_eq!(dlon, -rlon);
        assert_eq!(dlat, -rlat);
        assert!(dlon.abs() <= 1.0 && dlat.abs() <= 1.0);
    }
}

#[test]
fn test_targets_follow_raw_precipitation() {
    let output = run_small();
    let pr = &output.filtered.nodes.precipitation;
    let targets = &output.targets;
    assert_eq!(targets.classification.ncols(), 5);

    for ((node, t), &cl) in targets.classification.indexed_iter() {
        let raw = pr[[node, t]];
        assert_eq!(cl.is_nan(), raw.is_nan());
        let reg = targets.regression[[node, t]];
        assert_eq!(reg.is_nan(), raw.is_nan() || raw < THRESHOLD);
    }
}

#[test]
fn test_regression_index_is_subset_of_classification() {
    let output = run_small();
    let split = small_split();
    let cl: HashSet<i64> = output.index.idx_train_cl.iter().copied().collect();
    assert!(output.index.idx_train_reg.iter().all(|k| cl.contains(k)));

    let space_dim = output.report.grid.len();
    for &k in &output.index.idx_train_cl {
        let (t, s) = decode_key(k, space_dim);
        assert!(split.train.contains(&t));
        assert!(output.space.is_valid_example(s));
    }
    // Every valid cell reports a value at every training step.
    assert_eq!(output.index.idx_train_cl.len(), 8 * split.train.len());
}

#[test]
fn test_encoder_indices_cover_every_valid_cell_and_time() {
    let output = run_small();
    let split = small_split();
    assert_eq!(output.idx_train_ae.len(), 8 * split.train.len());
    assert_eq!(output.idx_test.len(), 8 * split.test.len());
    assert_eq!(output.test_graph.y.ncols(), 3);
    assert_eq!(output.test_graph.pr_cl.dim(), output.test_graph.y.dim());
}

#[test]
fn test_local_standardization_centres_features() {
    let output = run_small();
    let x = &output.train_graph.x;
    for column in x.columns() {
        let mean = column.mean().unwrap();
        test_utils::assert_approx_eq!(mean, 0.0, 1e-9);
    }
    assert_eq!(output.report.standardization, StandardizationMode::Local);
}
