//! End-to-end preprocessing run.
//!
//! The stages run strictly in order and keep everything in memory; nothing
//! touches the filesystem until [`PreprocessOutput::write`] is called on a
//! fully built output.

use std::path::PathBuf;

use ndarray::{Array1, Array2};
use precip_common::{LowResGrid, TimeSplit};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::{names, ArtifactWriter};
use crate::cells::CellMapper;
use crate::config::PreprocessConfig;
use crate::edges::build_edges;
use crate::error::{PreprocessError, Result};
use crate::graph::{GraphParts, TestGraph, TrainGraph};
use crate::index::{IndexBuilder, TrainingIndex};
use crate::nodes::HighResNodes;
use crate::space::{filter_to_graph_space, FilteredNodes, GraphCellSpace};
use crate::standardize::{load_reference_table, positions, FeatureStats, StandardizationMode};
use crate::targets::{defined_counts, test_targets, TrainingTargets};
use crate::window::cut_window;

/// Data handed to a run.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// The full high-resolution dataset, before window cutting.
    pub nodes: HighResNodes,
    pub time_split: TimeSplit,
    /// Preloaded `(lat, lon, elevation)` reference table; when absent in
    /// reference mode it is read from `reference_stats_path`.
    pub reference_table: Option<Array2<f64>>,
}

/// Summary of a run, persisted next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub config: PreprocessConfig,
    pub grid: LowResGrid,
    pub standardization: StandardizationMode,
    pub reference_stats_path: Option<PathBuf>,
    pub feature_stats: FeatureStats,
    pub input_nodes: usize,
    pub windowed_nodes: usize,
    pub valid_cells: usize,
    pub valid_examples: usize,
    pub graph_cells: usize,
    pub filtered_nodes: usize,
    pub edges: usize,
    pub time_train_dim: usize,
    pub test_steps: usize,
    pub idx_train_cl: usize,
    pub idx_train_reg: usize,
    pub idx_train_ae: usize,
    pub idx_test: usize,
    pub degenerate: bool,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    pub space: GraphCellSpace,
    pub filtered: FilteredNodes,
    pub targets: TrainingTargets,
    pub train_graph: TrainGraph,
    pub test_graph: TestGraph,
    pub index: TrainingIndex,
    pub idx_train_ae: Vec<i64>,
    pub idx_test: Vec<i64>,
    pub time_split: TimeSplit,
    pub report: RunReport,
}

impl PreprocessOutput {
    /// True when no cell qualifies as a training example.
    pub fn is_degenerate(&self) -> bool {
        self.report.degenerate
    }

    /// Persist every artifact.
    pub fn write(&self, writer: &ArtifactWriter) -> Result<()> {
        writer.write_npy(names::MASK_1_CELL, &self.filtered.mask_1_cell)?;
        writer.write_npy(names::MASK_9_CELLS, &self.filtered.mask_9_cells)?;

        writer.write_index(names::IDX_TEST, &self.idx_test)?;
        writer.write_index(names::IDX_TRAIN_AE, &self.idx_train_ae)?;
        writer.write_cells(names::IDX_TIME_TRAIN, &self.time_split.train)?;
        writer.write_cells(names::IDX_TIME_TEST, &self.time_split.test)?;
        writer.write_cells(names::VALID_EXAMPLES_SPACE, &self.space.valid_examples_space)?;
        writer.write_cells(names::GRAPH_CELLS_SPACE, &self.space.graph_cells_space)?;
        writer.write_npy(
            names::CELL_IDX_ARRAY,
            &Array1::from(self.filtered.cell_idx_array()),
        )?;
        writer.write_npy(
            names::CELL_VALID_ARRAY,
            &Array1::from(self.filtered.cell_valid_array()),
        )?;

        writer.write_graph(names::G_TRAIN, &self.train_graph)?;
        writer.write_graph(names::G_TEST, &self.test_graph)?;

        writer.write_npy(names::TARGET_TRAIN_CL, &self.targets.classification)?;
        writer.write_npy(names::TARGET_TRAIN_REG, &self.targets.regression)?;
        writer.write_npy(names::MASK_TRAIN_CL, &self.targets.classification_mask())?;
        writer.write_npy(names::MASK_TRAIN_REG, &self.targets.regression_mask())?;

        writer.write_index(names::IDX_TRAIN_CL, &self.index.idx_train_cl)?;
        writer.write_index(names::IDX_TRAIN_REG, &self.index.idx_train_reg)?;

        writer.write_json(names::REPORT, &self.report)?;
        Ok(())
    }
}

/// Runs the preprocessing stages for one configuration.
pub struct Preprocessor {
    config: PreprocessConfig,
    grid: LowResGrid,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        config.validate()?;
        let grid = config.grid()?;
        info!(
            lon_dim = grid.lon_dim,
            lat_dim = grid.lat_dim,
            cells = grid.len(),
            interval = grid.interval,
            "Low-resolution grid"
        );
        Ok(Self { config, grid })
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    pub fn grid(&self) -> &LowResGrid {
        &self.grid
    }

    pub fn run(&self, inputs: PipelineInputs) -> Result<PreprocessOutput> {
        let PipelineInputs {
            nodes,
            time_split,
            reference_table,
        } = inputs;
        let config = &self.config;

        self.check_time_axis(&nodes, &time_split)?;
        let reference = self.reference_stats(reference_table)?;

        let window = config.window();
        let windowed = cut_window(&nodes, &window);
        if windowed.is_empty() {
            warn!(window = ?window, "No node inside the window");
        } else {
            info!(nodes = windowed.len(), window = ?window, "Cut window");
        }

        let mapping = CellMapper::new(&self.grid, config.offset_9_cells)
            .with_progress_every(config.progress_every)
            .map(&windowed);

        let space = GraphCellSpace::select(&self.grid, &mapping.cell_valid);
        if space.is_empty() {
            warn!(
                valid_cells = mapping.valid_cells(),
                "valid_examples_space is empty, index lists will be empty"
            );
        }

        let filtered = filter_to_graph_space(&windowed, &mapping, &space);
        let graph_nodes = &filtered.nodes;

        let edges = build_edges(&graph_nodes.lon, &graph_nodes.lat, &config.edges);

        let targets = TrainingTargets::derive(
            &graph_nodes.precipitation,
            time_split.time_train_dim(),
            config.precipitation_threshold,
        )?;
        let (cl_defined, reg_defined) = defined_counts(&targets);
        info!(
            time_train_dim = time_split.time_train_dim(),
            cl_defined, reg_defined, "Derived training targets"
        );
        let y = test_targets(&graph_nodes.precipitation, &time_split)?;

        let feature_stats = match reference {
            Some(stats) => stats,
            None => self.local_stats(graph_nodes)?,
        };

        let parts = GraphParts {
            pos: positions(graph_nodes),
            x: feature_stats.standardize(graph_nodes),
            edges,
            low_res: Array1::from(filtered.low_res()),
        };
        let train_graph = parts.train_graph();
        let test_graph = parts.test_graph(y);

        let indexer = IndexBuilder::new(&space, self.grid.len())
            .with_progress_every(config.progress_every);
        let index = indexer.training_index(&filtered, &targets, &time_split.train);
        let idx_train_ae = indexer.encoder_index(&time_split.train);
        let idx_test = indexer.encoder_index(&time_split.test);

        let report = RunReport {
            config: config.clone(),
            grid: self.grid,
            standardization: config.standardization,
            reference_stats_path: match config.standardization {
                StandardizationMode::Reference => config.reference_stats_path.clone(),
                StandardizationMode::Local => None,
            },
            feature_stats,
            input_nodes: nodes.len(),
            windowed_nodes: windowed.len(),
            valid_cells: mapping.valid_cells(),
            valid_examples: space.valid_examples_space.len(),
            graph_cells: space.graph_cells_space.len(),
            filtered_nodes: graph_nodes.len(),
            edges: parts.edges.len(),
            time_train_dim: time_split.time_train_dim(),
            test_steps: test_graph.y.ncols(),
            idx_train_cl: index.idx_train_cl.len(),
            idx_train_reg: index.idx_train_reg.len(),
            idx_train_ae: idx_train_ae.len(),
            idx_test: idx_test.len(),
            degenerate: space.is_empty(),
        };

        Ok(PreprocessOutput {
            space,
            filtered,
            targets,
            train_graph,
            test_graph,
            index,
            idx_train_ae,
            idx_test,
            time_split,
            report,
        })
    }

    fn check_time_axis(&self, nodes: &HighResNodes, split: &TimeSplit) -> Result<()> {
        let available = nodes.n_times();
        if let Some(expected) = self.config.time_dim {
            if expected != available {
                return Err(PreprocessError::shape_mismatch("time_dim", expected, available));
            }
        }
        if let Some(max) = split.max_index() {
            if max >= available {
                return Err(PreprocessError::TimeRangeExceeded {
                    requested: max,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Reference statistics, resolved before any stage runs. `None` in local mode.
    fn reference_stats(&self, table: Option<Array2<f64>>) -> Result<Option<FeatureStats>> {
        if self.config.standardization == StandardizationMode::Local {
            info!(mode = %StandardizationMode::Local, "Standardizing with statistics of the filtered nodes");
            return Ok(None);
        }

        let table = match (table, &self.config.reference_stats_path) {
            (Some(table), _) => table,
            (None, Some(path)) => load_reference_table(path)?,
            (None, None) => {
                return Err(PreprocessError::MissingReferenceStats(
                    "reference mode needs reference_stats_path".to_string(),
                ))
            }
        };
        let stats = FeatureStats::from_reference_table(&table)?;
        info!(
            mode = %StandardizationMode::Reference,
            path = ?self.config.reference_stats_path,
            rows = table.nrows(),
            "Standardizing with reference statistics"
        );
        Ok(Some(stats))
    }

    fn local_stats(&self, nodes: &HighResNodes) -> Result<FeatureStats> {
        if nodes.is_empty() {
            warn!("No node left to compute local statistics, features are left unscaled");
            return Ok(FeatureStats::identity());
        }
        FeatureStats::from_nodes(nodes)
    }
}
