//! Graph-cell preprocessing for high-resolution precipitation data
//!
//! This crate turns irregular high-resolution points (lon, lat, elevation and
//! a precipitation series per point) into the artifacts used to train a
//! graph model on a regular low-resolution grid:
//!
//! - **Cell memberships**: which points each low-resolution cell owns
//!   (1-cell) and which lie in its padded neighbourhood (9-cell)
//! - **Graph cell space**: interior cells with data plus their neighbours
//! - **Proximity graph**: edges between points closer than fixed lon/lat offsets
//! - **Targets and indices**: rain/no-rain and rain-amount targets, and the
//!   flat `(time, cell)` example lists used to address samples
//!
//! # Architecture
//!
//! ```text
//! HighResNodes
//!      │
//!      ▼
//! cut_window(window)
//!      │
//!      ▼
//! CellMapper::map ──► GraphCellSpace::select ──► filter_to_graph_space
//!                                                      │
//!            ┌─────────────────┬───────────────────────┤
//!            ▼                 ▼                       ▼
//!       build_edges    TrainingTargets::derive   FeatureStats::standardize
//!            │                 │                       │
//!            └────────► GraphParts ◄───────────────────┘
//!                              │
//!                              ▼
//!                    IndexBuilder ──► ArtifactWriter
//! ```
//!
//! # Example
//!
//! ```ignore
//! use graph_preprocessing::{ArtifactWriter, PipelineInputs, PreprocessConfig, Preprocessor};
//!
//! let config = PreprocessConfig::from_yaml_file("preprocess.yaml")?;
//! let output = Preprocessor::new(config.clone())?.run(PipelineInputs {
//!     nodes,
//!     time_split,
//!     reference_table: None,
//! })?;
//! output.write(&ArtifactWriter::new(&config.output_path, &config.suffix)?)?;
//! ```

pub mod artifacts;
pub mod cells;
pub mod config;
pub mod edges;
pub mod error;
pub mod graph;
pub mod index;
pub mod nodes;
pub mod pipeline;
pub mod space;
pub mod standardize;
pub mod targets;
pub mod window;

// Re-export commonly used types at crate root
pub use artifacts::{names, ArtifactReader, ArtifactWriter};
pub use cells::{CellAssignment, CellMapper, CellMapping};
pub use config::PreprocessConfig;
pub use edges::{build_edges, EdgeSet, EdgeThresholds, LAT_DIFF_MAX, LON_DIFF_MAX};
pub use error::{PreprocessError, Result};
pub use graph::{GraphParts, TestGraph, TrainGraph};
pub use index::{decode_key, encode_key, IndexBuilder, TrainingIndex};
pub use nodes::HighResNodes;
pub use pipeline::{PipelineInputs, PreprocessOutput, Preprocessor, RunReport};
pub use space::{filter_to_graph_space, FilteredNodes, GraphCellSpace};
pub use standardize::{load_reference_table, FeatureStats, StandardizationMode};
pub use targets::{test_targets, TrainingTargets};
pub use window::cut_window;
