//! Persisted artifacts and their on-disk layout.
//!
//! Arrays are NumPy `.npy` files, graphs are bincode and the run report is
//! JSON. Every file is written to a temporary file in the output directory
//! and renamed into place, so a reader never sees a partial artifact.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use ndarray_npy::{read_npy, ReadNpyExt, WriteNpyExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{PreprocessError, Result};
use crate::graph::{TestGraph, TrainGraph};
use crate::pipeline::RunReport;

/// Artifact base names.
pub mod names {
    pub const MASK_1_CELL: &str = "mask_1_cell_subgraphs";
    pub const MASK_9_CELLS: &str = "mask_9_cells_subgraphs";
    pub const IDX_TEST: &str = "idx_test";
    pub const IDX_TRAIN_AE: &str = "idx_train_ae";
    pub const IDX_TRAIN_CL: &str = "idx_train_cl";
    pub const IDX_TRAIN_REG: &str = "idx_train_reg";
    pub const IDX_TIME_TRAIN: &str = "idx_time_train";
    pub const IDX_TIME_TEST: &str = "idx_time_test";
    pub const VALID_EXAMPLES_SPACE: &str = "valid_examples_space";
    pub const GRAPH_CELLS_SPACE: &str = "graph_cells_space";
    pub const CELL_IDX_ARRAY: &str = "cell_idx_array";
    pub const CELL_VALID_ARRAY: &str = "cell_valid_array";
    pub const G_TRAIN: &str = "G_train";
    pub const G_TEST: &str = "G_test";
    pub const TARGET_TRAIN_CL: &str = "target_train_cl";
    pub const TARGET_TRAIN_REG: &str = "target_train_reg";
    pub const MASK_TRAIN_CL: &str = "mask_train_cl";
    pub const MASK_TRAIN_REG: &str = "mask_train_reg";
    pub const REPORT: &str = "preprocessing_report";

    /// Artifacts whose file name carries the run suffix.
    pub const SUFFIXED: [&str; 4] = [MASK_1_CELL, MASK_9_CELLS, G_TRAIN, G_TEST];
}

/// File name for `name` with the given extension, applying `suffix` when the
/// artifact takes one.
pub fn file_name(name: &str, suffix: &str, extension: &str) -> String {
    if names::SUFFIXED.contains(&name) {
        format!("{name}{suffix}.{extension}")
    } else {
        format!("{name}.{extension}")
    }
}

/// Writes artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    suffix: String,
}

impl ArtifactWriter {
    /// Create the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PreprocessError::io(&dir, e))?;
        Ok(Self {
            dir,
            suffix: suffix.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        self.dir.join(file_name(name, &self.suffix, extension))
    }

    /// Write any ndarray array as `.npy`.
    pub fn write_npy<T: WriteNpyExt>(&self, name: &str, array: &T) -> Result<PathBuf> {
        let path = self.path_for(name, "npy");
        self.write_atomic(name, &path, |writer| {
            array.write_npy(writer).map_err(|e| PreprocessError::npy(&path, e))
        })?;
        Ok(path)
    }

    /// Write a flat index list as an `i64` `.npy` vector.
    pub fn write_index(&self, name: &str, index: &[i64]) -> Result<PathBuf> {
        self.write_npy(name, &Array1::from(index.to_vec()))
    }

    /// Write a list of cell indices as an `i64` `.npy` vector.
    pub fn write_cells(&self, name: &str, cells: &[usize]) -> Result<PathBuf> {
        let as_i64: Vec<i64> = cells.iter().map(|&c| c as i64).collect();
        self.write_index(name, &as_i64)
    }

    /// Write a graph object with bincode.
    pub fn write_graph<G: Serialize>(&self, name: &str, graph: &G) -> Result<PathBuf> {
        let path = self.path_for(name, "bin");
        self.write_atomic(name, &path, |writer| {
            bincode::serialize_into(writer, graph).map_err(|e| PreprocessError::GraphEncoding {
                path: path.clone(),
                message: e.to_string(),
            })
        })?;
        Ok(path)
    }

    /// Write a pretty-printed JSON document.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(name, "json");
        self.write_atomic(name, &path, |writer| {
            serde_json::to_writer_pretty(writer, value)
                .map_err(|e| PreprocessError::io(&path, e.into()))
        })?;
        Ok(path)
    }

    fn write_atomic<F>(&self, name: &str, path: &Path, encode: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
    {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| PreprocessError::io(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            encode(&mut writer)?;
            writer.flush().map_err(|e| PreprocessError::io(path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| PreprocessError::io(path, e))?;
        let file = tmp.persist(path).map_err(|e| PreprocessError::io(path, e.error))?;

        let bytes = file.metadata().map(|m| m.len()).unwrap_or_default();
        info!(artifact = name, path = %path.display(), bytes, "Wrote artifact");
        Ok(())
    }
}

/// Reads artifacts back from an output directory.
#[derive(Debug, Clone)]
pub struct ArtifactReader {
    dir: PathBuf,
    suffix: String,
}

impl ArtifactReader {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        self.dir.join(file_name(name, &self.suffix, extension))
    }

    pub fn read_npy<T: ReadNpyExt>(&self, name: &str) -> Result<T> {
        let path = self.path_for(name, "npy");
        read_npy(&path).map_err(|e| PreprocessError::npy(&path, e))
    }

    pub fn read_index(&self, name: &str) -> Result<Vec<i64>> {
        let array: Array1<i64> = self.read_npy(name)?;
        Ok(array.to_vec())
    }

    pub fn read_mask(&self, name: &str) -> Result<Array2<bool>> {
        self.read_npy(name)
    }

    pub fn read_targets(&self, name: &str) -> Result<Array2<f32>> {
        self.read_npy(name)
    }

    pub fn read_graph<G: DeserializeOwned>(&self, name: &str) -> Result<G> {
        let path = self.path_for(name, "bin");
        let file = File::open(&path).map_err(|e| PreprocessError::io(&path, e))?;
        bincode::deserialize_from(BufReader::new(file)).map_err(|e| PreprocessError::GraphEncoding {
            path: path.clone(),
            message: e.to_string(),
        })
    }

    pub fn train_graph(&self) -> Result<TrainGraph> {
        self.read_graph(names::G_TRAIN)
    }

    pub fn test_graph(&self) -> Result<TestGraph> {
        self.read_graph(names::G_TEST)
    }

    pub fn report(&self) -> Result<RunReport> {
        let path = self.path_for(names::REPORT, "json");
        let file = File::open(&path).map_err(|e| PreprocessError::io(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| PreprocessError::io(&path, e.into()))
    }
}
