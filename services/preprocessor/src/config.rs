//! Building the run configuration from the YAML file and command-line flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use graph_preprocessing::{PreprocessConfig, StandardizationMode};
use precip_common::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Reference,
    Local,
}

impl From<ModeArg> for StandardizationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Reference => StandardizationMode::Reference,
            ModeArg::Local => StandardizationMode::Local,
        }
    }
}

/// Flat per-parameter overrides. Unset flags keep the file or default value.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Study window as "lon_min,lat_min,lon_max,lat_max"; single bound flags win over it
    #[arg(long, value_parser = parse_window)]
    pub window: Option<BoundingBox>,

    #[arg(long)]
    pub lon_min: Option<f64>,
    #[arg(long)]
    pub lon_max: Option<f64>,
    #[arg(long)]
    pub lat_min: Option<f64>,
    #[arg(long)]
    pub lat_max: Option<f64>,

    /// Low-resolution grid spacing (degrees)
    #[arg(long)]
    pub interval: Option<f64>,

    /// Padding of the 9-cell neighbourhood (degrees)
    #[arg(long = "offset-9-cells")]
    pub offset_9_cells: Option<f64>,

    /// Expected number of time steps in pr.npy
    #[arg(long)]
    pub time_dim: Option<usize>,

    /// Precipitation threshold (mm)
    #[arg(long)]
    pub precipitation_threshold: Option<f32>,

    #[arg(long)]
    pub lon_diff_max: Option<f64>,
    #[arg(long)]
    pub lat_diff_max: Option<f64>,

    #[arg(long)]
    pub first_year: Option<u32>,
    #[arg(long)]
    pub first_test_year: Option<u32>,
    #[arg(long)]
    pub end_year: Option<u32>,
    #[arg(long)]
    pub holdout_steps: Option<usize>,
    #[arg(long)]
    pub warmup_steps: Option<usize>,

    /// Log progress every N cells
    #[arg(long)]
    pub progress_every: Option<usize>,

    /// Tag appended to mask and graph file names
    #[arg(long)]
    pub suffix: Option<String>,

    /// Output directory
    #[arg(long, env = "PREPROCESS_OUTPUT_PATH")]
    pub output_path: Option<PathBuf>,

    /// Source of the standardization statistics
    #[arg(long, value_enum)]
    pub standardization: Option<ModeArg>,

    /// (lat, lon, elevation) reference table (.npy)
    #[arg(long = "reference-stats-file")]
    pub reference_stats_file: Option<PathBuf>,
}

fn parse_window(s: &str) -> Result<BoundingBox, String> {
    BoundingBox::from_csv(s).map_err(|e| e.to_string())
}

macro_rules! apply {
    ($($flag:expr => $field:expr),+ $(,)?) => {
        $(
            if let Some(value) = $flag.clone() {
                $field = value.into();
            }
        )+
    };
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut PreprocessConfig) {
        if let Some(window) = self.window {
            config.lon_min = window.lon_min;
            config.lat_min = window.lat_min;
            config.lon_max = window.lon_max;
            config.lat_max = window.lat_max;
        }
        apply! {
            self.lon_min => config.lon_min,
            self.lon_max => config.lon_max,
            self.lat_min => config.lat_min,
            self.lat_max => config.lat_max,
            self.interval => config.interval,
            self.offset_9_cells => config.offset_9_cells,
            self.precipitation_threshold => config.precipitation_threshold,
            self.lon_diff_max => config.edges.lon_diff_max,
            self.lat_diff_max => config.edges.lat_diff_max,
            self.first_year => config.time_split.first_year,
            self.first_test_year => config.time_split.first_test_year,
            self.end_year => config.time_split.end_year,
            self.holdout_steps => config.time_split.holdout_steps,
            self.warmup_steps => config.time_split.warmup_steps,
            self.progress_every => config.progress_every,
            self.suffix => config.suffix,
            self.output_path => config.output_path,
            self.standardization => config.standardization,
        }
        if self.time_dim.is_some() {
            config.time_dim = self.time_dim;
        }
        if self.reference_stats_file.is_some() {
            config.reference_stats_path = self.reference_stats_file.clone();
        }
    }
}

/// Load the optional YAML file, apply the flags and validate.
pub fn build_config(file: Option<&PathBuf>, overrides: &ConfigOverrides) -> Result<PreprocessConfig> {
    let mut config = match file {
        Some(path) => PreprocessConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PreprocessConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
