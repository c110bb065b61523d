//! Precipitation graph preprocessor.
//!
//! Cuts the study window out of the high-resolution precipitation dataset,
//! maps the nodes onto the low-resolution grid and writes the graph, target,
//! mask and index artifacts consumed by the training data loaders.

mod config;
mod inputs;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use graph_preprocessing::{ArtifactWriter, PipelineInputs, Preprocessor};
use precip_common::split_by_years;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use config::{build_config, ConfigOverrides};
use inputs::{load_nodes, load_time_index, InputPaths};

#[derive(Parser, Debug)]
#[command(name = "preprocessor")]
#[command(about = "Build graph-cell artifacts for precipitation downscaling models")]
struct Args {
    /// YAML configuration file; flags below override its values
    #[arg(short, long, env = "PREPROCESS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory containing lon.npy, lat.npy and pr.npy
    #[arg(long)]
    precipitation_dir: PathBuf,

    /// Elevation per node (.npy)
    #[arg(long)]
    elevation_file: PathBuf,

    /// JSON list of per-year absolute time indices
    #[arg(long)]
    time_index_file: PathBuf,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Write artifacts even when no cell qualifies as a training example
    #[arg(long)]
    allow_empty: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_json) {
        eprintln!("{e:#}");
        std::process::exit(2);
    }

    if let Err(e) = run(args) {
        error!(error = %format!("{e:#}"), "Preprocessing failed");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt().with_env_filter(filter).with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}

fn run(args: Args) -> Result<()> {
    let start = Instant::now();
    let config = build_config(args.config.as_ref(), &args.overrides)?;
    info!(
        window = ?config.window(),
        interval = config.interval,
        output = %config.output_path.display(),
        "Starting preprocessing"
    );

    let paths = InputPaths {
        precipitation_dir: args.precipitation_dir,
        elevation_file: args.elevation_file,
        time_index_file: args.time_index_file,
    };
    let nodes = load_nodes(&paths)?;
    let years = load_time_index(&paths.time_index_file)?;
    let time_split = split_by_years(&years, &config.time_split).context("Invalid time split")?;
    info!(
        train = time_split.train.len(),
        test = time_split.test.len(),
        "Split time steps"
    );

    let preprocessor = Preprocessor::new(config.clone())?;
    let output = preprocessor.run(PipelineInputs {
        nodes,
        time_split,
        reference_table: None,
    })?;

    if output.is_degenerate() {
        if !args.allow_empty {
            bail!(
                "valid_examples_space is empty for window {:?}; refusing to write artifacts (use --allow-empty to override)",
                config.window()
            );
        }
        warn!("Writing artifacts of a run without valid example cells");
    }

    let writer = ArtifactWriter::new(&config.output_path, &config.suffix)?;
    output.write(&writer)?;

    info!(
        nodes = output.report.filtered_nodes,
        edges = output.report.edges,
        idx_train_cl = output.report.idx_train_cl,
        idx_train_reg = output.report.idx_train_reg,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Preprocessing completed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{create_cell_cloud, fixtures, four_node_scenario};

    fn args_for(dir: &std::path::Path, extra: &[&str]) -> Args {
        let files = fixtures::InputFiles::in_dir(dir);
        let out = dir.join("out");
        let mut argv = vec![
            "preprocessor".to_string(),
            "--precipitation-dir".to_string(),
            files.precipitation_dir.display().to_string(),
            "--elevation-file".to_string(),
            files.elevation_file.display().to_string(),
            "--time-index-file".to_string(),
            files.time_index_file.display().to_string(),
            "--output-path".to_string(),
            out.display().to_string(),
            "--standardization".to_string(),
            "local".to_string(),
            "--first-year".to_string(),
            "2001".to_string(),
            "--first-test-year".to_string(),
            "2002".to_string(),
            "--end-year".to_string(),
            "2002".to_string(),
            "--holdout-steps".to_string(),
            "0".to_string(),
            "--warmup-steps".to_string(),
            "0".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::parse_from(argv)
    }

    #[test]
    fn test_degenerate_run_refuses_to_write() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input_files(dir.path(), &four_node_scenario(), &[vec![0], vec![1]]).unwrap();
        let args = args_for(
            dir.path(),
            &["--lon-min", "0", "--lon-max", "2", "--lat-min", "0", "--lat-max", "2", "--interval", "1"],
        );

        let err = run(args).unwrap_err();
        assert!(err.to_string().contains("valid_examples_space is empty"));
        assert!(!dir.path().join("out").join("idx_train_cl.npy").exists());
    }

    #[test]
    fn test_degenerate_run_with_allow_empty_writes() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input_files(dir.path(), &four_node_scenario(), &[vec![0], vec![1]]).unwrap();
        let args = args_for(
            dir.path(),
            &[
                "--lon-min", "0", "--lon-max", "2", "--lat-min", "0", "--lat-max", "2",
                "--interval", "1", "--allow-empty",
            ],
        );

        run(args).unwrap();
        assert!(dir.path().join("out").join("idx_train_cl.npy").is_file());
    }

    #[test]
    fn test_full_run_writes_suffixed_graphs() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = create_cell_cloud((10.0, 45.0), 5, 5, 0.25, 2, 4);
        fixtures::write_input_files(dir.path(), &cloud, &[vec![0, 1, 2], vec![3]]).unwrap();
        let args = args_for(
            dir.path(),
            &["--window", "10,45,11.25,46.25", "--suffix", "_cli", "--time-dim", "4"],
        );
        assert_eq!(args.overrides.window.map(|w| w.lon_max), Some(11.25));

        run(args).unwrap();
        let out = dir.path().join("out");
        assert!(out.join("G_train_cli.bin").is_file());
        assert!(out.join("G_test_cli.bin").is_file());
        assert!(out.join("preprocessing_report.json").is_file());
    }

    #[test]
    fn test_time_dim_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cloud = create_cell_cloud((10.0, 45.0), 5, 5, 0.25, 2, 4);
        fixtures::write_input_files(dir.path(), &cloud, &[vec![0, 1, 2], vec![3]]).unwrap();
        let (lon_min, lat_min, lon_max, lat_max) = fixtures::window::SMALL_5X5;
        let bounds = [lon_min, lon_max, lat_min, lat_max].map(|v| v.to_string());
        let args = args_for(
            dir.path(),
            &[
                "--lon-min", bounds[0].as_str(), "--lon-max", bounds[1].as_str(),
                "--lat-min", bounds[2].as_str(), "--lat-max", bounds[3].as_str(),
                "--time-dim", "5",
            ],
        );

        assert!(run(args).is_err());
    }
}
