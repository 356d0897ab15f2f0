//! Ocean forcing preparer.
//!
//! Converts CMEMS velocity anomalies into daily diffusivity files and
//! HYCOM per-depth currents into 3D currents files for the plume simulator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ingestion::{PreparerConfig, RunSummary};

#[derive(Parser, Debug)]
#[command(name = "preparer")]
#[command(about = "Prepare EKE diffusivity and 3D currents files for the plume simulator")]
struct Args {
    /// Configuration file path (defaults plus environment overrides if omitted)
    #[arg(short, long, env = "PREPARER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Daily diffusivity from velocity anomalies
    Eke,
    /// 3D currents from per-depth files
    Currents,
    /// Print the header and a summary of a container file
    Inspect {
        /// Container to inspect
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs)?;

    match &args.command {
        Command::Inspect { file } => inspect(file),
        Command::Eke => {
            let config = load_config(args.config.as_deref())?;
            let summary = run_eke(&config)?;
            report(&summary);
            Ok(())
        }
        Command::Currents => {
            let config = load_config(args.config.as_deref())?;
            let summary = run_currents(&config)?;
            report(&summary);
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PreparerConfig> {
    let config = match path {
        Some(path) => PreparerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let config = PreparerConfig::from_env();
            config.validate().context("Invalid configuration")?;
            config
        }
    };
    info!(
        eke_input = %config.eke.input_dir.display(),
        currents_input = %config.currents.input_dir.display(),
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(feature = "netcdf")]
fn run_eke(config: &PreparerConfig) -> Result<RunSummary> {
    let pipeline = ingestion::EkePipeline::new(config, ingestion::NetCdfInputs::new());
    pipeline.run().context("EKE pipeline failed")
}

#[cfg(feature = "netcdf")]
fn run_currents(config: &PreparerConfig) -> Result<RunSummary> {
    let pipeline = ingestion::CurrentsPipeline::new(config, ingestion::NetCdfInputs::new());
    pipeline.run().context("Currents pipeline failed")
}

#[cfg(not(feature = "netcdf"))]
fn run_eke(_config: &PreparerConfig) -> Result<RunSummary> {
    anyhow::bail!("NetCDF support is not compiled in; rebuild with `--features netcdf`")
}

#[cfg(not(feature = "netcdf"))]
fn run_currents(_config: &PreparerConfig) -> Result<RunSummary> {
    anyhow::bail!("NetCDF support is not compiled in; rebuild with `--features netcdf`")
}

fn report(summary: &RunSummary) {
    for failure in &summary.report.failures {
        warn!(unit = %failure.unit, error = %failure.error, "Failed unit");
    }
    if let Some(path) = &summary.manifest {
        info!(manifest = %path.display(), "Manifest written");
    }
}

/// Print a JSON summary of a container to stdout.
fn inspect(path: &Path) -> Result<()> {
    use container::{read_coordinates, read_currents, read_file, read_header, Header};
    use field_common::GridShape;
    use serde_json::json;

    let bytes = read_file(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let header = read_header(&bytes).with_context(|| format!("Invalid container {}", path.display()))?;
    info!(file = %path.display(), header = %header, "Read header");

    let summary = match header {
        Header::Coordinates { n_lat, n_lon } => {
            let grid = read_coordinates(&bytes)?;
            json!({
                "kind": "coordinates",
                "version": header.version(),
                "n_lat": n_lat,
                "n_lon": n_lon,
                "bbox": grid.bbox(),
            })
        }
        Header::Daily {
            date,
            scaled_max_error,
        } => {
            let cells = (bytes.len() - header.byte_len()) / 2;
            let field = container::read_daily_field(&bytes, GridShape::new(1, cells))?;
            let stats = field.field.stats();
            json!({
                "kind": "daily",
                "version": header.version(),
                "date": date.to_string(),
                "cells": cells,
                "max_error": scaled_max_error as f64 / 1000.0,
                "min": stats.min,
                "max": stats.max,
                "mean": stats.mean,
            })
        }
        Header::Currents { .. } => {
            let currents = read_currents(&bytes)?;
            let coverage: Vec<f64> = currents.u.iter().map(|u| u.stats().coverage()).collect();
            json!({
                "kind": "currents",
                "version": header.version(),
                "date": currents.date.to_string(),
                "shape": currents.grid.shape(),
                "n_depth": currents.n_depth(),
                "bbox": currents.grid.bbox(),
                "u_coverage": coverage,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
