// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use log::{info, warn};

use spot_detect::export::{write_line_protocol, write_metrics_json,
                          write_projections, MetricsEntry};
use spot_detect::fixtures::{find_files, fixture_name};
use spot_detect::image_funcs::{load_grayscale, projections, Projections};
use spot_detect::{estimate_with_config, ContourApproximation, EstimatorConfig};

/// Measures the spot in each input image and exports the results.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Path of the image file or directory to process. Directories are
    /// searched recursively.
    #[arg(short, long)]
    input: PathBuf,

    /// File extension of images to pick up when `input` is a directory.
    #[arg(short, long, default_value = "png")]
    extension: String,

    /// Write measurements as a JSON list to this file.
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Write measurements as InfluxDB line protocol to this file.
    #[arg(short, long)]
    line_protocol: Option<PathBuf>,

    /// Write column and row intensity sums to this file.
    #[arg(short, long)]
    projections: Option<PathBuf>,

    /// Binarization threshold as a fraction of the peak pixel value.
    #[arg(short, long, default_value_t = EstimatorConfig::default().threshold_factor)]
    threshold_factor: f64,

    /// Contour points used for the spread: 'simple' or 'none'.
    #[arg(short, long, default_value_t = ContourApproximation::Simple)]
    approximation: ContourApproximation,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(args.threshold_factor > 0.0 && args.threshold_factor < 1.0) {
        bail!("threshold factor must be between 0 and 1, got {}",
              args.threshold_factor);
    }
    let config = EstimatorConfig{threshold_factor: args.threshold_factor,
                                 approximation: args.approximation};

    let input_metadata = fs::metadata(&args.input).with_context(
        || format!("Input file/dir {:?} does not exist?", args.input))?;
    let files = if input_metadata.is_dir() {
        find_files(&args.input, &args.extension)?
    } else {
        vec![args.input.clone()]
    };

    let run_start = Instant::now();
    let mut entries = Vec::<MetricsEntry>::new();
    let mut named_projections = Vec::<(String, Projections)>::new();
    for file in &files {
        if let Some((entry, proj)) = process_file(file, &config)? {
            entries.push(entry);
            named_projections.push(proj);
        }
    }
    info!("Measured {} of {} images in {:?}",
          entries.len(), files.len(), run_start.elapsed());

    let mut wrote_output = false;
    if let Some(path) = &args.json {
        write_metrics_json(path, &entries)?;
        wrote_output = true;
    }
    if let Some(path) = &args.line_protocol {
        write_line_protocol(path, &entries)?;
        wrote_output = true;
    }
    if let Some(path) = &args.projections {
        write_projections(path, &named_projections)?;
        wrote_output = true;
    }
    if !wrote_output {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    }
    Ok(())
}

// Undecodable files are skipped; any other failure aborts the run.
fn process_file(file: &Path, config: &EstimatorConfig)
                -> anyhow::Result<Option<(MetricsEntry, (String, Projections))>> {
    info!("Processing {:?}", file);
    let image = match load_grayscale(file) {
        Ok(image) => image,
        Err(e @ spot_detect::Error::Decode{..}) => {
            warn!("Skipping: {}", e);
            return Ok(None);
        },
        Err(e) => return Err(e.into()),
    };
    let parameters = estimate_with_config(&image, config)
        .with_context(|| format!("Measuring {:?}", file))?;
    let filename = fixture_name(file);
    let proj = (filename.clone(), projections(&image));
    Ok(Some((MetricsEntry{filename, parameters}, proj)))
}
