// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use spot_detect::checks::{run_fixture_checks, ResultCollector, DEFAULT_ACCURACY};
use spot_detect::fixtures::{create_fixture, regenerate_images, FixtureSpec,
                            DEFAULT_HEIGHT, DEFAULT_WIDTH};
use spot_detect::{ContourApproximation, EstimatorConfig};

/// Creates Gaussian spot fixtures and checks the estimator against them.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Writes a fixture: expected parameters as YAML plus the rendered image.
    /// Omitting any of x0, y0 or std creates an empty (all black) fixture.
    Create {
        /// Directory holding the fixtures.
        #[arg(short, long)]
        dir: PathBuf,

        /// Fixture name; files are written as <name>.yaml and <name>.png.
        #[arg(short, long)]
        name: String,

        /// Horizontal offset of the spot from the image center, right positive.
        #[arg(long, allow_hyphen_values = true)]
        x0: Option<f64>,

        /// Vertical offset of the spot from the image center, up positive.
        #[arg(long, allow_hyphen_values = true)]
        y0: Option<f64>,

        /// Standard deviation of the spot, in pixels.
        #[arg(short, long)]
        std: Option<f64>,

        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,

        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: u32,
    },

    /// Re-renders the image of every fixture from its YAML file.
    Regenerate {
        #[arg(short, long)]
        dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,

        #[arg(long, default_value_t = DEFAULT_HEIGHT)]
        height: u32,
    },

    /// Measures every fixture image and compares against its YAML file.
    Check {
        #[arg(short, long)]
        dir: PathBuf,

        /// Required agreement between expected and measured values, in (0, 1].
        #[arg(short, long, default_value_t = DEFAULT_ACCURACY)]
        accuracy: f64,

        /// Where to write the check outcomes as JSON.
        #[arg(short, long, default_value = "test_results.json")]
        results: PathBuf,

        /// Binarization threshold as a fraction of the peak pixel value.
        #[arg(short, long, default_value_t = EstimatorConfig::default().threshold_factor)]
        threshold_factor: f64,

        /// Contour points used for the spread: 'simple' or 'none'.
        #[arg(long, default_value_t = ContourApproximation::Simple)]
        approximation: ContourApproximation,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    match Args::parse().command {
        Command::Create{dir, name, x0, y0, std, width, height} => {
            let spec = FixtureSpec{x0, y0, std};
            let path = create_fixture(&dir, &name, &spec, width, height)
                .with_context(|| format!("Creating fixture '{}'", name))?;
            println!("{}", path.display());
        },
        Command::Regenerate{dir, width, height} => {
            let count = regenerate_images(&dir, width, height)
                .with_context(|| format!("Regenerating fixtures in {:?}", dir))?;
            println!("Regenerated {} images", count);
        },
        Command::Check{dir, accuracy, results, threshold_factor, approximation} => {
            if !(accuracy > 0.0 && accuracy <= 1.0) {
                bail!("accuracy must be in (0, 1], got {}", accuracy);
            }
            if !(threshold_factor > 0.0 && threshold_factor < 1.0) {
                bail!("threshold factor must be between 0 and 1, got {}",
                      threshold_factor);
            }
            let config = EstimatorConfig{threshold_factor, approximation};
            let mut collector = ResultCollector::new();
            let count = run_fixture_checks(&dir, &config, accuracy, &mut collector)
                .with_context(|| format!("Checking fixtures in {:?}", dir))?;
            collector.write_json(&results)?;
            info!("Wrote {} outcomes to {:?}", collector.outcomes().len(), results);
            println!("{} fixtures, {} checks passed, {} failed",
                     count, collector.passed_count(), collector.failed_count());
            if !collector.all_passed() {
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
