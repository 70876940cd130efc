// src/main.rs
mod batch;
mod config;
mod drivers;
mod gui;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::batch::DriveOutcome;
use crate::config::ConfigSession;
use crate::drivers::plot::format_hz;
use crate::drivers::{DialogSelector, FixedSelector, PlotPipeline};
use crate::gui::NativeViewer;

/// Plots raw int16 captures (time and FFT views) and exports them as PNG
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory swept recursively for .bin captures
    #[arg(long, default_value = batch::DEFAULT_ROOT)]
    root: PathBuf,

    /// Flat JSON configuration, created on exit if missing
    #[arg(long, default_value = "bin_plotter_config.json")]
    config: PathBuf,

    /// Plot this capture only instead of sweeping the root directory
    #[arg(long)]
    input: Option<PathBuf>,

    /// Log file appended to in addition to stderr
    #[arg(long, default_value = "bin_plotter.log")]
    log_file: PathBuf,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let session = ConfigSession::open(&args.config)
        .with_context(|| format!("cannot start with configuration {}", args.config.display()))?;
    let log_file = (!args.no_log_file).then_some(args.log_file.as_path());
    logging::init_logging(session.config().log_level.to_level_filter(), log_file)?;

    let result = match args.input.clone() {
        Some(input) => {
            let selector = FixedSelector::new(Some(input));
            let mut pipeline = PlotPipeline::new(session.config(), selector, NativeViewer);
            pipeline.run_one(None).map(DriveOutcome::Single)
        }
        None => {
            let mut pipeline = PlotPipeline::new(session.config(), DialogSelector, NativeViewer);
            batch::drive(&args.root, &mut pipeline)
        }
    };
    // saved whatever the run returned
    let saved = session.finish();

    match result? {
        DriveOutcome::Single(outcome) => {
            let peak = match outcome.peak {
                Some((hz, db)) => format!(", peak {} at {db:.1} dB", format_hz(hz)),
                None => String::new(),
            };
            match outcome.exported {
                Some(image) => info!(
                    "{} ({} samples{peak}) rendered to {}",
                    outcome.source.display(),
                    outcome.samples,
                    image.display()
                ),
                None => info!(
                    "{} ({} samples{peak}) plotted",
                    outcome.source.display(),
                    outcome.samples
                ),
            }
        }
        DriveOutcome::Batch(report) if report.failed > 0 => {
            warn!("{} capture(s) could not be plotted", report.failed)
        }
        DriveOutcome::Batch(_) => {}
    }
    saved.context("cannot save configuration")?;
    Ok(())
}
