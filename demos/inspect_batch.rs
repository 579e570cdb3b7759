//! Batch CLI for seam_inspect
//!
//! Inspects every image in a directory in name order and writes one report
//! row per zone. Setting the stop file between images cancels the rest of
//! the batch.

use clap::Parser;
use seam_inspect::batch::{find_images, BatchInspector};
use seam_inspect::report::write_report_file;
use seam_inspect::InspectionConfig;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "inspect_batch")]
#[command(about = "Inspect a directory of calibration panel photographs")]
struct Cli {
    /// Directory of panel photographs.
    input: PathBuf,

    /// Report file (comma separated).
    #[arg(long, default_value = "seam_results.csv")]
    out: PathBuf,

    /// JSON configuration file; station defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after the current image once this file exists.
    #[arg(long)]
    stop_file: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run(&Cli::parse()) {
        eprintln!("Batch failed: {}", error);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => InspectionConfig::from_json_file(path)?,
        None => InspectionConfig::default(),
    };
    let batch = BatchInspector::new(config)?;

    let paths = find_images(&cli.input)?;
    if paths.is_empty() {
        return Err(format!("no image files found in {}", cli.input.display()).into());
    }
    eprintln!("Found {} image files to process", paths.len());

    let cancel = AtomicBool::new(false);
    let total = paths.len();
    let mut done = 0;
    let summary = batch.run_with(&paths, &cancel, |entry| {
        done += 1;
        match &entry.outcome {
            Ok(result) => eprintln!(
                "[{}/{}] {}: max {} px -> {}",
                done,
                total,
                entry.file_name(),
                result.max_shift(),
                if result.passed { "PASS" } else { "FAIL" }
            ),
            Err(message) => eprintln!("[{}/{}] {}: skipped ({})", done, total, entry.file_name(), message),
        }
        if cli.stop_file.as_ref().is_some_and(|f| f.exists()) {
            cancel.store(true, Ordering::Relaxed);
        }
    });

    write_report_file(&cli.out, &summary.report_rows())?;

    eprintln!();
    eprintln!(
        "Passed: {}  Failed: {}  Skipped: {}{}",
        summary.passed(),
        summary.failed(),
        summary.skipped(),
        if summary.cancelled { "  (cancelled)" } else { "" }
    );
    eprintln!("Report written to {}", cli.out.display());
    Ok(())
}
