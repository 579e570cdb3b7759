//! Command-line interface for seam_inspect
//!
//! Inspects one panel photograph and prints the result as JSON. Optionally
//! writes the per-zone debug crops.

use clap::Parser;
use seam_inspect::image_loader::{load_image, save_image};
use seam_inspect::synthetic::SyntheticPanel;
use seam_inspect::{debug_crop, InspectionConfig, Inspector};
use std::path::PathBuf;
use std::process;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "inspect")]
#[command(about = "Measure seam pixel shift and discontinuity on a calibration panel photograph")]
struct Cli {
    /// Panel photograph (JPEG, PNG, BMP or TIFF).
    #[arg(required_unless_present = "synthetic_offset")]
    image: Option<PathBuf>,

    /// JSON configuration file; station defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the failing shift threshold in pixels.
    #[arg(long)]
    fail_px: Option<i32>,

    /// Evaluate the coarse distortion check.
    #[arg(long)]
    check_distortion: bool,

    /// Directory for per-zone debug crops.
    #[arg(long)]
    debug: Option<PathBuf>,

    /// Inspect a rendered station panel with zone 1 misaligned by this many rows.
    #[arg(long)]
    synthetic_offset: Option<i32>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = run(&Cli::parse()) {
        eprintln!("Inspection failed: {}", error);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => InspectionConfig::from_json_file(path)?,
        None => InspectionConfig::default(),
    };
    if let Some(fail_px) = cli.fail_px {
        config.fail_threshold_px = fail_px;
    }
    config.check_distortion |= cli.check_distortion;

    let image = match (&cli.image, cli.synthetic_offset) {
        (Some(path), _) => load_image(path)?,
        (None, Some(offset)) => SyntheticPanel::station().with_offset(1, offset).render()?,
        (None, None) => return Err("no image given".into()),
    };

    let inspector = Inspector::new(config)?;
    let result = inspector.inspect(&image)?;

    for zone in &result.zones {
        eprintln!(
            "Zone {}: {} px -> {}",
            zone.shift.zone,
            zone.shift.pixel_shift,
            if zone.passed { "PASS" } else { "FAIL" }
        );
    }
    if result.is_roi_error() {
        eprintln!("ROI error: calibration target not found at the expected position");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(dir) = &cli.debug {
        std::fs::create_dir_all(dir)?;
        let stem = cli
            .image
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("synthetic");
        for zone in &result.zones {
            let path = dir.join(format!("{}_zone{}.png", stem, zone.shift.zone));
            save_image(&path, &debug_crop(&image, zone)?)?;
            eprintln!("Debug: saved {}", path.display());
        }
    }

    process::exit(if result.passed { 0 } else { 2 });
}
