//! pinch_shot — interactive entry point.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing::info;

use pinch_shot::app::run;
use pinch_shot::config::Config;
use pinch_shot::overlay::RenderMode;
use pinch_shot::pipeline::CaptureOutcome;

#[derive(Parser, Debug)]
#[command(name = "pinch_shot", about = "Pinch-triggered fingertip calibration for LeapMotion")]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, default_value = "pinch_shot.toml")]
    config: PathBuf,

    /// Directory the calibration record is written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Start with the skeleton hands format instead of dots
    #[arg(long)]
    skeleton: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinch_shot=info,hand_pinch=info".into()),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Pinch Shot — LeapMotion fingertip calibration       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard simulation  (use --features leap for hardware)");
    println!();
    println!("  X exit   H/S/D tracking mode   F skeleton/dots");
    #[cfg(not(feature = "leap"))]
    println!("  P (hold) pinch   L/R hide or show a hand");
    println!();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(dir) = cli.output_dir {
        config.calibration.output_dir = dir;
    }
    if cli.skeleton {
        config.display.hands_format = RenderMode::Skeleton;
    }
    config.validate()?;

    info!("pinch_shot v{} starting", env!("CARGO_PKG_VERSION"));
    let summary = run(config)?;

    println!();
    println!("  Frames processed: {}", summary.frames_processed);
    match &summary.capture {
        Some(CaptureOutcome::Saved(path)) => println!("  Calibration saved: {}", path.display()),
        Some(CaptureOutcome::Failed(reason)) => println!("  Calibration FAILED: {}", reason),
        None => println!("  No calibration captured."),
    }

    if summary.capture_failed() {
        bail!("calibration record was not written");
    }
    Ok(())
}
