use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod batch;
mod codec;
mod config;
mod enhance;
mod error;
mod raster;

use enhance::{LightingMode, RangeMethod};

#[derive(Parser, Debug)]
#[command(name = "auto-enhance")]
#[command(about = "Image enhancement: lighting restoration and contrast stretching")]
#[command(version)]
pub struct Args {
    /// Input image paths
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output paths, one per input (defaults to overwriting the inputs)
    #[arg(short = 'o', long = "output", num_args = 1.., value_name = "OUT")]
    pub outputs: Vec<PathBuf>,

    /// Output image extension (e.g. "png", "jpg")
    #[arg(short, long)]
    pub format: Option<String>,

    /// Text appended to the file stem of each output
    #[arg(long)]
    pub suffix: Option<String>,

    /// Make a grayscale image
    #[arg(short, long, env = "ENHANCE_GRAY")]
    pub gray: bool,

    /// Sigma of the gaussian blur used for lighting normalization (default: height / 30)
    #[arg(short, long, env = "ENHANCE_SIGMA", allow_negative_numbers = true)]
    pub sigma: Option<f32>,

    /// Low and high thresholds for contrast stretching
    #[arg(short, long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
    pub thrs: Option<Vec<f64>>,

    /// How stretch bounds are found: "mode" or "percentile"
    #[arg(short, long, env = "ENHANCE_RANGE", default_value = "mode")]
    pub range: RangeMethod,

    /// Lighting normalization: "none", "ratio" or "log"
    #[arg(short, long, env = "ENHANCE_LIGHTING", default_value = "none")]
    pub lighting: LightingMode,

    /// JPEG quality (1-100)
    #[arg(short, long, env = "ENHANCE_QUALITY", default_value = "95")]
    pub quality: u8,

    /// Number of images processed concurrently (default: available cores)
    #[arg(short, long, env = "ENHANCE_JOBS")]
    pub jobs: Option<usize>,

    /// Write a JSON report of every processed file to this path
    #[arg(long, env = "ENHANCE_REPORT")]
    pub report: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for completion lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::try_from(args)?;

    tracing::info!("Starting auto-enhance v{}", env!("CARGO_PKG_VERSION"));
    let thresholds = config.effective_thresholds();
    tracing::info!(
        "{} file(s), range={} ({}, {}), lighting={}, jobs={}",
        config.files.len(),
        config.pipeline.range_method,
        thresholds.low,
        thresholds.high,
        config.pipeline.lighting,
        config.jobs
    );

    let summary = batch::run(config).await?;
    if summary.failed > 0 {
        anyhow::bail!("{} of {} file(s) failed", summary.failed, summary.total);
    }
    Ok(())
}
