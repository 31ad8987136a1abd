use anyhow::Context;
use clap::Parser;
use depth_overlay::core_modules::depth_buffer::{DepthBuffer, OwnedDepthMap};
use depth_overlay::core_modules::utils::image_helper::image_helper::save_png;
use depth_overlay::{DepthOverlayPipeline, PipelineConfig, Report};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::info;

/// Annotate a single depth frame and write the result as PNG.
#[derive(Parser)]
#[command(name = "overlay_tester")]
#[command(version)]
struct Args {
    /// Raw little-endian f32 depth map (meters). A synthetic left-to-right
    /// gradient is used when omitted.
    #[arg(long)]
    depth: Option<PathBuf>,

    /// Depth map width in samples
    #[arg(long, default_value = "256")]
    width: usize,

    /// Depth map height in samples
    #[arg(long, default_value = "192")]
    height: usize,

    /// Color frame to annotate. Defaults to the depth preview.
    #[arg(long)]
    color: Option<PathBuf>,

    /// Pipeline configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the annotated image
    #[arg(short, long, default_value = "overlay.png")]
    output: PathBuf,

    /// Where to write the oriented, cropped live feed
    #[arg(long)]
    live_output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG to control log level, e.g. RUST_LOG=depth_overlay=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let depth = match &args.depth {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading depth map {}", path.display()))?;
            OwnedDepthMap::from_le_bytes(&bytes, args.width, args.height)?
        }
        None => synthetic_depth(args.width, args.height, config.preview_max_depth),
    };

    let color = match &args.color {
        Some(path) => image::open(path)
            .with_context(|| format!("opening color frame {}", path.display()))?
            .to_rgba8(),
        None => {
            DepthBuffer::from_samples(depth.samples(), args.width, args.height)?
                .to_preview(config.preview_max_depth)
        }
    };

    let pipeline = DepthOverlayPipeline::new(config)?;
    let report = pipeline.process_frame(&color, Some(&depth))?;

    if let Some(path) = &args.live_output {
        write(path, report.live_feed())?;
    }
    match report {
        Report::Annotated(data) => {
            let valid = data.samples.iter().filter(|s| s.is_valid()).count();
            for sample in &data.samples {
                println!(
                    "({:.3}, {:.3}) -> {:.2} m",
                    sample.point.x, sample.point.y, sample.depth
                );
            }
            write(&args.output, data.overlay.image())?;
            info!(valid, total = data.samples.len(), "overlay written");
            println!("Processing complete. Output saved to {}", args.output.display());
        }
        Report::NoDepthData { .. } => println!("No depth data; nothing to annotate."),
    }

    Ok(())
}

/// Depth rising linearly from 0 at the left edge to `max_depth` at the right.
fn synthetic_depth(width: usize, height: usize, max_depth: f32) -> OwnedDepthMap {
    OwnedDepthMap::from_fn(width, height, |x, _| x as f32 / width as f32 * max_depth)
}

fn write(path: &Path, image: &RgbaImage) -> anyhow::Result<()> {
    save_png(path, image).with_context(|| format!("writing {}", path.display()))
}
