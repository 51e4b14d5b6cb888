//! face-overlay - replay recorded face landmarks over a frame sequence and
//! write the composited frames.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use face_overlay::{
    CameraFrame, Config, FrameSource, ImageSequence, OverlayAsset, OverlaySession, PngSequence,
    ReplayDetector,
};

#[derive(Parser, Debug)]
#[command(name = "face-overlay", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of input frames, read in file name order
    #[arg(short, long, required_unless_present = "list_styles")]
    frames: Option<PathBuf>,

    /// Landmark recording, one JSON record per frame
    #[arg(short, long, required_unless_present = "list_styles")]
    landmarks: Option<PathBuf>,

    /// Output directory for composited frames
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Overlay style from the config (overrides overlay.default_style)
    #[arg(short, long)]
    style: Option<String>,

    /// Overlay image to use instead of a configured style
    #[arg(long, conflicts_with = "style")]
    overlay: Option<PathBuf>,

    /// Landmarks are normalized to [0, 1] (overrides config)
    #[arg(long)]
    normalized: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// List configured overlay styles and exit
    #[arg(long)]
    list_styles: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

// caps the number of frames handed out by the wrapped source
struct Limited<F> {
    inner: F,
    remaining: u64,
}

impl<F: FrameSource> FrameSource for Limited<F> {
    fn next_frame(&mut self) -> face_overlay::Result<Option<CameraFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.inner.next_frame()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if args.normalized {
        config.replay.normalized = true;
    }
    config.validate()?;

    let mut session = OverlaySession::from_config(&config)?;

    if args.list_styles {
        for name in session.catalog().names() {
            println!("{}", name);
        }
        return Ok(());
    }

    if let Some(path) = &args.overlay {
        let asset = OverlayAsset::load("custom", path)
            .with_context(|| format!("loading overlay {}", path.display()))?;
        session.set_overlay(asset);
    } else if let Some(style) = &args.style {
        session.select_style(style)?;
    } else if config.overlay.default_style.is_none() {
        bail!("no overlay selected; pass --style, --overlay or set overlay.default_style");
    }

    // offline frames would otherwise race the decode
    session.wait_for_overlay();
    if session.overlay().is_none() {
        bail!("overlay image could not be loaded");
    }

    let (Some(frames_dir), Some(landmarks_path)) = (&args.frames, &args.landmarks) else {
        bail!("--frames and --landmarks are required");
    };

    let frames = ImageSequence::open(frames_dir)
        .with_context(|| format!("reading frames from {}", frames_dir.display()))?;
    let mut source = Limited {
        inner: frames,
        remaining: args.max_frames.unwrap_or(u64::MAX),
    };
    let mut detector = ReplayDetector::open(landmarks_path, config.replay.normalized)
        .with_context(|| format!("opening landmarks {}", landmarks_path.display()))?;
    let mut sink = PngSequence::create(&args.output)?;

    let summary = session.run(&mut source, &mut detector, &mut sink);

    info!(
        "Done: {} frames, {} drawn, {} without face, {} rejected, {} detection failures",
        summary.frames,
        summary.drawn,
        summary.no_face,
        summary.rejected,
        summary.detection_failures
    );
    info!("Wrote {} frames to {}", sink.written(), args.output.display());

    Ok(())
}
