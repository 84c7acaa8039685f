use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use framedetect_core::capture::domain::frame_source::FrameSource;
use framedetect_core::capture::infrastructure::image_file_source::ImageFileSource;
use framedetect_core::capture::infrastructure::synthetic_camera::{SyntheticCamera, DEFAULT_FPS};
use framedetect_core::detection::domain::detector::{Detector, DetectorFactory};
use framedetect_core::detection::domain::image_results::ImageResults;
use framedetect_core::detection::infrastructure::simulated_detector::{
    SimulatedDetector, DEFAULT_DARK_THRESHOLD,
};
use framedetect_core::dispatch::async_dispatcher::{AsyncDispatcher, DetectorEventListener};
use framedetect_core::dispatch::dispatch_logger::StdoutDispatchLogger;
use framedetect_core::session::live_detection_use_case::{LiveDetectionUseCase, SessionSummary};
use framedetect_core::shared::config::{DetectorSettings, DispatcherConfig};
use framedetect_core::shared::frame_rate::FrameRateMeter;

/// Runs a face/emotion detector asynchronously over a camera feed or images.
#[derive(Parser)]
#[command(name = "framedetect")]
struct Cli {
    /// Still images to analyse. Without any, a synthetic camera is used.
    images: Vec<PathBuf>,

    /// Frames the synthetic camera produces.
    #[arg(long, default_value = "300")]
    frames: usize,

    /// Synthetic camera frame rate.
    #[arg(long, default_value_t = DEFAULT_FPS)]
    fps: f64,

    /// Deliver synthetic frames at the camera rate instead of as fast as possible.
    #[arg(long)]
    realtime: bool,

    /// Simulated per-frame detector latency in milliseconds.
    #[arg(long, default_value = "30")]
    latency_ms: u64,

    /// Mean luma (0-255) below which no face is reported.
    #[arg(long, default_value_t = DEFAULT_DARK_THRESHOLD)]
    dark_threshold: f64,

    /// Frames allowed in flight before new ones are dropped (overrides config).
    #[arg(long)]
    max_frames_waiting: Option<usize>,

    /// Minimum spacing in seconds between submitted timestamps (overrides config).
    #[arg(long)]
    epsilon: Option<f64>,

    /// JSON config file (defaults to the per-user config if present).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = load_config(&cli)?;
    let epsilon = config.timestamp_epsilon;

    let factory = build_factory(cli.latency_ms, cli.dark_threshold);
    let mut dispatcher = AsyncDispatcher::new(factory, config)
        .with_logger(Box::new(StdoutDispatchLogger::default()));
    dispatcher.set_listener(Box::new(ResultPrinter::default()));

    let images = ImageFileSource::new(cli.images.clone());
    let still_images = !images.is_empty();
    let total = if still_images { images.len() } else { cli.frames };
    let source: Box<dyn FrameSource> = if still_images {
        Box::new(images)
    } else {
        Box::new(
            SyntheticCamera::new(cli.frames)
                .with_fps(cli.fps)
                .with_realtime(cli.realtime),
        )
    };

    let progress: Box<dyn Fn(u64) -> bool + Send> = Box::new(move |read| {
        eprint!("\rReading frame {read}/{total}");
        true
    });

    let mut use_case = LiveDetectionUseCase::new(source, dispatcher, epsilon)
        .with_pace_to_detector(still_images)
        .with_progress(progress);
    let summary = use_case.execute()?;
    eprintln!();

    report(&summary);
    Ok(())
}

fn build_factory(latency_ms: u64, dark_threshold: f64) -> DetectorFactory {
    Arc::new(move |settings: &DetectorSettings| {
        Box::new(
            SimulatedDetector::new(settings.clone())
                .with_latency(Duration::from_millis(latency_ms))
                .with_dark_threshold(dark_threshold),
        ) as Box<dyn Detector>
    })
}

fn load_config(cli: &Cli) -> Result<DispatcherConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => DispatcherConfig::load(path)?,
        None => DispatcherConfig::load_or_default()?,
    };
    if let Some(max) = cli.max_frames_waiting {
        config.max_frames_waiting = max;
    }
    if let Some(epsilon) = cli.epsilon {
        config.timestamp_epsilon = epsilon;
    }
    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(missing) = cli.images.iter().find(|p| !p.exists()) {
        return Err(format!("Input file not found: {}", missing.display()).into());
    }
    if let Some(path) = &cli.config {
        if !Path::new(path).exists() {
            return Err(format!("Config file not found: {}", path.display()).into());
        }
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    if !(0.0..=255.0).contains(&cli.dark_threshold) {
        return Err(format!(
            "Dark threshold must be between 0 and 255, got {}",
            cli.dark_threshold
        )
        .into());
    }
    Ok(())
}

fn report(summary: &SessionSummary) {
    let dispatch = &summary.dispatch;
    log::info!(
        "Read {} frames ({:.1} fps), {} skipped by timestamp gate",
        summary.frames_read,
        summary.camera_fps,
        summary.frames_gated
    );
    log::info!(
        "Submitted {}, accepted {}, dropped {}, results {}",
        dispatch.frames_submitted,
        dispatch.frames_accepted,
        dispatch.frames_dropped,
        dispatch.results_delivered
    );
    if let Some(worker) = &summary.worker {
        log::info!(
            "Worker forwarded {} frames, discarded {}, purged {} commands",
            worker.frames_forwarded,
            worker.frames_discarded,
            worker.purged
        );
    }
}

/// Logs every result with its dominant emotion and tracks detector fps.
#[derive(Default)]
struct ResultPrinter {
    detector_rate: FrameRateMeter,
}

impl DetectorEventListener for ResultPrinter {
    fn on_detector_started(&mut self) {
        log::info!("Detector ready");
        self.detector_rate.reset();
    }

    fn on_image_results(&mut self, results: ImageResults) {
        self.detector_rate.tick();
        let (w, h) = results.frame.oriented_dimensions();
        match results.primary_face() {
            Some(face) => {
                let dominant = face
                    .dominant_emotion()
                    .map(|(metric, score)| format!("{metric} {score:.0}"))
                    .unwrap_or_else(|| "none".into());
                log::info!(
                    "t={:.3}s {}x{} faces={} id={} dominant={} ({:.1} fps)",
                    results.timestamp,
                    w,
                    h,
                    results.faces.len(),
                    face.id,
                    dominant,
                    self.detector_rate.fps()
                );
            }
            None => log::info!(
                "t={:.3}s {}x{} no face ({:.1} fps)",
                results.timestamp,
                w,
                h,
                self.detector_rate.fps()
            ),
        }
    }
}
