use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use image::DynamicImage;
use tracing::info;

use facedet_core::config::AppConfig;
use facedet_core::consts::{DEFAULT_BENCH_LOG_PATH, DEFAULT_CONFIG_PATH};
use facedet_core::detector::Detector;
use facedet_core::logging::init_tracing;
use facedet_core::render::load_image;

#[derive(Parser)]
#[command(name = "facedet-bench")]
#[command(about = "Measure end-to-end detection latency on one image")]
struct Args {
    #[arg(help = "Input image path, overrides `input.image_path`")]
    image: Option<PathBuf>,

    #[arg(help = "ONNX model path, overrides `model.path`")]
    model: Option<PathBuf>,

    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long, help = "Second configuration timed against `--config`, e.g. a GPU one")]
    compare: Option<PathBuf>,

    #[arg(short, long, default_value_t = 10)]
    iterations: usize,

    #[arg(short, long, default_value_t = 3)]
    warmup: usize,

    #[arg(long, default_value = DEFAULT_BENCH_LOG_PATH)]
    log_file: PathBuf,

    #[arg(long, help = "Only log to the console")]
    no_log_file: bool,
}

/// Latency summary of a timed run, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LatencyStats {
    avg: f64,
    min: f64,
    max: f64,
}

impl LatencyStats {
    fn from_timings(timings: &[f64]) -> Option<Self> {
        if timings.is_empty() {
            return None;
        }
        let total: f64 = timings.iter().sum();
        Some(Self {
            avg: total / timings.len() as f64,
            min: timings.iter().copied().fold(f64::INFINITY, f64::min),
            max: timings.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// How `candidate` compares with `baseline`, e.g. `2.00x faster`.
fn relative_speed(baseline: &LatencyStats, candidate: &LatencyStats) -> String {
    if candidate.avg < baseline.avg {
        format!("{:.2}x faster", baseline.avg / candidate.avg)
    } else {
        format!("{:.2}x slower", candidate.avg / baseline.avg)
    }
}

/// Loads a configuration with the command line path overrides applied.
fn load_config(
    path: &Path,
    image: Option<&PathBuf>,
    model: Option<&PathBuf>,
) -> Result<AppConfig, Box<dyn Error>> {
    let mut config = AppConfig::load_from_path(path)?;
    config.override_paths(image.cloned(), model.cloned());
    Ok(config)
}

fn run_benchmark(
    config: &AppConfig,
    image: &DynamicImage,
    warmup: usize,
    iterations: usize,
) -> Result<LatencyStats, Box<dyn Error>> {
    let mut detector = Detector::from_config(config)?;
    let params = config.detection_params();

    info!("Warming up with {} runs", warmup);
    for _ in 0..warmup {
        detector.detect(image, &params)?;
    }

    let mut timings = Vec::with_capacity(iterations);
    let mut found = 0;
    for _ in 0..iterations {
        let start = Instant::now();
        found = detector.detect(image, &params)?.len();
        timings.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    let stats = LatencyStats::from_timings(&timings).ok_or("no timed iterations")?;
    info!(
        "{} over {} iterations ({} detections)",
        config.model.device_type, iterations, found
    );
    info!("  avg: {:.2} ms", stats.avg);
    info!("  min: {:.2} ms", stats.min);
    info!("  max: {:.2} ms", stats.max);
    Ok(stats)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing((!args.no_log_file).then_some(args.log_file.as_path()))?;

    info!("Starting benchmark");
    let iterations = args.iterations.max(1);

    let config = load_config(&args.config, args.image.as_ref(), args.model.as_ref())?;
    let image = load_image(config.image_path()?)?;

    info!("Benchmarking {}", args.config.display());
    let baseline = run_benchmark(&config, &image, args.warmup, iterations)?;

    if let Some(compare_path) = &args.compare {
        let other = load_config(compare_path, args.image.as_ref(), args.model.as_ref())?;
        info!("Benchmarking {}", compare_path.display());
        let candidate = run_benchmark(&other, &image, args.warmup, iterations)?;

        info!("=== PERFORMANCE COMPARISON ===");
        info!("{}: {:.2} ms", config.model.device_type, baseline.avg);
        info!("{}: {:.2} ms", other.model.device_type, candidate.avg);
        info!(
            "{} is {} than {}",
            other.model.device_type,
            relative_speed(&baseline, &candidate),
            config.model.device_type
        );
    }

    Ok(())
}
