use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use image::GenericImageView;
use tracing::{info, warn};

use facedet_core::config::AppConfig;
use facedet_core::consts::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_PATH};
use facedet_core::detector::Detector;
use facedet_core::logging::init_tracing;
use facedet_core::render::{draw_detections, load_font, load_image, save_annotated};

#[derive(Parser)]
#[command(name = "facedet")]
#[command(about = "Letterboxed ONNX face detection on a single image")]
struct Args {
    #[arg(help = "Input image path, overrides `input.image_path`")]
    image: Option<PathBuf>,

    #[arg(help = "ONNX model path, overrides `model.path`")]
    model: Option<PathBuf>,

    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, help = "JSON configuration file")]
    config: PathBuf,

    #[arg(short, long, help = "Write the annotated image to this path")]
    output: Option<PathBuf>,

    #[arg(long, help = "TrueType font for box labels")]
    font: Option<PathBuf>,

    #[arg(long, help = "Override the confidence threshold")]
    confidence: Option<f32>,

    #[arg(long, help = "Override the NMS IoU threshold")]
    nms: Option<f32>,

    #[arg(long, help = "Print detections as JSON on stdout")]
    json: bool,

    #[arg(long, default_value = DEFAULT_LOG_PATH, help = "Mirror log output into this file")]
    log_file: PathBuf,

    #[arg(long, help = "Only log to the console")]
    no_log_file: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing((!args.no_log_file).then_some(args.log_file.as_path()))?;

    info!("Starting facedet");

    let mut config = AppConfig::load_from_path(&args.config)?;
    config.override_paths(args.image, args.model);
    config.override_thresholds(args.confidence, args.nms)?;

    let image_path = config.image_path()?.to_path_buf();
    info!("Loading image: {}", image_path.display());
    let image = load_image(&image_path)?;
    let (width, height) = image.dimensions();
    info!("Image loaded successfully. Size: {}x{}", width, height);

    let mut detector = Detector::from_config(&config)?;
    info!("Model loaded successfully: {}", config.model.path.display());

    let detections = detector.detect(&image, &config.detection_params())?;

    if detections.is_empty() {
        warn!("No objects detected");
    }
    info!("Detection results:");
    for (i, detection) in detections.iter().enumerate() {
        info!(
            "  [{}] Class: {}, Confidence: {:.2}, Box: ({}, {}, {}, {})",
            i,
            config.class_name(detection.class_id),
            detection.confidence,
            detection.rect.x,
            detection.rect.y,
            detection.rect.width,
            detection.rect.height
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detections)?);
    }

    if let Some(output_path) = args.output {
        let font = args.font.as_ref().map(load_font).transpose()?;
        if font.is_none() {
            warn!("No font given, labels are not drawn");
        }
        let annotated = draw_detections(&image, &detections, &config.classes.names, font.as_ref());
        save_annotated(&output_path, &annotated)?;
        info!("Output image saved to: {}", output_path.display());
    }

    info!("Application finished successfully");
    Ok(())
}
