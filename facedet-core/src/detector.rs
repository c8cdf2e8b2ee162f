use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    analysis::letterbox::{LetterboxTransform, TargetSize},
    config::AppConfig,
    detection::Detection,
    error::DetectError,
    inference::{InferenceAdapter, OnnxAdapter, session_builder},
    pipeline::{Preprocessor, decode, suppress},
};

/// Thresholds applied to one `detect` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            confidence_threshold: crate::consts::CONFIDENCE_THRESHOLD,
            nms_threshold: crate::consts::NMS_IOU_THRESHOLD,
        }
    }
}

/// Letterbox, preprocess, infer, decode and suppress for one image at a time.
pub struct Detector<A: InferenceAdapter> {
    adapter: A,
    target: TargetSize,
    preprocessor: Preprocessor,
    num_classes: usize,
}

impl Detector<OnnxAdapter> {
    /// Builds an ONNX Runtime backed detector from a validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, DetectError> {
        info!("Initializing detector from JSON config");
        info!("Model path: {}", config.model.path.display());
        info!(
            "Input size: {}x{}",
            config.model.input_width, config.model.input_height
        );
        info!(
            "Confidence threshold: {}",
            config.detection.confidence_threshold
        );
        info!("NMS threshold: {}", config.detection.nms_threshold);

        let target = config.target_size()?;
        let builder = session_builder(config.model.device_type, config.model.intra_threads)?;
        let adapter = OnnxAdapter::new(builder, &config.model.path, target)?;

        Ok(Self::new(
            adapter,
            target,
            config.preprocessor(),
            config.num_classes(),
        ))
    }
}

impl<A: InferenceAdapter> Detector<A> {
    pub fn new(
        adapter: A,
        target: TargetSize,
        preprocessor: Preprocessor,
        num_classes: usize,
    ) -> Self {
        Self {
            adapter,
            target,
            preprocessor,
            num_classes,
        }
    }

    pub fn target(&self) -> TargetSize {
        self.target
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Runs the whole pipeline on `image`.
    ///
    /// An output tensor that violates the head contract is logged and gives an
    /// empty result; geometry, shape and backend failures are returned as
    /// errors.
    pub fn detect(
        &mut self,
        image: &DynamicImage,
        params: &DetectionParams,
    ) -> Result<Vec<Detection>, DetectError> {
        let start_time = Instant::now();
        let (width, height) = image.dimensions();
        info!("Starting detection on image ({}x{})", width, height);

        let transform = LetterboxTransform::new(width, height, self.target)?;
        debug!(
            "Letterbox scale {:.4}, resized {}x{}, pad ({}, {})",
            transform.scale,
            transform.new_width,
            transform.new_height,
            transform.pad_left,
            transform.pad_top
        );

        let blob = self
            .preprocessor
            .process(image, &transform, &self.adapter.input_shape())?;

        let raw = self.adapter.run(blob)?;
        debug!("Model output shape {:?}", raw.shape());

        let candidates = decode(
            raw.view(),
            &transform,
            (width, height),
            params.confidence_threshold,
            self.num_classes,
        );
        debug!("Found {} valid detections before NMS", candidates.len());

        let detections = suppress(&candidates, params.nms_threshold);

        info!(
            "Detection completed in {} ms. Found {} objects",
            start_time.elapsed().as_millis(),
            detections.len()
        );

        Ok(detections)
    }
}
