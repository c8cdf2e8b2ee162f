use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DetectError {
    #[snafu(display(
        "Invalid geometry: image {}x{} into target {}x{}",
        image_width,
        image_height,
        target_width,
        target_height
    ))]
    InvalidGeometry {
        image_width: u32,
        image_height: u32,
        target_width: u32,
        target_height: u32,
    },
    #[snafu(display("Blob shape {:?} does not match model input {:?}", actual, expected))]
    ShapeMismatch {
        actual: Vec<usize>,
        expected: Vec<usize>,
    },
    #[snafu(display("Malformed model output {:?}: {}", shape, reason))]
    MalformedOutput { shape: Vec<usize>, reason: String },
    #[snafu(display("Ort Session init stage `{}` error: {}", stage, source))]
    OrtInit {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Build Tensor for `{}` error: {}", stage, source))]
    Tensor {
        source: ort::error::Error,
        stage: String,
    },
    #[snafu(display("Onnx Inference error: {}", source))]
    Inference { source: ort::error::Error },
    #[snafu(display("Onnx Output can not found {}", output_name))]
    NotFoundOutput { output_name: String },
    #[snafu(display("Inference adapter error: {}", message))]
    Adapter { message: String },
    #[snafu(display("Model `{}` is not usable: {}", model, message))]
    ModelMismatch { model: String, message: String },
    #[snafu(display("Read config `{}` error: {}", path, source))]
    ConfigRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Parse config `{}` error: {}", path, source))]
    ConfigParse {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid config field `{}`: {}", field, message))]
    InvalidConfig { field: String, message: String },
    #[snafu(display("Image Read `{}` error: {}", path, source))]
    ImageRead {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Image Write `{}` error: {}", path, source))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },
    #[snafu(display("Load Font error: {}", source))]
    Font { source: ab_glyph::InvalidFont },
    #[snafu(display("Read `{}` error: {}", path, source))]
    IoRead {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Write `{}` error: {}", path, source))]
    IoWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Serialize detections error: {}", source))]
    Json { source: serde_json::Error },
}

impl DetectError {
    /// Whether the error was raised by the inference backend rather than by
    /// the pipeline around it.
    pub fn is_inference_failure(&self) -> bool {
        matches!(
            self,
            DetectError::Inference { .. }
                | DetectError::Tensor { .. }
                | DetectError::NotFoundOutput { .. }
                | DetectError::Adapter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_failure_kinds() {
        let adapter = DetectError::Adapter {
            message: "device lost".to_string(),
        };
        assert!(adapter.is_inference_failure());
        assert_eq!(adapter.to_string(), "Inference adapter error: device lost");

        let missing = DetectError::NotFoundOutput {
            output_name: "output0".to_string(),
        };
        assert!(missing.is_inference_failure());

        let geometry = DetectError::InvalidGeometry {
            image_width: 0,
            image_height: 10,
            target_width: 640,
            target_height: 640,
        };
        assert!(!geometry.is_inference_failure());
        assert_eq!(
            geometry.to_string(),
            "Invalid geometry: image 0x10 into target 640x640"
        );

        // raised while loading, before any inference call
        let model = DetectError::ModelMismatch {
            model: "models/face.onnx".to_string(),
            message: "model declares no inputs".to_string(),
        };
        assert!(!model.is_inference_failure());
    }
}
