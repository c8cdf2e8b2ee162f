//! JSON configuration consumed by the binaries and by [`Detector::from_config`].
//!
//! ```json
//! {
//!   "model": {
//!     "path": "models/face.onnx",
//!     "input_width": 640,
//!     "input_height": 640,
//!     "device_type": "cpu"
//!   },
//!   "detection": { "confidence_threshold": 0.35, "nms_threshold": 0.45 },
//!   "input": { "image_path": "images/test.jpg" },
//!   "classes": ["face"]
//! }
//! ```
//!
//! Every section and field is optional.
//!
//! [`Detector::from_config`]: crate::detector::Detector::from_config

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use tracing::info;

use crate::{
    analysis::letterbox::TargetSize,
    consts::{
        BACKGROUND_FILL_VALUE, CONFIDENCE_THRESHOLD, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH,
        FALLBACK_NUM_CLASSES, NMS_IOU_THRESHOLD,
    },
    detector::DetectionParams,
    error::*,
    pipeline::{ChannelOrder, Preprocessor},
};

/// Execution device for the inference session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceType {
    #[default]
    Cpu,
    Cuda,
    CoreMl,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Cpu => "cpu",
            DeviceType::Cuda => "cuda",
            DeviceType::CoreMl => "coreml",
        };
        f.write_str(name)
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(DeviceType::Cpu),
            "cuda" | "gpu" => Ok(DeviceType::Cuda),
            "coreml" => Ok(DeviceType::CoreMl),
            other => Err(format!(
                "unknown device type '{other}'; expected 'cpu', 'cuda' or 'coreml'"
            )),
        }
    }
}

impl TryFrom<String> for DeviceType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub device_type: DeviceType,
    /// ONNX Runtime intra-op threads.
    pub intra_threads: usize,
    pub channel_order: ChannelOrder,
    /// Normalized letterbox padding value in `[0, 1]`.
    pub fill_value: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            device_type: DeviceType::Cpu,
            intra_threads: 1,
            channel_order: ChannelOrder::Rgb,
            fill_value: BACKGROUND_FILL_VALUE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: CONFIDENCE_THRESHOLD,
            nms_threshold: NMS_IOU_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub image_path: Option<PathBuf>,
}

/// Ordered class names; the position in the list is the class id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ClassesConfig {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub detection: DetectionConfig,
    pub input: InputConfig,
    pub classes: ClassesConfig,
}

impl FromStr for AppConfig {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: AppConfig =
            serde_json::from_str(s).context(ConfigParseSnafu { path: "<inline>" })?;
        config.validate()?;
        Ok(config)
    }
}

impl AppConfig {
    /// Reads, parses and validates a JSON configuration file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DetectError> {
        let path = path.as_ref();
        let path_display = path.display().to_string();

        let contents = fs::read_to_string(path).context(ConfigReadSnafu {
            path: path_display.as_str(),
        })?;
        let config: AppConfig = serde_json::from_str(&contents).context(ConfigParseSnafu {
            path: path_display.as_str(),
        })?;
        config.validate()?;

        info!("Configuration loaded successfully from {}", path_display);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.model.input_width == 0 {
            return invalid("model.input_width", "must be greater than 0");
        }
        if self.model.input_height == 0 {
            return invalid("model.input_height", "must be greater than 0");
        }
        check_unit("model.fill_value", self.model.fill_value)?;
        check_unit(
            "detection.confidence_threshold",
            self.detection.confidence_threshold,
        )?;
        check_unit("detection.nms_threshold", self.detection.nms_threshold)?;
        Ok(())
    }

    /// Replaces the configured image and model paths with command line values.
    pub fn override_paths(&mut self, image_path: Option<PathBuf>, model_path: Option<PathBuf>) {
        if let Some(path) = image_path {
            info!("Using image path from command line: {}", path.display());
            self.input.image_path = Some(path);
        }
        if let Some(path) = model_path {
            info!("Using model path from command line: {}", path.display());
            self.model.path = path;
        }
    }

    /// Replaces the configured thresholds and validates the result.
    pub fn override_thresholds(
        &mut self,
        confidence_threshold: Option<f32>,
        nms_threshold: Option<f32>,
    ) -> Result<(), DetectError> {
        if let Some(value) = confidence_threshold {
            self.detection.confidence_threshold = value;
        }
        if let Some(value) = nms_threshold {
            self.detection.nms_threshold = value;
        }
        self.validate()
    }

    pub fn image_path(&self) -> Result<&Path, DetectError> {
        self.input
            .image_path
            .as_deref()
            .context(InvalidConfigSnafu {
                field: "input.image_path",
                message: "no input image configured",
            })
    }

    pub fn target_size(&self) -> Result<TargetSize, DetectError> {
        TargetSize::new(self.model.input_width, self.model.input_height)
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            confidence_threshold: self.detection.confidence_threshold,
            nms_threshold: self.detection.nms_threshold,
        }
    }

    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor {
            fill_value: self.model.fill_value,
            channel_order: self.model.channel_order,
        }
    }

    /// Number of score rows the model emits. An empty class list means a
    /// single-class model.
    pub fn num_classes(&self) -> usize {
        if self.classes.names.is_empty() {
            FALLBACK_NUM_CLASSES
        } else {
            self.classes.names.len()
        }
    }

    /// Display name for `class_id`, `class_<id>` when it is not configured.
    pub fn class_name(&self, class_id: usize) -> String {
        class_label(&self.classes.names, class_id)
    }
}

/// Looks up a class name, falling back to `class_<id>` for unknown ids.
pub fn class_label(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{class_id}"))
}

fn invalid(field: &str, message: &str) -> Result<(), DetectError> {
    InvalidConfigSnafu { field, message }.fail()
}

fn check_unit(field: &str, value: f32) -> Result<(), DetectError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        invalid(field, &format!("{value} is outside [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config: AppConfig = r#"{
            "model": {
                "path": "models/yolov8n-face.onnx",
                "input_width": 640,
                "input_height": 480,
                "device_type": "GPU"
            },
            "detection": { "confidence_threshold": 0.5, "nms_threshold": 0.4 },
            "input": { "image_path": "images/group.jpg" },
            "classes": ["face", "mask"]
        }"#
        .parse()
        .unwrap();

        assert_eq!(config.model.path, PathBuf::from("models/yolov8n-face.onnx"));
        assert_eq!(config.model.device_type, DeviceType::Cuda);
        assert_eq!(
            config.target_size().unwrap(),
            TargetSize {
                width: 640,
                height: 480
            }
        );
        assert_eq!(config.detection_params().confidence_threshold, 0.5);
        assert_eq!(config.detection_params().nms_threshold, 0.4);
        assert_eq!(config.input.image_path, Some(PathBuf::from("images/group.jpg")));
        assert_eq!(config.num_classes(), 2);
        assert_eq!(config.class_name(1), "mask");
        assert_eq!(config.class_name(7), "class_7");
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let config: AppConfig = "{}".parse().unwrap();
        assert_eq!(config.model.input_width, 640);
        assert_eq!(config.model.input_height, 640);
        assert_eq!(config.model.device_type, DeviceType::Cpu);
        assert_eq!(config.model.intra_threads, 1);
        assert_eq!(config.detection.confidence_threshold, 0.35);
        assert_eq!(config.detection.nms_threshold, 0.45);
        assert!(config.input.image_path.is_none());
        assert!(config.classes.names.is_empty());
        assert_eq!(config.num_classes(), 1);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig = r#"{ "detection": { "nms_threshold": 0.6 } }"#.parse().unwrap();
        assert_eq!(config.detection.nms_threshold, 0.6);
        assert_eq!(config.detection.confidence_threshold, 0.35);
    }

    #[test]
    fn test_validation_errors() {
        let zero_width = r#"{ "model": { "input_width": 0 } }"#.parse::<AppConfig>();
        assert!(matches!(
            zero_width,
            Err(DetectError::InvalidConfig { ref field, .. }) if field == "model.input_width"
        ));

        let threshold = r#"{ "detection": { "confidence_threshold": 1.5 } }"#.parse::<AppConfig>();
        match threshold {
            Err(DetectError::InvalidConfig { field, .. }) => {
                assert_eq!(field, "detection.confidence_threshold")
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }

        let negative = r#"{ "model": { "input_height": -640 } }"#.parse::<AppConfig>();
        assert!(matches!(negative, Err(DetectError::ConfigParse { .. })));

        let device = r#"{ "model": { "device_type": "tpu" } }"#.parse::<AppConfig>();
        assert!(matches!(device, Err(DetectError::ConfigParse { .. })));
    }

    #[test]
    fn test_overrides() {
        let mut config: AppConfig = r#"{
            "model": { "path": "models/a.onnx" },
            "input": { "image_path": "images/a.jpg" }
        }"#
        .parse()
        .unwrap();

        config.override_paths(None, Some(PathBuf::from("models/b.onnx")));
        assert_eq!(config.image_path().unwrap(), Path::new("images/a.jpg"));
        assert_eq!(config.model.path, PathBuf::from("models/b.onnx"));

        config.override_paths(Some(PathBuf::from("images/b.jpg")), None);
        assert_eq!(config.image_path().unwrap(), Path::new("images/b.jpg"));

        config.override_thresholds(Some(0.6), None).unwrap();
        assert_eq!(config.detection.confidence_threshold, 0.6);
        assert_eq!(config.detection.nms_threshold, 0.45);
        assert!(config.override_thresholds(None, Some(-0.1)).is_err());
    }

    #[test]
    fn test_missing_image_path() {
        let config = AppConfig::default();
        assert!(matches!(
            config.image_path(),
            Err(DetectError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load_from_path("does/not/exist.json");
        assert!(matches!(result, Err(DetectError::ConfigRead { .. })));
    }

    #[test]
    fn test_device_type_roundtrip() {
        for device in [DeviceType::Cpu, DeviceType::Cuda, DeviceType::CoreMl] {
            assert_eq!(device.to_string().parse::<DeviceType>().unwrap(), device);
        }
        assert_eq!(" CoreML ".parse::<DeviceType>().unwrap(), DeviceType::CoreMl);
        assert!("vulkan".parse::<DeviceType>().is_err());
    }
}
