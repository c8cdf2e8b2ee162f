/// The number of values representing bounding box geometry in the model output.
///
/// Each anchor column starts with 4 values: [center_x, center_y, width, height].
/// Class scores (and, for heads that emit one, an objectness score) follow.
pub const CXYWH_OFFSET: usize = 4;

/// Class count assumed when the configured class list is empty.
///
/// Single-class face models ship without a `classes` section, so the decoder
/// still has to know that one score row follows the box geometry.
pub const FALLBACK_NUM_CLASSES: usize = 1;

/// Default network input width in pixels.
pub const DEFAULT_INPUT_WIDTH: u32 = 640;

/// Default network input height in pixels.
pub const DEFAULT_INPUT_HEIGHT: u32 = 640;

/// Default minimum class score for a detection to be kept.
///
/// Anchors whose best class score is not strictly greater than this value
/// are dropped before suppression.
pub const CONFIDENCE_THRESHOLD: f32 = 0.35;

/// Default IoU threshold for Non-Maximum Suppression (NMS).
///
/// A lower-confidence box whose IoU with an already accepted box is strictly
/// greater than this value is suppressed.
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// Number of color channels in the input blob.
pub const INPUT_CHANNELS: usize = 3;

/// Batch size for model inference. Only single images are processed.
pub const BATCH_SIZE: usize = 1;

/// Normalized value used for the letterbox padding (black).
pub const BACKGROUND_FILL_VALUE: f32 = 0.0;

/// Default configuration file looked up by the binaries.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.json";

/// Log files the binaries mirror their output into.
pub const DEFAULT_LOG_PATH: &str = "logs/facedet.log";
pub const DEFAULT_BENCH_LOG_PATH: &str = "logs/facedet-bench.log";

/// Box and label background color used by the renderer.
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];

/// Label text color used by the renderer.
pub const LABEL_TEXT_COLOR: [u8; 3] = [0, 0, 0];

/// Stroke width of rendered boxes in pixels.
pub const BOX_THICKNESS: i32 = 2;

/// Font size used for rendered labels.
pub const LABEL_FONT_SIZE: f32 = 16.0;
