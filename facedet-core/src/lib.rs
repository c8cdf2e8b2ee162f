pub mod analysis;
pub mod config;
pub mod consts;
pub mod detection;
pub mod detector;
pub mod error;
pub mod inference;
pub mod logging;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use analysis::letterbox::{LetterboxTransform, TargetSize};
pub use config::AppConfig;
pub use detection::{Candidate, Detection, Rect};
pub use detector::{DetectionParams, Detector};
pub use error::DetectError;
pub use inference::{InferenceAdapter, OnnxAdapter};
