pub mod model;
pub mod onnx;

pub use model::{InferenceAdapter, session_builder};
pub use onnx::OnnxAdapter;
