pub mod decode;
pub mod nms;
pub mod preprocess;

pub use decode::{RawOutput, decode};
pub use nms::suppress;
pub use preprocess::{Blob, ChannelOrder, Preprocessor};
