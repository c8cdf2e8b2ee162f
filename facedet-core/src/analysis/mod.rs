pub mod bbox;
pub mod letterbox;
