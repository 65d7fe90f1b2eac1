//! Error types for the serving pipeline.

mod types;

pub use types::{OCRError, ProcessingStage};
