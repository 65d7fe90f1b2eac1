//! Core error types for the OCR serving pipeline.
//!
//! This module defines the error enum shared across all pipeline
//! components, from session creation through pre/post-processing to
//! request handling.

use thiserror::Error;

/// Enum representing different stages of processing in the OCR pipeline.
///
/// Used to identify which stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image resizing.
    Resize,
    /// Error occurred during image processing operations.
    ImageProcessing,
    /// Error occurred during post-processing.
    PostProcessing,
    /// Error occurred during pipeline execution.
    PipelineExecution,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::ImageProcessing => write!(f, "image processing"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::PipelineExecution => write!(f, "pipeline execution"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the OCR pipeline.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while decoding or loading an image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error loading a stage model artifact.
    #[error("model load failed for '{model_path}': {reason}")]
    ModelLoad {
        /// Path to the artifact that failed to load.
        model_path: String,
        /// Short reason string.
        reason: String,
        /// Underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor shape operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl OCRError {
    /// Creates a processing error for a given stage with context.
    pub fn processing(kind: ProcessingStage, context: impl Into<String>) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
        }
    }

    /// Creates an inference error with model context.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a configuration error with context and details.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a model load error for the given artifact path.
    pub fn model_load_error(
        model_path: &std::path::Path,
        reason: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.display().to_string(),
            reason: reason.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(ProcessingStage::PostProcessing.to_string(), "post-processing");
        assert_eq!(ProcessingStage::Generic.to_string(), "processing");
    }

    #[test]
    fn test_config_error_message() {
        let err = OCRError::config_error("batch size", "0 is not a valid value");
        assert_eq!(
            err.to_string(),
            "configuration: batch size: 0 is not a valid value"
        );
    }
}
