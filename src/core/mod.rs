//! The core module of the serving pipeline.
//!
//! This module contains the fundamental components shared by the stage
//! models and the pipeline builder:
//! - Runtime/backend configuration (device, backend kind, TRT shape
//!   profiles)
//! - Error handling
//! - Constants used throughout the pipeline
//! - ONNX Runtime session management and inference entry points

pub mod artifact;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;

pub use artifact::StageArtifact;
pub use config::{Backend, Device, RuntimeOption, TrtShapeProfile};
pub use constants::*;
pub use errors::{OCRError, ProcessingStage};
pub use inference::OrtInfer;

/// A 2D tensor of f32 values (batch, classes).
pub type Tensor2D = ndarray::Array2<f32>;
/// A 3D tensor of f32 values (batch, sequence, classes).
pub type Tensor3D = ndarray::Array3<f32>;
/// A 4D tensor of f32 values (batch, channels, height, width).
pub type Tensor4D = ndarray::Array4<f32>;
