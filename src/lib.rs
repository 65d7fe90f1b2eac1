//! # ppocr-serve
//!
//! A Rust serving layer for the PP-OCRv3 three-stage OCR pipeline
//! (text detection, orientation classification, text recognition) running
//! on ONNX Runtime.
//!
//! The library wires the three stage models into a single reusable
//! [`pipeline::Pipeline`] that is built once at startup and shared across
//! HTTP requests. The companion `ppocr-serve` binary exposes the pipeline
//! as a `POST /detect` endpoint that accepts an image URL, fetches and
//! decodes the image, and returns the recognized text strings as JSON.
//!
//! ## Modules
//!
//! * [`core`] - Runtime configuration, error handling, and the ONNX
//!   Runtime session layer
//! * [`processors`] - Image normalization and DB detection post-processing
//! * [`predictors`] - The three stage models
//! * [`pipeline`] - Stage composition and the pipeline builder
//! * [`fetch`] - Bounded-timeout image download
//! * [`utils`] - Perspective cropping and logging setup

pub mod core;
pub mod fetch;
pub mod pipeline;
pub mod predictors;
pub mod processors;
pub mod utils;

pub use crate::core::artifact::StageArtifact;
pub use crate::core::config::{Backend, Device, RuntimeOption, TrtShapeProfile};
pub use crate::core::errors::OCRError;
pub use crate::pipeline::{OcrResult, Pipeline, PipelineBuilder};
