//! Image processing building blocks for the stage models.
//!
//! This module contains the pre/post-processing pieces the predictors are
//! assembled from: pixel normalization into NCHW tensors, DB heatmap
//! post-processing into quadrilateral boxes, box geometry, and reading
//! order sorting.

pub mod db_postprocess;
pub mod decode;
pub mod geometry;
pub mod normalization;
pub mod sorting;
pub mod types;

pub use db_postprocess::DBPostProcess;
pub use decode::CtcLabelDecode;
pub use geometry::{BoundingBox, MinAreaRect, Point};
pub use normalization::NormalizeImage;
pub use sorting::sort_quad_boxes;
pub use types::{ImageScaleInfo, ScoreMode};
