//! Text orientation classification stage.
//!
//! Classifies each cropped text region as upright or rotated 180 degrees.
//! The pipeline flips a crop only when the rotated label clears the
//! confidence threshold.

use crate::core::artifact::StageArtifact;
use crate::core::config::RuntimeOption;
use crate::core::constants::{CLS_IMAGE_SHAPE, MODEL_INPUT_NAME};
use crate::core::errors::OCRError;
use crate::core::inference::OrtInfer;
use crate::processors::NormalizeImage;
use image::{imageops, RgbImage};

/// Index of the 180 degree label in the classifier output.
const ROTATED_LABEL: usize = 1;

/// One classification outcome: label index and its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Predicted label index (0 = upright, 1 = rotated 180 degrees).
    pub label: usize,
    /// Confidence of the predicted label.
    pub score: f32,
}

/// 180 degree orientation classifier.
#[derive(Debug)]
pub struct AngleClassifier {
    infer: OrtInfer,
    normalize: NormalizeImage,
    thresh: f32,
}

impl AngleClassifier {
    /// Creates a new builder with the stage's default parameters.
    pub fn builder() -> AngleClassifierBuilder {
        AngleClassifierBuilder::new()
    }

    /// Classifies a batch of cropped regions.
    pub fn predict(&self, images: &[RgbImage]) -> Result<Vec<Classification>, OCRError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let prepared: Vec<RgbImage> = images.iter().map(|img| self.resize_pad(img)).collect();
        let tensor = self.normalize.normalize_batch(&prepared)?;
        let logits = self.infer.infer_2d(&tensor)?;

        let mut results = Vec::with_capacity(images.len());
        for row in logits.rows() {
            let (label, score) =
                row.iter()
                    .enumerate()
                    .fold((0usize, f32::NEG_INFINITY), |acc, (i, &p)| {
                        if p > acc.1 {
                            (i, p)
                        } else {
                            acc
                        }
                    });
            results.push(Classification { label, score });
        }
        Ok(results)
    }

    /// Whether a crop should be flipped given a classification outcome.
    pub fn should_flip(&self, classification: &Classification) -> bool {
        classification.label == ROTATED_LABEL && classification.score >= self.thresh
    }

    /// Resizes keeping aspect ratio to the classifier height, padding the
    /// remaining width with black.
    fn resize_pad(&self, image: &RgbImage) -> RgbImage {
        let (_, target_h, target_w) = CLS_IMAGE_SHAPE;
        resize_pad_to(image, target_h, target_w)
    }
}

/// Resizes an image to `target_h` keeping its aspect ratio and pastes it
/// onto a black canvas of `target_h` x `target_w`.
pub(crate) fn resize_pad_to(image: &RgbImage, target_h: u32, target_w: u32) -> RgbImage {
    let ratio = image.width() as f32 / image.height().max(1) as f32;
    let resize_w = ((target_h as f32 * ratio).ceil() as u32).clamp(1, target_w);
    let resized = imageops::resize(
        image,
        resize_w,
        target_h,
        imageops::FilterType::Triangle,
    );

    let mut canvas = RgbImage::new(target_w, target_h);
    imageops::overlay(&mut canvas, &resized, 0, 0);
    canvas
}

/// Builder for [`AngleClassifier`].
#[derive(Debug, Clone)]
pub struct AngleClassifierBuilder {
    thresh: f32,
    option: RuntimeOption,
}

impl AngleClassifierBuilder {
    /// Creates a builder with the stage's default parameters.
    pub fn new() -> Self {
        Self {
            thresh: 0.9,
            option: RuntimeOption::default(),
        }
    }

    /// Sets the confidence threshold for accepting the rotated label.
    pub fn cls_thresh(mut self, thresh: f32) -> Self {
        self.thresh = thresh;
        self
    }

    /// Sets the runtime option the stage session is created with.
    pub fn runtime_option(mut self, option: RuntimeOption) -> Self {
        self.option = option;
        self
    }

    /// Builds the classifier from its stage artifact.
    pub fn build(self, artifact: &StageArtifact) -> Result<AngleClassifier, OCRError> {
        artifact.verify()?;
        let infer = OrtInfer::from_graph(&artifact.graph, &self.option, MODEL_INPUT_NAME)?;
        Ok(AngleClassifier {
            infer,
            normalize: NormalizeImage::centered()?,
            thresh: self.thresh,
        })
    }
}

impl Default for AngleClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_pad_shape() {
        let image = RgbImage::new(100, 20);
        let padded = resize_pad_to(&image, 48, 192);
        assert_eq!(padded.width(), 192);
        assert_eq!(padded.height(), 48);
    }

    #[test]
    fn test_resize_pad_wide_image_is_clamped() {
        let image = RgbImage::new(2000, 20);
        let padded = resize_pad_to(&image, 48, 192);
        assert_eq!((padded.width(), padded.height()), (192, 48));
    }

    #[test]
    fn test_build_fails_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = StageArtifact::from_dir(dir.path());
        assert!(AngleClassifier::builder().build(&artifact).is_err());
    }
}
