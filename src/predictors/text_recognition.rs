//! Text recognition stage.
//!
//! Maps an oriented text crop to a string through a CTC sequence model
//! and a character label map.

use crate::core::artifact::StageArtifact;
use crate::core::config::RuntimeOption;
use crate::core::constants::{MODEL_INPUT_NAME, REC_IMAGE_SHAPE};
use crate::core::errors::OCRError;
use crate::core::inference::OrtInfer;
use crate::processors::{CtcLabelDecode, NormalizeImage};
use image::RgbImage;
use ndarray::Axis;
use std::path::{Path, PathBuf};

use super::angle_classification::resize_pad_to;

/// One recognized text line with its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// The recognized string.
    pub text: String,
    /// Mean per-character confidence.
    pub score: f32,
}

/// CTC text recognizer.
#[derive(Debug)]
pub struct TextRecognizer {
    infer: OrtInfer,
    normalize: NormalizeImage,
    decoder: CtcLabelDecode,
}

impl TextRecognizer {
    /// Creates a new builder with the stage's default parameters.
    pub fn builder() -> TextRecognizerBuilder {
        TextRecognizerBuilder::new()
    }

    /// Recognizes a batch of oriented crops.
    ///
    /// The batch is resized to a common width driven by the widest crop,
    /// so narrow strips pad instead of stretching.
    pub fn predict(&self, images: &[RgbImage]) -> Result<Vec<Recognition>, OCRError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let (_, base_h, base_w) = REC_IMAGE_SHAPE;
        let base_ratio = base_w as f32 / base_h as f32;
        let max_wh_ratio = images
            .iter()
            .map(|img| img.width() as f32 / img.height().max(1) as f32)
            .fold(base_ratio, f32::max);
        let target_w = (base_h as f32 * max_wh_ratio).ceil() as u32;

        let prepared: Vec<RgbImage> = images
            .iter()
            .map(|img| resize_pad_to(img, base_h, target_w))
            .collect();
        let tensor = self.normalize.normalize_batch(&prepared)?;
        let probs = self.infer.infer_3d(&tensor)?;

        let mut results = Vec::with_capacity(images.len());
        for item in probs.axis_iter(Axis(0)) {
            let (text, score) = self.decoder.decode(&item);
            results.push(Recognition { text, score });
        }
        Ok(results)
    }
}

/// Builder for [`TextRecognizer`].
#[derive(Debug, Clone)]
pub struct TextRecognizerBuilder {
    label_file: Option<PathBuf>,
    option: RuntimeOption,
}

impl TextRecognizerBuilder {
    /// Creates a builder with the stage's default parameters.
    pub fn new() -> Self {
        Self {
            label_file: None,
            option: RuntimeOption::default(),
        }
    }

    /// Sets the character label map file.
    pub fn label_file(mut self, path: impl AsRef<Path>) -> Self {
        self.label_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the runtime option the stage session is created with.
    pub fn runtime_option(mut self, option: RuntimeOption) -> Self {
        self.option = option;
        self
    }

    /// Builds the recognizer from its stage artifact and label map.
    pub fn build(self, artifact: &StageArtifact) -> Result<TextRecognizer, OCRError> {
        let label_file = self.label_file.ok_or_else(|| {
            OCRError::config_error("recognizer", "a label map file is required")
        })?;
        let dict_lines: Vec<String> = std::fs::read_to_string(&label_file)
            .map_err(|e| {
                OCRError::model_load_error(
                    &label_file,
                    "failed to read label map",
                    Some(Box::new(e)),
                )
            })?
            .lines()
            .map(|line| line.to_string())
            .collect();
        if dict_lines.is_empty() {
            return Err(OCRError::config_error("recognizer", "label map is empty"));
        }

        artifact.verify()?;
        let infer = OrtInfer::from_graph(&artifact.graph, &self.option, MODEL_INPUT_NAME)?;
        Ok(TextRecognizer {
            infer,
            normalize: NormalizeImage::centered()?,
            decoder: CtcLabelDecode::new(&dict_lines, true),
        })
    }
}

impl Default for TextRecognizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = StageArtifact::from_dir(dir.path());
        let result = TextRecognizer::builder().build(&artifact);
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
    }

    #[test]
    fn test_build_rejects_empty_label_map() {
        let dir = tempfile::tempdir().unwrap();
        let label_path = dir.path().join("keys.txt");
        std::fs::write(&label_path, "").unwrap();
        let artifact = StageArtifact::from_dir(dir.path());
        let result = TextRecognizer::builder()
            .label_file(&label_path)
            .build(&artifact);
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
    }
}
