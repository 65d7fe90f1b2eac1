//! DB text detection stage.
//!
//! Finds text regions in a full image and emits quadrilateral boxes in
//! reading order.

use crate::core::artifact::StageArtifact;
use crate::core::config::RuntimeOption;
use crate::core::constants::{DEFAULT_MAX_SIDE_LEN, MODEL_INPUT_NAME};
use crate::core::errors::OCRError;
use crate::core::inference::OrtInfer;
use crate::processors::geometry::BoundingBox;
use crate::processors::sorting::sort_quad_boxes;
use crate::processors::types::{ImageScaleInfo, ScoreMode};
use crate::processors::{DBPostProcess, NormalizeImage};
use image::{imageops, RgbImage};

/// DB text region detector.
#[derive(Debug)]
pub struct DbDetector {
    infer: OrtInfer,
    normalize: NormalizeImage,
    max_side_len: u32,
    postprocess: DBPostProcess,
}

impl DbDetector {
    /// Creates a new builder with default pre/post-processing parameters.
    pub fn builder() -> DbDetectorBuilder {
        DbDetectorBuilder::new()
    }

    /// Detects text regions in the image, returning quads in reading
    /// order mapped to source coordinates.
    pub fn predict(&self, image: &RgbImage) -> Result<Vec<BoundingBox>, OCRError> {
        let (resized, scale) = self.resize(image);
        let tensor = self.normalize.normalize_batch(&[resized])?;
        let pred = self.infer.infer_4d(&tensor)?;
        let (mut boxes, _scores) = self.postprocess.apply(&pred, &[scale]);
        Ok(sort_quad_boxes(&boxes.remove(0)))
    }

    /// Resizes so the longer side stays within `max_side_len`, snapping
    /// both sides to multiples of 32 as the model expects.
    fn resize(&self, image: &RgbImage) -> (RgbImage, ImageScaleInfo) {
        let (src_w, src_h) = (image.width(), image.height());
        let max_side = src_w.max(src_h);
        let ratio = if max_side > self.max_side_len {
            self.max_side_len as f32 / max_side as f32
        } else {
            1.0
        };

        let resize_w = snap_to_32((src_w as f32 * ratio) as u32);
        let resize_h = snap_to_32((src_h as f32 * ratio) as u32);

        let resized = if resize_w == src_w && resize_h == src_h {
            image.clone()
        } else {
            imageops::resize(image, resize_w, resize_h, imageops::FilterType::Triangle)
        };

        let scale = ImageScaleInfo::new(
            src_h as f32,
            src_w as f32,
            resize_h as f32 / src_h as f32,
            resize_w as f32 / src_w as f32,
        );
        (resized, scale)
    }
}

fn snap_to_32(side: u32) -> u32 {
    let snapped = (side as f32 / 32.0).round() as u32 * 32;
    snapped.max(32)
}

/// Builder for [`DbDetector`].
#[derive(Debug, Clone)]
pub struct DbDetectorBuilder {
    max_side_len: u32,
    thresh: f32,
    box_thresh: f32,
    unclip_ratio: f32,
    score_mode: ScoreMode,
    use_dilation: bool,
    option: RuntimeOption,
}

impl DbDetectorBuilder {
    /// Creates a builder with the stage's default parameters.
    pub fn new() -> Self {
        Self {
            max_side_len: DEFAULT_MAX_SIDE_LEN,
            thresh: 0.3,
            box_thresh: 0.6,
            unclip_ratio: 1.5,
            score_mode: ScoreMode::default(),
            use_dilation: false,
            option: RuntimeOption::default(),
        }
    }

    /// Sets the bound on the longer image side during preprocessing.
    pub fn max_side_len(mut self, len: u32) -> Self {
        self.max_side_len = len;
        self
    }

    /// Sets the binarization threshold.
    pub fn db_thresh(mut self, thresh: f32) -> Self {
        self.thresh = thresh;
        self
    }

    /// Sets the box score threshold.
    pub fn db_box_thresh(mut self, thresh: f32) -> Self {
        self.box_thresh = thresh;
        self
    }

    /// Sets the unclip ratio.
    pub fn db_unclip_ratio(mut self, ratio: f32) -> Self {
        self.unclip_ratio = ratio;
        self
    }

    /// Sets the box scoring mode.
    pub fn db_score_mode(mut self, mode: ScoreMode) -> Self {
        self.score_mode = mode;
        self
    }

    /// Enables mask dilation before contour extraction.
    pub fn use_dilation(mut self, enable: bool) -> Self {
        self.use_dilation = enable;
        self
    }

    /// Sets the runtime option the stage session is created with.
    pub fn runtime_option(mut self, option: RuntimeOption) -> Self {
        self.option = option;
        self
    }

    /// Builds the detector from its stage artifact.
    pub fn build(self, artifact: &StageArtifact) -> Result<DbDetector, OCRError> {
        artifact.verify()?;
        let infer = OrtInfer::from_graph(&artifact.graph, &self.option, MODEL_INPUT_NAME)?;
        Ok(DbDetector {
            infer,
            normalize: NormalizeImage::imagenet()?,
            max_side_len: self.max_side_len,
            postprocess: DBPostProcess {
                thresh: self.thresh,
                box_thresh: self.box_thresh,
                unclip_ratio: self.unclip_ratio,
                score_mode: self.score_mode,
                use_dilation: self.use_dilation,
                ..DBPostProcess::default()
            },
        })
    }
}

impl Default for DbDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_32() {
        assert_eq!(snap_to_32(0), 32);
        assert_eq!(snap_to_32(31), 32);
        assert_eq!(snap_to_32(48), 64);
        assert_eq!(snap_to_32(960), 960);
        assert_eq!(snap_to_32(970), 960);
    }

    #[test]
    fn test_build_fails_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = StageArtifact::from_dir(dir.path());
        let result = DbDetector::builder().build(&artifact);
        assert!(matches!(result, Err(OCRError::ModelLoad { .. })));
    }
}
