//! The three-stage OCR pipeline and its builder.
//!
//! [`PipelineBuilder`] implements the startup configuration sequence:
//! deriving stage artifacts, cloning the runtime option per stage with
//! stage-specific TensorRT shape profiles, constructing the stage models
//! with their pre/post-processing parameters, and composing them into an
//! immutable [`Pipeline`] shared across requests.

use crate::core::artifact::StageArtifact;
use crate::core::config::RuntimeOption;
use crate::core::constants::{
    DEFAULT_CLS_BATCH_SIZE, DEFAULT_MAX_SIDE_LEN, DEFAULT_REC_BATCH_SIZE, MODEL_INPUT_NAME,
};
use crate::core::errors::OCRError;
use crate::predictors::{AngleClassifier, DbDetector, TextRecognizer};
use crate::processors::geometry::BoundingBox;
use crate::processors::types::ScoreMode;
use crate::utils::transform::{get_rotate_crop_image, Point2f};
use image::{imageops, RgbImage};
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of running the pipeline on one image.
#[derive(Debug, Clone, Default)]
pub struct OcrResult {
    /// Recognized strings, one per surviving region, in reading order.
    pub texts: Vec<String>,
    /// Recognition confidence per string.
    pub rec_scores: Vec<f32>,
    /// The region each string was read from.
    pub boxes: Vec<BoundingBox>,
}

/// The composed detector -> classifier -> recognizer pipeline.
///
/// Built once at startup; immutable and safe to invoke concurrently.
#[derive(Debug)]
pub struct Pipeline {
    detector: DbDetector,
    classifier: Option<AngleClassifier>,
    recognizer: TextRecognizer,
    cls_batch_size: i32,
    rec_batch_size: i32,
}

impl Pipeline {
    /// Runs the full pipeline on a decoded image.
    pub fn predict(&self, image: &RgbImage) -> Result<OcrResult, OCRError> {
        let boxes = self.detector.predict(image)?;
        if boxes.is_empty() {
            return Ok(OcrResult::default());
        }

        // Rectify each detected quad; a region that cannot be cropped is
        // dropped together with its box to keep results aligned.
        let mut kept_boxes = Vec::with_capacity(boxes.len());
        let mut crops = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let points: Vec<Point2f> = bbox.points.iter().map(|p| Point2f::from(*p)).collect();
            match get_rotate_crop_image(image, &points) {
                Ok(crop) => {
                    kept_boxes.push(bbox);
                    crops.push(crop);
                }
                Err(e) => debug!("dropping undecodable region: {e}"),
            }
        }
        if crops.is_empty() {
            return Ok(OcrResult::default());
        }

        if let Some(classifier) = &self.classifier {
            let batch = effective_batch(self.cls_batch_size, crops.len());
            let mut classifications = Vec::with_capacity(crops.len());
            for chunk in crops.chunks(batch) {
                classifications.extend(classifier.predict(chunk)?);
            }
            for (crop, classification) in crops.iter_mut().zip(&classifications) {
                if classifier.should_flip(classification) {
                    *crop = imageops::rotate180(crop);
                }
            }
        }

        let batch = effective_batch(self.rec_batch_size, crops.len());
        let mut texts = Vec::with_capacity(crops.len());
        let mut rec_scores = Vec::with_capacity(crops.len());
        for chunk in crops.chunks(batch) {
            for recognition in self.recognizer.predict(chunk)? {
                texts.push(recognition.text);
                rec_scores.push(recognition.score);
            }
        }

        Ok(OcrResult {
            texts,
            rec_scores,
            boxes: kept_boxes,
        })
    }

    /// The configured classifier batch size.
    pub fn cls_batch_size(&self) -> i32 {
        self.cls_batch_size
    }

    /// The configured recognizer batch size.
    pub fn rec_batch_size(&self) -> i32 {
        self.rec_batch_size
    }
}

/// Resolves a configured batch size against the number of detected
/// regions: `-1` batches all regions at once, positive values cap the
/// batch.
fn effective_batch(size: i32, total: usize) -> usize {
    if size == -1 {
        total.max(1)
    } else {
        size.max(1) as usize
    }
}

/// Validates a configured batch size.
///
/// `-1` (match detected regions) and positive values are accepted; zero
/// and values below `-1` are caller errors.
fn validate_batch_size(name: &str, size: i32) -> Result<(), OCRError> {
    if size == -1 || size >= 1 {
        Ok(())
    } else {
        Err(OCRError::config_error(
            name,
            format!("batch size must be -1 or positive, got {size}"),
        ))
    }
}

/// Builder composing the three stage models into a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    det_dir: PathBuf,
    cls_dir: Option<PathBuf>,
    rec_dir: PathBuf,
    rec_label_file: PathBuf,
    option: RuntimeOption,

    max_side_len: u32,
    det_db_thresh: f32,
    det_db_box_thresh: f32,
    det_db_unclip_ratio: f32,
    det_db_score_mode: ScoreMode,
    use_dilation: bool,
    cls_thresh: f32,
    cls_batch_size: i32,
    rec_batch_size: i32,
}

impl PipelineBuilder {
    /// Creates a builder for the two-stage detector -> recognizer
    /// pipeline; add the classifier with [`with_classifier`].
    ///
    /// [`with_classifier`]: PipelineBuilder::with_classifier
    pub fn new(
        det_dir: impl Into<PathBuf>,
        rec_dir: impl Into<PathBuf>,
        rec_label_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            det_dir: det_dir.into(),
            cls_dir: None,
            rec_dir: rec_dir.into(),
            rec_label_file: rec_label_file.into(),
            option: RuntimeOption::default(),
            max_side_len: DEFAULT_MAX_SIDE_LEN,
            det_db_thresh: 0.3,
            det_db_box_thresh: 0.6,
            det_db_unclip_ratio: 1.5,
            det_db_score_mode: ScoreMode::Slow,
            use_dilation: false,
            cls_thresh: 0.9,
            cls_batch_size: DEFAULT_CLS_BATCH_SIZE,
            rec_batch_size: DEFAULT_REC_BATCH_SIZE,
        }
    }

    /// Adds the orientation classifier stage.
    pub fn with_classifier(mut self, cls_dir: impl Into<PathBuf>) -> Self {
        self.cls_dir = Some(cls_dir.into());
        self
    }

    /// Sets the runtime option cloned into every stage.
    pub fn runtime_option(mut self, option: RuntimeOption) -> Self {
        self.option = option;
        self
    }

    /// Sets the detector preprocessing side-length bound.
    pub fn max_side_len(mut self, len: u32) -> Self {
        self.max_side_len = len;
        self
    }

    /// Sets the DB binarization threshold.
    pub fn det_db_thresh(mut self, thresh: f32) -> Self {
        self.det_db_thresh = thresh;
        self
    }

    /// Sets the DB box score threshold.
    pub fn det_db_box_thresh(mut self, thresh: f32) -> Self {
        self.det_db_box_thresh = thresh;
        self
    }

    /// Sets the DB unclip ratio.
    pub fn det_db_unclip_ratio(mut self, ratio: f32) -> Self {
        self.det_db_unclip_ratio = ratio;
        self
    }

    /// Sets the DB box scoring mode.
    pub fn det_db_score_mode(mut self, mode: ScoreMode) -> Self {
        self.det_db_score_mode = mode;
        self
    }

    /// Enables detection mask dilation.
    pub fn use_dilation(mut self, enable: bool) -> Self {
        self.use_dilation = enable;
        self
    }

    /// Sets the classifier confidence threshold.
    pub fn cls_thresh(mut self, thresh: f32) -> Self {
        self.cls_thresh = thresh;
        self
    }

    /// Sets the classifier batch size (`-1` or positive).
    pub fn cls_batch_size(mut self, size: i32) -> Self {
        self.cls_batch_size = size;
        self
    }

    /// Sets the recognizer batch size (`-1` or positive).
    pub fn rec_batch_size(mut self, size: i32) -> Self {
        self.rec_batch_size = size;
        self
    }

    /// Derives the three per-stage runtime options.
    ///
    /// Each stage gets an independent clone of the input option carrying
    /// that stage's dynamic shape profile for the model input tensor. The
    /// profiles stay independent so no stage overwrites another's; the
    /// detector sees near-square inputs while the classifier and
    /// recognizer see narrow strips.
    pub fn stage_options(&self) -> (RuntimeOption, RuntimeOption, RuntimeOption) {
        let cls_batch = i64::from(self.cls_batch_size);
        let rec_batch = i64::from(self.rec_batch_size);

        let det_option = self.option.clone().set_trt_input_shape(
            MODEL_INPUT_NAME,
            [1, 3, 64, 64],
            [1, 3, 640, 640],
            [1, 3, 960, 960],
        );
        let cls_option = self.option.clone().set_trt_input_shape(
            MODEL_INPUT_NAME,
            [1, 3, 48, 10],
            [cls_batch, 3, 48, 320],
            [cls_batch, 3, 48, 1024],
        );
        let rec_option = self.option.clone().set_trt_input_shape(
            MODEL_INPUT_NAME,
            [1, 3, 48, 10],
            [rec_batch, 3, 48, 320],
            [rec_batch, 3, 48, 2304],
        );
        (det_option, cls_option, rec_option)
    }

    /// Builds the pipeline.
    ///
    /// Stage construction failures are fatal to the build; the service
    /// cannot usefully start without a pipeline.
    pub fn build(self) -> Result<Pipeline, OCRError> {
        validate_batch_size("classifier batch size", self.cls_batch_size)?;
        validate_batch_size("recognizer batch size", self.rec_batch_size)?;

        let det_artifact = StageArtifact::from_dir(&self.det_dir);
        let cls_artifact = self.cls_dir.as_ref().map(StageArtifact::from_dir);
        let rec_artifact = StageArtifact::from_dir(&self.rec_dir);

        let (det_option, cls_option, rec_option) = self.stage_options();

        let detector = DbDetector::builder()
            .max_side_len(self.max_side_len)
            .db_thresh(self.det_db_thresh)
            .db_box_thresh(self.det_db_box_thresh)
            .db_unclip_ratio(self.det_db_unclip_ratio)
            .db_score_mode(self.det_db_score_mode)
            .use_dilation(self.use_dilation)
            .runtime_option(det_option)
            .build(&det_artifact)?;
        info!(model = %det_artifact.graph.display(), "text detector initialized");

        let classifier = match cls_artifact {
            Some(ref artifact) => {
                let classifier = AngleClassifier::builder()
                    .cls_thresh(self.cls_thresh)
                    .runtime_option(cls_option)
                    .build(artifact)?;
                info!(model = %artifact.graph.display(), "orientation classifier initialized");
                Some(classifier)
            }
            None => None,
        };

        let recognizer = TextRecognizer::builder()
            .label_file(&self.rec_label_file)
            .runtime_option(rec_option)
            .build(&rec_artifact)?;
        info!(model = %rec_artifact.graph.display(), "text recognizer initialized");

        Ok(Pipeline {
            detector,
            classifier,
            recognizer,
            cls_batch_size: self.cls_batch_size,
            rec_batch_size: self.rec_batch_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Device;

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new("det", "rec", "keys.txt").with_classifier("cls")
    }

    #[test]
    fn test_default_batch_sizes() {
        let b = builder();
        assert_eq!(b.cls_batch_size, 1);
        assert_eq!(b.rec_batch_size, 6);
    }

    #[test]
    fn test_stage_options_carry_independent_profiles() {
        let b = builder().runtime_option(RuntimeOption::from_flag(7));
        let (det, cls, rec) = b.stage_options();

        let det_profile = det.trt_shape_profile.expect("det profile");
        let cls_profile = cls.trt_shape_profile.expect("cls profile");
        let rec_profile = rec.trt_shape_profile.expect("rec profile");

        assert_eq!(det_profile.min, [1, 3, 64, 64]);
        assert_eq!(det_profile.opt, [1, 3, 640, 640]);
        assert_eq!(det_profile.max, [1, 3, 960, 960]);

        assert_eq!(cls_profile.min, [1, 3, 48, 10]);
        assert_eq!(cls_profile.opt, [1, 3, 48, 320]);
        assert_eq!(cls_profile.max, [1, 3, 48, 1024]);

        assert_eq!(rec_profile.min, [1, 3, 48, 10]);
        assert_eq!(rec_profile.opt, [6, 3, 48, 320]);
        assert_eq!(rec_profile.max, [6, 3, 48, 2304]);

        // Every clone still carries the flag's device/backend selection.
        for option in [&det, &cls, &rec] {
            assert_eq!(option.device, Some(Device::Gpu));
        }
    }

    #[test]
    fn test_stage_profiles_track_batch_sizes() {
        let b = builder().cls_batch_size(4).rec_batch_size(16);
        let (_, cls, rec) = b.stage_options();
        assert_eq!(cls.trt_shape_profile.unwrap().opt[0], 4);
        assert_eq!(rec.trt_shape_profile.unwrap().max[0], 16);
    }

    #[test]
    fn test_batch_size_validation() {
        assert!(validate_batch_size("cls", -1).is_ok());
        assert!(validate_batch_size("cls", 1).is_ok());
        assert!(validate_batch_size("cls", 64).is_ok());
        assert!(validate_batch_size("cls", 0).is_err());
        assert!(validate_batch_size("cls", -2).is_err());
    }

    #[test]
    fn test_build_rejects_invalid_batch_sizes() {
        let result = builder().cls_batch_size(0).build();
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));

        let result = builder().rec_batch_size(-5).build();
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
    }

    #[test]
    fn test_effective_batch() {
        assert_eq!(effective_batch(-1, 12), 12);
        assert_eq!(effective_batch(-1, 0), 1);
        assert_eq!(effective_batch(6, 12), 6);
        assert_eq!(effective_batch(6, 3), 6);
    }

    #[test]
    fn test_build_fails_on_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineBuilder::new(
            dir.path().join("det"),
            dir.path().join("rec"),
            dir.path().join("keys.txt"),
        )
        .with_classifier(dir.path().join("cls"))
        .build();
        assert!(result.is_err());
    }
}
