//! Types used in image processing operations.

use std::str::FromStr;

use crate::core::errors::OCRError;

/// Specifies the mode for scoring candidate boxes in detection
/// post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Score over the axis-aligned region around the box (faster).
    Fast,
    /// Score over the exact contour pixels (more accurate).
    #[default]
    Slow,
}

impl FromStr for ScoreMode {
    type Err = OCRError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "fast" => Ok(ScoreMode::Fast),
            "slow" => Ok(ScoreMode::Slow),
            other => Err(OCRError::config_error(
                "score mode",
                format!("expected \"fast\" or \"slow\", got \"{other}\""),
            )),
        }
    }
}

/// Information about image scaling during detection preprocessing.
///
/// Captures the original dimensions and the ratios applied while resizing,
/// so post-processing can map boxes back to source coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScaleInfo {
    /// Original image height before resizing.
    pub src_h: f32,
    /// Original image width before resizing.
    pub src_w: f32,
    /// Height scaling ratio (resized / original).
    pub ratio_h: f32,
    /// Width scaling ratio (resized / original).
    pub ratio_w: f32,
}

impl ImageScaleInfo {
    /// Creates a new `ImageScaleInfo` from original dimensions and ratios.
    pub fn new(src_h: f32, src_w: f32, ratio_h: f32, ratio_w: f32) -> Self {
        Self {
            src_h,
            src_w,
            ratio_h,
            ratio_w,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_mode_from_str() {
        assert_eq!("slow".parse::<ScoreMode>().unwrap(), ScoreMode::Slow);
        assert_eq!("fast".parse::<ScoreMode>().unwrap(), ScoreMode::Fast);
        assert!("medium".parse::<ScoreMode>().is_err());
    }
}
