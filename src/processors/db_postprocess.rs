//! Post-processing for DB (Differentiable Binarization) text detection.
//!
//! [`DBPostProcess`] converts raw detection heatmaps into quadrilateral
//! boxes by thresholding, contour extraction, scoring, unclip expansion,
//! and mapping back to source image coordinates.

use crate::core::Tensor4D;
use crate::processors::geometry::{order_quad_points, BoundingBox, MinAreaRect, Point};
use crate::processors::types::{ImageScaleInfo, ScoreMode};
use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use ndarray::Axis;

/// Post-processor for DB text detection heatmaps.
#[derive(Debug, Clone)]
pub struct DBPostProcess {
    /// Threshold for binarizing the prediction map.
    pub thresh: f32,
    /// Threshold for filtering boxes based on their score.
    pub box_thresh: f32,
    /// Ratio for unclipping (expanding) boxes.
    pub unclip_ratio: f32,
    /// Maximum number of candidate boxes to consider.
    pub max_candidates: usize,
    /// Minimum side length for detected boxes, in heatmap pixels.
    pub min_size: f32,
    /// Method for scoring a candidate box.
    pub score_mode: ScoreMode,
    /// Whether to dilate the segmentation mask before contour detection.
    pub use_dilation: bool,
}

impl Default for DBPostProcess {
    fn default() -> Self {
        Self {
            thresh: 0.3,
            box_thresh: 0.6,
            unclip_ratio: 1.5,
            max_candidates: 1000,
            min_size: 3.0,
            score_mode: ScoreMode::default(),
            use_dilation: false,
        }
    }
}

impl DBPostProcess {
    /// Applies post-processing to a batch of prediction maps.
    ///
    /// Returns per-image boxes and their scores, in contour-discovery
    /// order; callers apply reading-order sorting afterwards.
    pub fn apply(
        &self,
        preds: &Tensor4D,
        img_shapes: &[ImageScaleInfo],
    ) -> (Vec<Vec<BoundingBox>>, Vec<Vec<f32>>) {
        let mut all_boxes = Vec::with_capacity(img_shapes.len());
        let mut all_scores = Vec::with_capacity(img_shapes.len());

        for (batch_idx, shape) in img_shapes.iter().enumerate() {
            let pred_slice = preds.index_axis(Axis(0), batch_idx);
            let pred_channel = pred_slice.index_axis(Axis(0), 0);
            let (boxes, scores) = self.process(&pred_channel, shape);
            all_boxes.push(boxes);
            all_scores.push(scores);
        }

        (all_boxes, all_scores)
    }

    fn process(
        &self,
        pred: &ndarray::ArrayView2<f32>,
        img_shape: &ImageScaleInfo,
    ) -> (Vec<BoundingBox>, Vec<f32>) {
        let height = pred.shape()[0] as u32;
        let width = pred.shape()[1] as u32;

        let mut mask_img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let value = if pred[[y as usize, x as usize]] > self.thresh {
                    255
                } else {
                    0
                };
                mask_img.put_pixel(x, y, image::Luma([value]));
            }
        }

        let mask_img = if self.use_dilation {
            morphology::dilate(&mask_img, Norm::LInf, 1)
        } else {
            mask_img
        };

        self.boxes_from_bitmap(pred, &mask_img, img_shape.src_w as u32, img_shape.src_h as u32)
    }

    fn boxes_from_bitmap(
        &self,
        pred: &ndarray::ArrayView2<f32>,
        bitmap: &GrayImage,
        dest_width: u32,
        dest_height: u32,
    ) -> (Vec<BoundingBox>, Vec<f32>) {
        let width_scale = dest_width as f32 / bitmap.width() as f32;
        let height_scale = dest_height as f32 / bitmap.height() as f32;

        let contours = find_contours::<u32>(bitmap);
        let mut boxes = Vec::new();
        let mut scores = Vec::new();

        for contour in contours.into_iter().take(self.max_candidates) {
            if contour.points.len() < 3 {
                continue;
            }

            let rect = BoundingBox::from_contour(&contour).get_min_area_rect();
            if rect.min_side() < self.min_size {
                continue;
            }
            let mini_box = BoundingBox::new(order_quad_points(rect.box_points()));

            let score = match self.score_mode {
                ScoreMode::Fast => Self::box_score_fast(pred, &mini_box),
                ScoreMode::Slow => Self::box_score_slow(pred, &contour),
            };
            if score < self.box_thresh {
                continue;
            }

            let unclipped = Self::unclip(&rect, &mini_box, self.unclip_ratio);
            if unclipped.min_side() < self.min_size + 2.0 {
                continue;
            }

            let scaled_points: Vec<Point> = order_quad_points(unclipped.box_points())
                .iter()
                .map(|point| {
                    Point::new(
                        (point.x * width_scale).round().clamp(0.0, dest_width as f32),
                        (point.y * height_scale)
                            .round()
                            .clamp(0.0, dest_height as f32),
                    )
                })
                .collect();

            boxes.push(BoundingBox::new(scaled_points));
            scores.push(score);
        }

        (boxes, scores)
    }

    /// Expands a quad by `area * ratio / perimeter`, the DB unclip rule.
    ///
    /// The quad is a rotated rectangle here, so the polygon offset reduces
    /// to growing the rectangle by the delta on every side.
    fn unclip(rect: &MinAreaRect, mini_box: &BoundingBox, unclip_ratio: f32) -> MinAreaRect {
        let area = mini_box.area();
        let perimeter = mini_box.perimeter();
        if perimeter <= f32::EPSILON {
            return *rect;
        }
        rect.inflate(area * unclip_ratio / perimeter)
    }

    /// Mean prediction over the pixels inside the box (approximate mask).
    fn box_score_fast(pred: &ndarray::ArrayView2<f32>, bbox: &BoundingBox) -> f32 {
        let height = pred.shape()[0];
        let width = pred.shape()[1];

        let min_x = bbox.x_min().max(0.0).min(width as f32 - 1.0) as usize;
        let max_x = bbox.x_max().max(0.0).min(width as f32 - 1.0) as usize;
        let min_y = bbox.y_min().max(0.0).min(height as f32 - 1.0) as usize;
        let max_y = bbox.y_max().max(0.0).min(height as f32 - 1.0) as usize;

        let mut total = 0.0;
        let mut count = 0usize;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                if point_in_polygon(x as f32 + 0.5, y as f32 + 0.5, &bbox.points) {
                    total += pred[[y, x]];
                    count += 1;
                }
            }
        }
        if count > 0 {
            total / count as f32
        } else {
            0.0
        }
    }

    /// Mean prediction over the exact contour pixels.
    fn box_score_slow(pred: &ndarray::ArrayView2<f32>, contour: &Contour<u32>) -> f32 {
        let mut total = 0.0;
        let mut count = 0usize;
        for point in &contour.points {
            let x = point.x as usize;
            let y = point.y as usize;
            if y < pred.shape()[0] && x < pred.shape()[1] {
                total += pred[[y, x]];
                count += 1;
            }
        }
        if count > 0 {
            total / count as f32
        } else {
            0.0
        }
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(x: f32, y: f32, points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (points[i], points[j]);
        if ((pi.y > y) != (pj.y > y))
            && (x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tensor4D;

    fn heatmap_with_block(h: usize, w: usize, y0: usize, y1: usize, x0: usize, x1: usize) -> Tensor4D {
        let mut pred = Tensor4D::zeros((1, 1, h, w));
        for y in y0..y1 {
            for x in x0..x1 {
                pred[[0, 0, y, x]] = 0.9;
            }
        }
        pred
    }

    #[test]
    fn test_detects_single_block() {
        let pred = heatmap_with_block(80, 80, 20, 40, 10, 60);
        let shapes = [ImageScaleInfo::new(80.0, 80.0, 1.0, 1.0)];
        let post = DBPostProcess::default();
        let (boxes, scores) = post.apply(&pred, &shapes);

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].len(), 1, "expected one detected region");
        assert!(scores[0][0] > 0.6);

        let bbox = &boxes[0][0];
        assert_eq!(bbox.points.len(), 4);
        // The unclipped box must cover the original block.
        assert!(bbox.x_min() <= 10.0);
        assert!(bbox.x_max() >= 59.0);
        assert!(bbox.y_min() <= 20.0);
        assert!(bbox.y_max() >= 39.0);
    }

    #[test]
    fn test_box_thresh_filters_weak_regions() {
        let mut pred = heatmap_with_block(80, 80, 20, 40, 10, 60);
        for y in 20..40 {
            for x in 10..60 {
                pred[[0, 0, y, x]] = 0.35;
            }
        }
        let shapes = [ImageScaleInfo::new(80.0, 80.0, 1.0, 1.0)];
        let post = DBPostProcess::default();
        let (boxes, _) = post.apply(&pred, &shapes);
        assert!(boxes[0].is_empty(), "weak region must be filtered");
    }

    #[test]
    fn test_min_size_filters_specks() {
        let pred = heatmap_with_block(80, 80, 10, 12, 10, 12);
        let shapes = [ImageScaleInfo::new(80.0, 80.0, 1.0, 1.0)];
        let post = DBPostProcess::default();
        let (boxes, _) = post.apply(&pred, &shapes);
        assert!(boxes[0].is_empty());
    }

    #[test]
    fn test_boxes_scale_to_source_coordinates() {
        let pred = heatmap_with_block(80, 80, 20, 40, 10, 60);
        // Source image twice the heatmap size.
        let shapes = [ImageScaleInfo::new(160.0, 160.0, 0.5, 0.5)];
        let post = DBPostProcess::default();
        let (boxes, _) = post.apply(&pred, &shapes);
        assert_eq!(boxes[0].len(), 1);
        assert!(boxes[0][0].x_max() > 100.0);
        assert!(boxes[0][0].x_max() <= 160.0);
    }

    #[test]
    fn test_fast_and_slow_modes_agree_on_solid_block() {
        let pred = heatmap_with_block(60, 60, 10, 30, 10, 50);
        let shapes = [ImageScaleInfo::new(60.0, 60.0, 1.0, 1.0)];
        let slow = DBPostProcess::default();
        let fast = DBPostProcess {
            score_mode: ScoreMode::Fast,
            ..DBPostProcess::default()
        };
        let (slow_boxes, _) = slow.apply(&pred, &shapes);
        let (fast_boxes, _) = fast.apply(&pred, &shapes);
        assert_eq!(slow_boxes[0].len(), 1);
        assert_eq!(fast_boxes[0].len(), 1);
    }

    #[test]
    fn test_dilation_keeps_region() {
        let pred = heatmap_with_block(80, 80, 20, 40, 10, 60);
        let shapes = [ImageScaleInfo::new(80.0, 80.0, 1.0, 1.0)];
        let post = DBPostProcess {
            use_dilation: true,
            ..DBPostProcess::default()
        };
        let (boxes, _) = post.apply(&pred, &shapes);
        assert_eq!(boxes[0].len(), 1);
    }
}
