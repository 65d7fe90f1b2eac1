//! Reading-order sorting for detected text boxes.
//!
//! Boxes are sorted from top to bottom, left to right; boxes on the same
//! horizontal line (within a 10 pixel threshold) are ordered by their
//! x coordinate. The recognized strings are reported in this order.

use crate::processors::geometry::BoundingBox;

const SAME_LINE_THRESHOLD: f32 = 10.0;

/// Sorts quad boxes into reading order.
pub fn sort_quad_boxes(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    if boxes.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<BoundingBox> = boxes.to_vec();
    sorted.sort_by(|a, b| {
        match a.y_min().partial_cmp(&b.y_min()) {
            Some(std::cmp::Ordering::Equal) | None => a
                .x_min()
                .partial_cmp(&b.x_min())
                .unwrap_or(std::cmp::Ordering::Equal),
            Some(other) => other,
        }
    });

    // Adjacent boxes on the same visual line keep left-to-right order.
    let num_boxes = sorted.len();
    for i in 0..num_boxes.saturating_sub(1) {
        for j in (0..=i).rev() {
            if j + 1 >= sorted.len() {
                break;
            }
            let same_line =
                (sorted[j + 1].y_min() - sorted[j].y_min()).abs() < SAME_LINE_THRESHOLD;
            if same_line && sorted[j + 1].x_min() < sorted[j].x_min() {
                sorted.swap(j, j + 1);
            } else {
                break;
            }
        }
    }

    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Point;

    fn quad(x: f32, y: f32) -> BoundingBox {
        BoundingBox::new(vec![
            Point::new(x, y),
            Point::new(x + 20.0, y),
            Point::new(x + 20.0, y + 10.0),
            Point::new(x, y + 10.0),
        ])
    }

    #[test]
    fn test_sorts_top_to_bottom() {
        let boxes = vec![quad(0.0, 50.0), quad(0.0, 5.0)];
        let sorted = sort_quad_boxes(&boxes);
        assert!(sorted[0].y_min() < sorted[1].y_min());
    }

    #[test]
    fn test_same_line_sorts_left_to_right() {
        let boxes = vec![quad(80.0, 10.0), quad(10.0, 12.0), quad(40.0, 8.0)];
        let sorted = sort_quad_boxes(&boxes);
        let xs: Vec<f32> = sorted.iter().map(|b| b.x_min()).collect();
        assert_eq!(xs, vec![10.0, 40.0, 80.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(sort_quad_boxes(&[]).is_empty());
    }
}
