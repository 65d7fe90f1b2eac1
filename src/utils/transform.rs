//! Image transformation utilities.
//!
//! Provides the perspective rotate-crop used to rectify detected quads
//! into upright strips before classification and recognition.

use crate::core::errors::OCRError;
use crate::processors::geometry::Point;
use image::{imageops, Rgb, RgbImage};
use nalgebra::{SMatrix, SVector};
use rayon::prelude::*;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Point2f {
    /// X coordinate of the point.
    pub x: f32,
    /// Y coordinate of the point.
    pub y: f32,
}

impl Point2f {
    /// Creates a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Point2f {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

fn distance(p1: &Point2f, p2: &Point2f) -> f32 {
    (p1.x - p2.x).hypot(p1.y - p2.y)
}

/// Extracts a rectified crop of the quadrilateral region defined by
/// `box_points` from the source image.
///
/// The region is cropped to its axis-aligned bounds, warped by the
/// perspective transform that maps the quad onto an upright rectangle,
/// and rotated by 270 degrees when the result is markedly taller than
/// wide (vertical text).
pub fn get_rotate_crop_image(
    src_image: &RgbImage,
    box_points: &[Point2f],
) -> Result<RgbImage, OCRError> {
    if box_points.len() != 4 {
        return Err(OCRError::InvalidInput {
            message: "box must contain exactly 4 points".to_string(),
        });
    }

    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for p in box_points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let left = min_x.max(0.0) as u32;
    let top = min_y.max(0.0) as u32;
    let right = max_x.min(src_image.width() as f32) as u32;
    let bottom = max_y.min(src_image.height() as f32) as u32;
    if right <= left || bottom <= top {
        return Err(OCRError::InvalidInput {
            message: "invalid crop region".to_string(),
        });
    }

    let img_crop = imageops::crop_imm(src_image, left, top, right - left, bottom - top).to_image();

    // Points relative to the crop, reordered to TL, TR, BR, BL so the
    // width/height estimate is stable whatever the input order.
    let mut sorted: Vec<Point2f> = box_points
        .iter()
        .map(|p| Point2f::new(p.x - left as f32, p.y - top as f32))
        .collect();
    sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    let (index_a, index_d) = if sorted[1].y < sorted[0].y { (1, 0) } else { (0, 1) };
    let (index_b, index_c) = if sorted[3].y < sorted[2].y { (3, 2) } else { (2, 3) };
    let ordered = [sorted[index_a], sorted[index_b], sorted[index_c], sorted[index_d]];

    let crop_width = distance(&ordered[0], &ordered[1])
        .max(distance(&ordered[2], &ordered[3]))
        .round() as u32;
    let crop_height = distance(&ordered[0], &ordered[3])
        .max(distance(&ordered[1], &ordered[2]))
        .round() as u32;
    if crop_width == 0 || crop_height == 0 {
        return Err(OCRError::InvalidInput {
            message: "invalid crop dimensions".to_string(),
        });
    }

    let pts_std = [
        Point2f::new(0.0, 0.0),
        Point2f::new(crop_width as f32, 0.0),
        Point2f::new(crop_width as f32, crop_height as f32),
        Point2f::new(0.0, crop_height as f32),
    ];

    // Solve the destination-to-source mapping directly so warping needs no
    // matrix inversion.
    let transform = get_perspective_transform(&pts_std, &ordered)?;
    let dst_img = warp_perspective(&img_crop, &transform, crop_width, crop_height);

    if dst_img.height() as f32 >= dst_img.width() as f32 * 1.5 {
        Ok(imageops::rotate270(&dst_img))
    } else {
        Ok(dst_img)
    }
}

/// Solves for the 3x3 homography mapping `src_points` to `dst_points`.
fn get_perspective_transform(
    src_points: &[Point2f; 4],
    dst_points: &[Point2f; 4],
) -> Result<SMatrix<f64, 3, 3>, OCRError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for i in 0..4 {
        let (sx, sy) = (src_points[i].x as f64, src_points[i].y as f64);
        let (dx, dy) = (dst_points[i].x as f64, dst_points[i].y as f64);

        a[(i, 0)] = sx;
        a[(i, 1)] = sy;
        a[(i, 2)] = 1.0;
        a[(i, 6)] = -sx * dx;
        a[(i, 7)] = -sy * dx;
        b[i] = dx;

        a[(i + 4, 3)] = sx;
        a[(i + 4, 4)] = sy;
        a[(i + 4, 5)] = 1.0;
        a[(i + 4, 6)] = -sx * dy;
        a[(i + 4, 7)] = -sy * dy;
        b[i + 4] = dy;
    }

    let h = a.lu().solve(&b).ok_or_else(|| OCRError::InvalidInput {
        message: "degenerate quadrilateral: perspective transform is singular".to_string(),
    })?;

    Ok(SMatrix::<f64, 3, 3>::new(
        h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0,
    ))
}

/// Warps the source image through the destination-to-source homography,
/// sampling bilinearly.
fn warp_perspective(
    src: &RgbImage,
    dst_to_src: &SMatrix<f64, 3, 3>,
    dst_width: u32,
    dst_height: u32,
) -> RgbImage {
    let src_w = src.width() as i64;
    let src_h = src.height() as i64;
    let mut rows: Vec<Vec<Rgb<u8>>> = vec![Vec::new(); dst_height as usize];

    rows.par_iter_mut().enumerate().for_each(|(y, row)| {
        row.reserve(dst_width as usize);
        for x in 0..dst_width {
            let dst = nalgebra::Vector3::new(x as f64, y as f64, 1.0);
            let mapped = dst_to_src * dst;
            let (sx, sy) = if mapped[2].abs() > f64::EPSILON {
                (mapped[0] / mapped[2], mapped[1] / mapped[2])
            } else {
                (-1.0, -1.0)
            };
            row.push(sample_bilinear(src, sx, sy, src_w, src_h));
        }
    });

    let mut out = RgbImage::new(dst_width, dst_height);
    for (y, row) in rows.into_iter().enumerate() {
        for (x, pixel) in row.into_iter().enumerate() {
            out.put_pixel(x as u32, y as u32, pixel);
        }
    }
    out
}

fn sample_bilinear(src: &RgbImage, sx: f64, sy: f64, src_w: i64, src_h: i64) -> Rgb<u8> {
    if sx < 0.0 || sy < 0.0 || sx > (src_w - 1) as f64 || sy > (src_h - 1) as f64 {
        return Rgb([0, 0, 0]);
    }
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let x1 = (x0 + 1).min(src_w - 1);
    let y1 = (y0 + 1).min(src_h - 1);
    let fx = sx - x0 as f64;
    let fy = sy - y0 as f64;

    let p00 = src.get_pixel(x0 as u32, y0 as u32);
    let p10 = src.get_pixel(x1 as u32, y0 as u32);
    let p01 = src.get_pixel(x0 as u32, y1 as u32);
    let p11 = src.get_pixel(x1 as u32, y1 as u32);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00.0[c] as f64 * (1.0 - fx) + p10.0[c] as f64 * fx;
        let bottom = p01.0[c] as f64 * (1.0 - fx) + p11.0[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_point_count() {
        let img = RgbImage::new(10, 10);
        let pts = [Point2f::new(0.0, 0.0)];
        assert!(get_rotate_crop_image(&img, &pts).is_err());
    }

    #[test]
    fn test_axis_aligned_crop_preserves_content() {
        let mut img = RgbImage::new(40, 20);
        for y in 5..15 {
            for x in 10..30 {
                img.put_pixel(x, y, Rgb([200, 100, 50]));
            }
        }
        let pts = [
            Point2f::new(10.0, 5.0),
            Point2f::new(30.0, 5.0),
            Point2f::new(30.0, 15.0),
            Point2f::new(10.0, 15.0),
        ];
        let crop = get_rotate_crop_image(&img, &pts).unwrap();
        assert_eq!(crop.width(), 20);
        assert_eq!(crop.height(), 10);
        let center = crop.get_pixel(10, 5);
        assert_eq!(center.0, [200, 100, 50]);
    }

    #[test]
    fn test_tall_crop_is_rotated() {
        let img = RgbImage::new(50, 100);
        let pts = [
            Point2f::new(10.0, 10.0),
            Point2f::new(20.0, 10.0),
            Point2f::new(20.0, 90.0),
            Point2f::new(10.0, 90.0),
        ];
        let crop = get_rotate_crop_image(&img, &pts).unwrap();
        assert!(crop.width() > crop.height());
    }

    #[test]
    fn test_degenerate_region_is_error() {
        let img = RgbImage::new(10, 10);
        let pts = [
            Point2f::new(5.0, 5.0),
            Point2f::new(5.0, 5.0),
            Point2f::new(5.0, 5.0),
            Point2f::new(5.0, 5.0),
        ];
        assert!(get_rotate_crop_image(&img, &pts).is_err());
    }
}
