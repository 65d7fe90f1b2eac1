//! Box geometry for detection post-processing.
//!
//! Provides the quadrilateral [`BoundingBox`] emitted by the detector and
//! the rotated [`MinAreaRect`] used to rectify raw contours into quads.

use imageproc::contours::Contour;
use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X coordinate of the point.
    pub x: f32,
    /// Y coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A polygonal bounding box; the detector emits it with exactly four
/// points ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// The vertices of the box.
    pub points: Vec<Point>,
}

impl BoundingBox {
    /// Creates a bounding box from a list of vertices.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a bounding box from a raster contour.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        Self {
            points: contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect(),
        }
    }

    /// Smallest x coordinate over the vertices.
    pub fn x_min(&self) -> f32 {
        self.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min)
    }

    /// Largest x coordinate over the vertices.
    pub fn x_max(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.x)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Smallest y coordinate over the vertices.
    pub fn y_min(&self) -> f32 {
        self.points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min)
    }

    /// Largest y coordinate over the vertices.
    pub fn y_max(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Signed shoelace area of the polygon, as an absolute value.
    pub fn area(&self) -> f32 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        (sum / 2.0).abs()
    }

    /// Perimeter of the polygon.
    pub fn perimeter(&self) -> f32 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += (a.x - b.x).hypot(a.y - b.y);
        }
        sum
    }

    /// Convex hull of the vertices (Andrew's monotone chain).
    pub fn convex_hull(&self) -> BoundingBox {
        let mut pts = self.points.clone();
        if pts.len() < 3 {
            return BoundingBox::new(pts);
        }
        pts.sort_by(|a, b| {
            a.x.partial_cmp(&b.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
        pts.dedup_by(|a, b| (a.x - b.x).abs() < f32::EPSILON && (a.y - b.y).abs() < f32::EPSILON);
        if pts.len() < 3 {
            return BoundingBox::new(pts);
        }

        let cross = |o: Point, a: Point, b: Point| -> f32 {
            (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
        };

        let mut hull: Vec<Point> = Vec::with_capacity(pts.len() * 2);
        for &p in &pts {
            while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
                hull.pop();
            }
            hull.push(p);
        }
        let lower_len = hull.len() + 1;
        for &p in pts.iter().rev() {
            while hull.len() >= lower_len
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
        BoundingBox::new(hull)
    }

    /// Minimum-area rotated rectangle around the vertices, computed with
    /// rotating calipers over the convex hull.
    pub fn get_min_area_rect(&self) -> MinAreaRect {
        let degenerate = MinAreaRect {
            center: Point::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        };
        if self.points.len() < 3 {
            return degenerate;
        }

        let hull = self.convex_hull();
        let hull_points = &hull.points;
        if hull_points.len() < 3 {
            // Collinear input: fall back to the axis-aligned extent.
            let (min_x, max_x) = (self.x_min(), self.x_max());
            let (min_y, max_y) = (self.y_min(), self.y_max());
            return MinAreaRect {
                center: Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
                width: max_x - min_x,
                height: max_y - min_y,
                angle: 0.0,
            };
        }

        let n = hull_points.len();
        let mut min_area = f32::MAX;
        let mut min_rect = degenerate;

        for i in 0..n {
            let j = (i + 1) % n;
            let edge_x = hull_points[j].x - hull_points[i].x;
            let edge_y = hull_points[j].y - hull_points[i].y;
            let edge_len = (edge_x * edge_x + edge_y * edge_y).sqrt();
            if edge_len < f32::EPSILON {
                continue;
            }

            let (nx, ny) = (edge_x / edge_len, edge_y / edge_len);
            let (px, py) = (-ny, nx);

            let mut min_n = f32::MAX;
            let mut max_n = f32::MIN;
            let mut min_p = f32::MAX;
            let mut max_p = f32::MIN;
            for point in hull_points {
                let proj_n = nx * (point.x - hull_points[i].x) + ny * (point.y - hull_points[i].y);
                let proj_p = px * (point.x - hull_points[i].x) + py * (point.y - hull_points[i].y);
                min_n = min_n.min(proj_n);
                max_n = max_n.max(proj_n);
                min_p = min_p.min(proj_p);
                max_p = max_p.max(proj_p);
            }

            let width = max_n - min_n;
            let height = max_p - min_p;
            let area = width * height;
            if area < min_area {
                min_area = area;
                let center_n = (min_n + max_n) / 2.0;
                let center_p = (min_p + max_p) / 2.0;
                min_rect = MinAreaRect {
                    center: Point::new(
                        hull_points[i].x + center_n * nx + center_p * px,
                        hull_points[i].y + center_n * ny + center_p * py,
                    ),
                    width,
                    height,
                    angle: f32::atan2(ny, nx) * 180.0 / PI,
                };
            }
        }

        min_rect
    }
}

/// A rotated rectangle described by center, size, and angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinAreaRect {
    /// Center of the rectangle.
    pub center: Point,
    /// Extent along the rectangle's own x axis.
    pub width: f32,
    /// Extent along the rectangle's own y axis.
    pub height: f32,
    /// Rotation angle in degrees.
    pub angle: f32,
}

impl MinAreaRect {
    /// The four corner points of the rectangle, unordered.
    pub fn box_points(&self) -> Vec<Point> {
        let cos_a = (self.angle * PI / 180.0).cos();
        let sin_a = (self.angle * PI / 180.0).sin();
        let w_2 = self.width / 2.0;
        let h_2 = self.height / 2.0;
        [(-w_2, -h_2), (w_2, -h_2), (w_2, h_2), (-w_2, h_2)]
            .iter()
            .map(|(x, y)| {
                Point::new(
                    x * cos_a - y * sin_a + self.center.x,
                    x * sin_a + y * cos_a + self.center.y,
                )
            })
            .collect()
    }

    /// The shorter side of the rectangle.
    pub fn min_side(&self) -> f32 {
        self.width.min(self.height)
    }

    /// A copy grown by `delta` on every side.
    pub fn inflate(&self, delta: f32) -> Self {
        Self {
            center: self.center,
            width: self.width + 2.0 * delta,
            height: self.height + 2.0 * delta,
            angle: self.angle,
        }
    }
}

/// Orders four points as top-left, top-right, bottom-right, bottom-left:
/// sort by x, then pick sides by y.
pub fn order_quad_points(mut points: Vec<Point>) -> Vec<Point> {
    if points.len() != 4 {
        return points;
    }
    points.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

    let (index_1, index_4) = if points[1].y > points[0].y {
        (0usize, 1usize)
    } else {
        (1usize, 0usize)
    };
    let (index_2, index_3) = if points[3].y > points[2].y {
        (2usize, 3usize)
    } else {
        (3usize, 2usize)
    };

    vec![
        points[index_1],
        points[index_2],
        points[index_3],
        points[index_4],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_quad_points() {
        let input = vec![
            Point::new(20.0, 20.0),
            Point::new(10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 20.0),
        ];
        let ordered = order_quad_points(input);
        assert_eq!(ordered[0], Point::new(10.0, 10.0));
        assert_eq!(ordered[1], Point::new(20.0, 10.0));
        assert_eq!(ordered[2], Point::new(20.0, 20.0));
        assert_eq!(ordered[3], Point::new(10.0, 20.0));
    }

    #[test]
    fn test_min_area_rect_of_axis_aligned_rect() {
        let bbox = BoundingBox::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ]);
        let rect = bbox.get_min_area_rect();
        assert!((rect.min_side() - 5.0).abs() < 1e-3);
        assert!((rect.width.max(rect.height) - 10.0).abs() < 1e-3);
        assert!((rect.center.x - 5.0).abs() < 1e-3);
        assert!((rect.center.y - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_min_area_rect_of_rotated_rect() {
        // A unit square rotated 45 degrees around the origin.
        let bbox = BoundingBox::new(vec![
            Point::new(0.0, -1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
        ]);
        let rect = bbox.get_min_area_rect();
        let side = (2.0f32).sqrt();
        assert!((rect.width - side).abs() < 1e-3);
        assert!((rect.height - side).abs() < 1e-3);
    }

    #[test]
    fn test_area_and_perimeter() {
        let bbox = BoundingBox::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 3.0),
            Point::new(0.0, 3.0),
        ]);
        assert!((bbox.area() - 12.0).abs() < 1e-6);
        assert!((bbox.perimeter() - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_inflate_grows_both_sides() {
        let rect = MinAreaRect {
            center: Point::new(1.0, 1.0),
            width: 4.0,
            height: 2.0,
            angle: 0.0,
        };
        let grown = rect.inflate(1.5);
        assert!((grown.width - 7.0).abs() < 1e-6);
        assert!((grown.height - 5.0).abs() < 1e-6);
        assert_eq!(grown.center, rect.center);
    }
}
