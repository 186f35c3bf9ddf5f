// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Flatscan.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A point in image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Four corners in canonical order: top-left, top-right, bottom-right,
/// bottom-left.
///
/// Build one from detector output through the geometry module's `order_rect`;
/// [`Quadrilateral::from_ordered`] trusts the caller's order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point2D,
    pub top_right: Point2D,
    pub bottom_right: Point2D,
    pub bottom_left: Point2D,
}

impl Quadrilateral {
    /// Wrap corners that are already in TL, TR, BR, BL order.
    pub const fn from_ordered(corners: [Point2D; 4]) -> Self {
        Self {
            top_left: corners[0],
            top_right: corners[1],
            bottom_right: corners[2],
            bottom_left: corners[3],
        }
    }

    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Enclosed area via the shoelace formula (absolute value).
    pub fn area(&self) -> f64 {
        polygon_area(&self.corners())
    }

    /// True when two opposite edges cross (a "bowtie").
    pub fn is_self_intersecting(&self) -> bool {
        let [tl, tr, br, bl] = self.corners();
        segments_intersect(tl, tr, br, bl) || segments_intersect(tr, br, bl, tl)
    }

    /// True when every turn along the boundary has the same orientation.
    pub fn is_convex(&self) -> bool {
        let c = self.corners();
        let mut sign = 0.0f64;
        for i in 0..4 {
            let a = c[i];
            let b = c[(i + 1) % 4];
            let d = c[(i + 2) % 4];
            let turn = cross(a, b, d);
            if turn.abs() < f64::EPSILON {
                return false;
            }
            if sign == 0.0 {
                sign = turn.signum();
            } else if turn.signum() != sign {
                return false;
            }
        }
        true
    }
}

/// Shoelace area of a closed polygon given by its vertices in boundary order.
pub fn polygon_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x * points[j].y;
        twice_area -= points[j].x * points[i].y;
    }
    twice_area.abs() / 2.0
}

/// Z component of (b - a) x (c - b).
fn cross(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
}

fn orientation(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper intersection test for segments `p1-p2` and `q1-q2` (touching
/// endpoints do not count).
fn segments_intersect(p1: Point2D, p2: Point2D, q1: Point2D, q2: Point2D) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// File formats handled by the decoder and encoder collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Bmp,
}

impl DocumentType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f64) -> Quadrilateral {
        Quadrilateral::from_ordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(side, 0.0),
            Point2D::new(side, side),
            Point2D::new(0.0, side),
        ])
    }

    #[test]
    fn distance_three_four_five() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn square_area_and_shape() {
        let quad = square(10.0);
        assert!((quad.area() - 100.0).abs() < 1e-9);
        assert!(quad.is_convex());
        assert!(!quad.is_self_intersecting());
    }

    #[test]
    fn bowtie_is_detected() {
        // TR and BR swapped: top and bottom edges cross.
        let quad = Quadrilateral::from_ordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(0.0, 10.0),
        ]);
        assert!(quad.is_self_intersecting());
        assert!(!quad.is_convex());
    }

    #[test]
    fn collinear_quad_is_not_convex() {
        let quad = Quadrilateral::from_ordered([
            Point2D::new(0.0, 0.0),
            Point2D::new(5.0, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(15.0, 0.0),
        ]);
        assert!(!quad.is_convex());
        assert_eq!(quad.area(), 0.0);
    }

    #[test]
    fn document_type_from_path() {
        assert_eq!(
            DocumentType::from_path(Path::new("scan.JPEG")),
            Some(DocumentType::Jpeg)
        );
        assert_eq!(
            DocumentType::from_path(Path::new("/tmp/a.pdf")),
            Some(DocumentType::Pdf)
        );
        assert_eq!(DocumentType::from_path(Path::new("notes.txt")), None);
        assert_eq!(DocumentType::from_path(Path::new("noext")), None);
    }
}
