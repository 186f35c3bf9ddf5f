// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection: blur, Canny edges, external contours, and a
// largest-first search for the first simplified contour with four corners.
//
// Edges are found on each colour channel separately and merged, so a page
// that differs from its background only in hue still yields a boundary.

use flatscan_core::types::polygon_area;
use flatscan_core::{PipelineConfig, Point2D, Quadrilateral};
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, info, instrument, warn};

use crate::geometry::order_rect;

/// Gaussian sigma equivalent to a 5x5 kernel with automatic sigma.
pub const BLUR_SIGMA: f32 = 1.1;
/// Canny hysteresis thresholds on the 8-bit intensity scale. Low enough to
/// pick up faint page borders against varied backgrounds.
pub const CANNY_LOW: f32 = 10.0;
pub const CANNY_HIGH: f32 = 50.0;
/// Polygon approximation tolerance as a fraction of the contour perimeter.
pub const APPROX_EPSILON_RATIO: f64 = 0.02;

/// A closed outer boundary found in the edge map.
///
/// Only lives for the duration of one detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateContour {
    /// Boundary pixels in tracing order.
    pub points: Vec<Point2D>,
    /// Enclosed area of the raw boundary.
    pub area: f64,
}

impl CandidateContour {
    pub fn new(points: Vec<Point2D>) -> Self {
        let area = polygon_area(&points);
        Self { points, area }
    }

    /// Closed perimeter length.
    pub fn perimeter(&self) -> f64 {
        closed_arc_length(&self.points)
    }

    /// Simplify the boundary, allowing 2% of its perimeter as error.
    pub fn simplified(&self) -> Vec<Point2D> {
        approximate_closed_polygon(&self.points, APPROX_EPSILON_RATIO * self.perimeter())
    }
}

/// Locates the dominant rectangular object in a page image.
#[derive(Debug, Clone, Copy)]
pub struct DocumentDetector {
    area_threshold_ratio: f64,
}

impl DocumentDetector {
    pub fn new(area_threshold_ratio: f64) -> Self {
        Self {
            area_threshold_ratio,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.area_threshold_ratio)
    }

    /// External contours of the edge map, largest enclosed area first.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn candidates(&self, image: &RgbImage) -> Vec<CandidateContour> {
        let edges = edge_map(image);

        let mut candidates: Vec<CandidateContour> = find_contours::<i32>(&edges)
            .into_iter()
            .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
            .filter(|c| c.points.len() >= 3)
            .map(|c| {
                CandidateContour::new(
                    c.points
                        .iter()
                        .map(|p| Point2D::new(f64::from(p.x), f64::from(p.y)))
                        .collect(),
                )
            })
            .collect();

        // Stable sort: equal areas keep tracing order.
        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
        debug!(count = candidates.len(), "External contours extracted");
        candidates
    }

    /// Find the document quadrilateral, or `None` if nothing qualifies.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &RgbImage) -> Option<Quadrilateral> {
        let image_area = f64::from(image.width()) * f64::from(image.height());
        let min_area = self.area_threshold_ratio * image_area;

        let found = select_document(self.candidates(image), min_area);
        match &found {
            Some(quad) => info!(
                area = quad.area(),
                min_area,
                top_left = ?quad.top_left,
                bottom_right = ?quad.bottom_right,
                "Document boundary found"
            ),
            None => warn!(min_area, "No document boundary qualifies"),
        }
        found
    }
}

/// First candidate, in the given order, whose simplified polygon has exactly
/// four vertices and an area strictly above `min_area`.
///
/// Callers pass candidates sorted by area descending so the first match is
/// also the largest.
pub fn select_document<I>(candidates: I, min_area: f64) -> Option<Quadrilateral>
where
    I: IntoIterator<Item = CandidateContour>,
{
    candidates
        .into_iter()
        .map(|candidate| candidate.simplified())
        .find(|approx| approx.len() == 4 && polygon_area(approx) > min_area)
        .map(|approx| order_rect([approx[0], approx[1], approx[2], approx[3]]))
}

/// Blur, run Canny on each colour channel, and keep an edge wherever any
/// channel has one.
pub fn edge_map(image: &RgbImage) -> GrayImage {
    let blurred = gaussian_blur_f32(image, BLUR_SIGMA);
    let (width, height) = blurred.dimensions();

    let mut edges = GrayImage::new(width, height);
    for channel in 0..3 {
        let plane = GrayImage::from_fn(width, height, |x, y| {
            Luma([blurred.get_pixel(x, y)[channel]])
        });
        let plane_edges = canny(&plane, CANNY_LOW, CANNY_HIGH);
        for (merged, edge) in edges.pixels_mut().zip(plane_edges.pixels()) {
            merged[0] = merged[0].max(edge[0]);
        }
    }
    edges
}

// -- Polygon helpers -----------------------------------------------------------

/// Length of the closed polyline through `points`.
pub fn closed_arc_length(points: &[Point2D]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.distance_to(*b))
        .sum()
}

/// Douglas-Peucker simplification of a closed curve.
///
/// The curve is split at a pair of mutually distant points and each half is
/// simplified as an open chain; the result lists each kept vertex once.
pub fn approximate_closed_polygon(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let far = farthest_from(points, 0);
    let anchor = farthest_from(points, far);
    let (start, end) = (far.min(anchor), far.max(anchor));
    if start == end {
        return vec![points[start]];
    }

    let first = &points[start..=end];
    let second: Vec<Point2D> = points[end..]
        .iter()
        .chain(points[..=start].iter())
        .copied()
        .collect();

    let mut result = simplify_open(first, epsilon);
    result.pop();
    let mut tail = simplify_open(&second, epsilon);
    tail.pop();
    result.extend(tail);
    result
}

/// Index of the point farthest from `points[from]`. Earliest wins on ties.
fn farthest_from(points: &[Point2D], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_dist = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = origin.distance_to(*p);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Douglas-Peucker on an open chain. Keeps both endpoints.
fn simplify_open(chain: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let n = chain.len();
    if n <= 2 {
        return chain.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (mut split, mut max_dist) = (lo, 0.0);
        for i in (lo + 1)..hi {
            let d = distance_to_line(chain[i], chain[lo], chain[hi]);
            if d > max_dist {
                split = i;
                max_dist = d;
            }
        }
        if max_dist > epsilon {
            keep[split] = true;
            stack.push((lo, split));
            stack.push((split, hi));
        }
    }

    chain
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Distance from `p` to the line through `a` and `b` (or to `a` when they
/// coincide).
fn distance_to_line(p: Point2D, a: Point2D, b: Point2D) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len = dx.hypot(dy);
    if len == 0.0 {
        return p.distance_to(a);
    }
    ((p.x - a.x) * dy - (p.y - a.y) * dx).abs() / len
}
