// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry helpers for perspective correction: point distance, canonical
// corner ordering, and the quadrilateral-to-rectangle warp.

use flatscan_core::{Point2D, Quadrilateral};
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use thiserror::Error;
use tracing::{debug, instrument};

/// Smallest quadrilateral area (in square pixels) we are willing to warp.
const MIN_WARP_AREA: f64 = 1.0;

/// Tolerance, in output pixels, when checking that the homography sends each
/// source corner to its rectangle corner.
const CORNER_TOLERANCE: f32 = 0.5;

/// Why a quadrilateral cannot be warped.
///
/// The rectifier turns every variant into a full-page pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("target rectangle would be {width}x{height} pixels")]
    ZeroTarget { width: u32, height: u32 },

    #[error("quadrilateral edges cross each other")]
    SelfIntersecting,

    #[error("quadrilateral is collinear or has coincident corners")]
    Collapsed,

    #[error("perspective transform is singular")]
    SingularHomography,
}

/// Euclidean distance between two points.
pub fn distance(p1: Point2D, p2: Point2D) -> f64 {
    p1.distance_to(p2)
}

/// Sort four points into top-left, top-right, bottom-right, bottom-left.
///
/// TL minimises `x + y`, BR maximises it, TR minimises `y - x` (i.e. has the
/// largest `x - y`), BL maximises `y - x`. On exact ties the earliest point
/// in `points` wins, so a square rotated by 45 degrees may map two roles to
/// the same point; the warp rejects that case as collapsed.
pub fn order_rect(points: [Point2D; 4]) -> Quadrilateral {
    let sum = |p: &Point2D| p.x + p.y;
    let diff = |p: &Point2D| p.y - p.x;

    Quadrilateral::from_ordered([
        first_extreme(&points, sum, Extreme::Min),
        first_extreme(&points, diff, Extreme::Min),
        first_extreme(&points, sum, Extreme::Max),
        first_extreme(&points, diff, Extreme::Max),
    ])
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

/// Return the first point holding the extreme `key` value.
fn first_extreme(points: &[Point2D; 4], key: impl Fn(&Point2D) -> f64, extreme: Extreme) -> Point2D {
    let mut best = points[0];
    let mut best_key = key(&best);
    for point in &points[1..] {
        let k = key(point);
        let better = match extreme {
            Extreme::Min => k < best_key,
            Extreme::Max => k > best_key,
        };
        if better {
            best = *point;
            best_key = k;
        }
    }
    best
}

/// Size of the rectified page: the longer of each pair of opposite edges,
/// truncated to whole pixels.
pub fn target_dimensions(quad: &Quadrilateral) -> (u32, u32) {
    let width_bottom = distance(quad.bottom_right, quad.bottom_left);
    let width_top = distance(quad.top_right, quad.top_left);
    let height_right = distance(quad.top_right, quad.bottom_right);
    let height_left = distance(quad.top_left, quad.bottom_left);

    let to_px = |len: f64| {
        if len.is_finite() {
            len.trunc().clamp(0.0, u32::MAX as f64) as u32
        } else {
            0
        }
    };
    (
        to_px(width_bottom.max(width_top)),
        to_px(height_right.max(height_left)),
    )
}

/// Homography sending `quad` onto `(0,0)-(w-1,0)-(w-1,h-1)-(0,h-1)`.
pub fn perspective_projection(quad: &Quadrilateral, width: u32, height: u32) -> Option<Projection> {
    let src = quad.corners().map(|p| (p.x as f32, p.y as f32));
    let (right, bottom) = (width as f32 - 1.0, height as f32 - 1.0);
    let dst = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

    let projection = Projection::from_control_points(src, dst)?;

    // Reject numerically unstable solutions: every corner must land where it
    // was asked to, and nothing may come out as NaN or infinity.
    let lands_on_target = src.iter().zip(dst.iter()).all(|(&s, &(dx, dy))| {
        let (mx, my) = projection * s;
        mx.is_finite()
            && my.is_finite()
            && (mx - dx).abs() <= CORNER_TOLERANCE
            && (my - dy).abs() <= CORNER_TOLERANCE
    });
    lands_on_target.then_some(projection)
}

/// Order `quad`, size the target rectangle, and resample `image` through the
/// homography. Source samples outside the image are black.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn compute_perspective_warp(
    image: &RgbImage,
    quad: &Quadrilateral,
) -> Result<RgbImage, GeometryError> {
    let ordered = order_rect(quad.corners());

    let corners = ordered.corners();
    let coincident = (0..4).any(|i| ((i + 1)..4).any(|j| corners[i] == corners[j]));
    if coincident || !corners.iter().all(Point2D::is_finite) || ordered.area() < MIN_WARP_AREA {
        return Err(GeometryError::Collapsed);
    }
    if ordered.is_self_intersecting() {
        return Err(GeometryError::SelfIntersecting);
    }

    let (width, height) = target_dimensions(&ordered);
    if width < 2 || height < 2 {
        return Err(GeometryError::ZeroTarget { width, height });
    }

    let projection =
        perspective_projection(&ordered, width, height).ok_or(GeometryError::SingularHomography)?;

    let mut output = RgbImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([0u8, 0, 0]),
        &mut output,
    );

    debug!(out_w = width, out_h = height, "Perspective warp applied");
    Ok(output)
}
