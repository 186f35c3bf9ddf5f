// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectifier: flatten the detected page, or hand the original
// image through untouched when there is nothing usable to warp.

use std::borrow::Cow;

use flatscan_core::Quadrilateral;
use image::RgbImage;
use tracing::{info, instrument, warn};

use crate::geometry::{GeometryError, compute_perspective_warp};

/// What the rectifier did with a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RectifyOutcome {
    /// The page was warped onto an axis-aligned rectangle.
    Warped(Quadrilateral),
    /// The detector found no document; the full page is used.
    NoDocument,
    /// The detected quadrilateral could not be warped; the full page is used.
    Degenerate(GeometryError),
}

/// Result of [`rectify`]: the page to enhance and how it was obtained.
#[derive(Debug, Clone)]
pub struct Rectification<'a> {
    pub image: Cow<'a, RgbImage>,
    pub outcome: RectifyOutcome,
}

impl Rectification<'_> {
    pub fn is_pass_through(&self) -> bool {
        !matches!(self.outcome, RectifyOutcome::Warped(_))
    }
}

/// Warp `image` through `quad` if present and well-formed; otherwise borrow
/// the original.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn rectify<'a>(image: &'a RgbImage, quad: Option<&Quadrilateral>) -> Rectification<'a> {
    let Some(quad) = quad else {
        info!("No document boundary; using the full page");
        return Rectification {
            image: Cow::Borrowed(image),
            outcome: RectifyOutcome::NoDocument,
        };
    };

    match compute_perspective_warp(image, quad) {
        Ok(warped) => {
            info!(
                out_w = warped.width(),
                out_h = warped.height(),
                "Page rectified"
            );
            Rectification {
                image: Cow::Owned(warped),
                outcome: RectifyOutcome::Warped(*quad),
            }
        }
        Err(err) => {
            warn!(%err, "Degenerate document boundary; using the full page");
            Rectification {
                image: Cow::Borrowed(image),
                outcome: RectifyOutcome::Degenerate(err),
            }
        }
    }
}
