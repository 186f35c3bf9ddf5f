// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement: cubic upscaling, grayscale conversion, and
// Gaussian-weighted adaptive binarization of a rectified page.

use flatscan_core::{BinarizationParams, PipelineConfig};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

/// Enhances rectified page images for print-quality output.
///
/// Each method consumes `self` and returns the transformed enhancer, so the
/// stages chain:
///
/// ```ignore
/// let binary = ScanEnhancer::from_rgb(page)
///     .upscale(2)
///     .grayscale()
///     .binarize_gaussian(BinarizationParams::default())
///     .into_gray();
/// ```
///
/// Re-running the chain on its own binary output is not guaranteed to give
/// the same image: the local threshold of an already-binary page can flip
/// pixels near strokes.
pub struct ScanEnhancer {
    /// The working image (kept as `DynamicImage` so colour and gray stages
    /// share one type).
    image: DynamicImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            image: DynamicImage::ImageRgb8(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Consume the enhancer and return a single-channel image. Converts if
    /// the working image is not yet grayscale.
    pub fn into_gray(self) -> GrayImage {
        match self.image {
            DynamicImage::ImageLuma8(gray) => gray,
            other => other.to_luma8(),
        }
    }

    // -- Stages ---------------------------------------------------------------

    /// Enlarge both dimensions by `factor` with cubic (Catmull-Rom)
    /// interpolation. A factor of 1 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn upscale(self, factor: u32) -> Self {
        if factor <= 1 {
            return self;
        }
        let (w, h) = (self.image.width(), self.image.height());
        let (new_w, new_h) = (w.saturating_mul(factor), h.saturating_mul(factor));
        info!(from_w = w, from_h = h, new_w, new_h, "Upscaling page");
        Self {
            image: self.image.resize_exact(new_w, new_h, FilterType::CatmullRom),
        }
    }

    /// Convert to single-channel luma.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Apply Gaussian-weighted adaptive thresholding.
    ///
    /// For each pixel the reference is the Gaussian-weighted mean of a
    /// `block_size` square around it (edges replicated), minus `offset`.
    /// Pixels strictly brighter than the reference become white, all others
    /// black.
    #[instrument(skip(self), fields(block_size = params.block_size, offset = params.offset))]
    pub fn binarize_gaussian(self, params: BinarizationParams) -> Self {
        info!("Applying adaptive binarization");
        let gray = self.into_gray();
        let output = adaptive_threshold_gaussian(&gray, params.block_size, params.offset);
        Self {
            image: DynamicImage::ImageLuma8(output),
        }
    }
}

/// The enhancer stage of the page pipeline: upscale, grayscale, binarize.
///
/// Output is `upscale_factor` times the input in each dimension, with every
/// sample exactly 0 or 255.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn enhance(image: &RgbImage, config: &PipelineConfig) -> GrayImage {
    ScanEnhancer::from_rgb(image.clone())
        .upscale(config.upscale_factor)
        .grayscale()
        .binarize_gaussian(config.binarization)
        .into_gray()
}

// -- Adaptive threshold helpers -------------------------------------------------

/// Sigma used for a Gaussian kernel of `size` taps when none is given.
fn auto_sigma(size: u32) -> f64 {
    0.3 * ((f64::from(size) - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel of odd length `size`.
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = auto_sigma(size);
    let radius = (size / 2) as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Binarize `gray` against its Gaussian-weighted local mean minus `offset`.
pub fn adaptive_threshold_gaussian(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return GrayImage::new(width, height);
    }

    let kernel = gaussian_kernel(block_size);
    let radius = (kernel.len() / 2) as isize;
    let src = gray.as_raw();

    // Horizontal pass.
    let mut horizontal = vec![0f32; w * h];
    horizontal
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out_row)| {
            let row = &src[y * w..(y + 1) * w];
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - radius, w);
                    acc += weight * f32::from(row[sx]);
                }
                *out = acc;
            }
        });

    // Vertical pass, then compare against the rounded local mean.
    let mut output = vec![0u8; w * h];
    output
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = clamp_index(y as isize + k as isize - radius, h);
                    acc += weight * horizontal[sy * w + x];
                }
                let mean = acc.round().clamp(0.0, 255.0) as i32;
                let value = i32::from(src[y * w + x]);
                *out = if value > mean - offset { 255 } else { 0 };
            }
        });

    GrayImage::from_raw(width, height, output)
        .unwrap_or_else(|| GrayImage::from_pixel(width, height, Luma([255])))
}

/// Replicate-border index clamp.
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}
