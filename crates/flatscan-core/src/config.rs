// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline and output configuration. Every value is validated once at
// construction and again by the pipeline before it touches any pixels.

use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};

/// Minimum and maximum accepted `area_threshold_ratio`.
pub const AREA_THRESHOLD_RANGE: (f64, f64) = (0.1, 1.0);
/// Minimum and maximum accepted `upscale_factor`.
pub const UPSCALE_FACTOR_RANGE: (u32, u32) = (1, 5);
/// Minimum and maximum accepted lossy-encoding quality.
pub const QUALITY_RANGE: (u8, u8) = (1, 100);
/// Minimum and maximum accepted PDF rasterisation resolution.
pub const DPI_RANGE: (u32, u32) = (72, 600);

/// Adaptive binarization constants.
///
/// These are fixed policy calibrated for uneven scan lighting and are not
/// exposed for tuning; [`Default`] is the only way to build one outside tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinarizationParams {
    /// Side of the square Gaussian-weighted neighbourhood. Always odd.
    pub block_size: u32,
    /// Constant subtracted from the local weighted mean before comparison.
    pub offset: i32,
}

impl Default for BinarizationParams {
    fn default() -> Self {
        Self {
            block_size: 91,
            offset: 30,
        }
    }
}

/// Per-invocation configuration of the page pipeline.
///
/// Constructed once, read-only afterwards. Workers each receive a copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of the page area a 4-vertex boundary must strictly exceed to
    /// be accepted as the document.
    pub area_threshold_ratio: f64,
    /// Integer multiplier applied to both dimensions before binarization.
    pub upscale_factor: u32,
    /// Fixed binarization constants.
    #[serde(skip)]
    pub binarization: BinarizationParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            area_threshold_ratio: 0.4,
            upscale_factor: 2,
            binarization: BinarizationParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Build a validated configuration with the fixed binarization constants.
    pub fn new(area_threshold_ratio: f64, upscale_factor: u32) -> Result<Self> {
        let config = Self {
            area_threshold_ratio,
            upscale_factor,
            binarization: BinarizationParams::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject any value outside its documented bounds.
    pub fn validate(&self) -> Result<()> {
        let (min_ratio, max_ratio) = AREA_THRESHOLD_RANGE;
        // NaN fails both comparisons and is rejected here too.
        if !(self.area_threshold_ratio >= min_ratio && self.area_threshold_ratio <= max_ratio) {
            return Err(FlatscanError::out_of_range(
                "area_threshold_ratio",
                self.area_threshold_ratio,
                min_ratio,
                max_ratio,
            ));
        }

        let (min_factor, max_factor) = UPSCALE_FACTOR_RANGE;
        if !(min_factor..=max_factor).contains(&self.upscale_factor) {
            return Err(FlatscanError::out_of_range(
                "upscale_factor",
                self.upscale_factor,
                min_factor,
                max_factor,
            ));
        }

        let block = self.binarization.block_size;
        if block < 3 || block % 2 == 0 {
            return Err(FlatscanError::out_of_range(
                "binarization.block_size",
                block,
                "3 (odd)",
                "odd",
            ));
        }

        Ok(())
    }
}

/// Collaborator options: how pages are rasterised and re-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Lossy-encoding quality (1-100) for formats that support it.
    pub quality: u8,
    /// Resolution at which PDF pages are rasterised.
    pub dpi: u32,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            quality: 95,
            dpi: 200,
        }
    }
}

impl OutputOptions {
    /// Build validated output options.
    pub fn new(quality: u8, dpi: u32) -> Result<Self> {
        let options = Self { quality, dpi };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let (min_q, max_q) = QUALITY_RANGE;
        if !(min_q..=max_q).contains(&self.quality) {
            return Err(FlatscanError::out_of_range(
                "quality",
                self.quality,
                min_q,
                max_q,
            ));
        }
        let (min_dpi, max_dpi) = DPI_RANGE;
        if !(min_dpi..=max_dpi).contains(&self.dpi) {
            return Err(FlatscanError::out_of_range("dpi", self.dpi, min_dpi, max_dpi));
        }
        Ok(())
    }
}
