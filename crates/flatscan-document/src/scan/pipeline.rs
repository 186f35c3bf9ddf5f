// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page pipeline: detect the document boundary, rectify, then enhance.

use flatscan_core::error::Result;
use flatscan_core::{Channels, PipelineConfig, RasterImage};
use image::{GrayImage, RgbImage};
use tracing::{info, instrument};

use super::detect::DocumentDetector;
use super::enhance::enhance;
use super::rectify::{RectifyOutcome, rectify};

/// A finished page together with what the rectifier did to it.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    /// Single-channel binary output.
    pub image: RasterImage,
    pub outcome: RectifyOutcome,
}

/// Runs one page image through detection, rectification, and enhancement.
///
/// The configuration is validated on construction and copied, so a pipeline
/// can be shared across threads and never observes later changes by the
/// caller.
#[derive(Debug, Clone, Copy)]
pub struct ScanPipeline {
    config: PipelineConfig,
    detector: DocumentDetector,
}

impl ScanPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: *config,
            detector: DocumentDetector::from_config(config),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a 3-channel page into a binary page.
    ///
    /// Rejects grayscale or malformed input with `InvalidInput` before any
    /// pixel work.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: &RasterImage) -> Result<RasterImage> {
        self.process_detailed(image).map(|page| page.image)
    }

    /// Like [`process`](Self::process) but also reports the rectifier outcome.
    pub fn process_detailed(&self, image: &RasterImage) -> Result<ProcessedPage> {
        image.expect_channels(Channels::Rgb)?;
        let rgb = image.to_rgb_image()?;
        let (binary, outcome) = self.run(&rgb);
        Ok(ProcessedPage {
            image: RasterImage::from_gray(binary)?,
            outcome,
        })
    }

    fn run(&self, image: &RgbImage) -> (GrayImage, RectifyOutcome) {
        let quad = self.detector.detect(image);
        let rectified = rectify(image, quad.as_ref());
        let binary = enhance(&rectified.image, &self.config);
        info!(
            out_w = binary.width(),
            out_h = binary.height(),
            pass_through = rectified.is_pass_through(),
            "Page processed"
        );
        (binary, rectified.outcome)
    }
}

/// Validate `config` and run one page through the pipeline.
pub fn process_page(image: &RasterImage, config: &PipelineConfig) -> Result<RasterImage> {
    ScanPipeline::new(config)?.process(image)
}
