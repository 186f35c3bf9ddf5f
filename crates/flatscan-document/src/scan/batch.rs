// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-parallel batch processing. Pages are independent, so each one runs on
// its own rayon worker; results come back in input order.

use flatscan_core::error::Result;
use flatscan_core::{PipelineConfig, RasterImage};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

use super::pipeline::ScanPipeline;

/// Process every page in parallel. One result per page, in page order; a
/// failed page does not affect the others.
///
/// An invalid configuration fails every page with the same error.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn process_pages(pages: &[RasterImage], config: &PipelineConfig) -> Vec<Result<RasterImage>> {
    if let Err(err) = config.validate() {
        warn!(%err, "Invalid pipeline configuration; every page will fail");
    }

    // Each worker validates and copies the configuration for itself.
    let results: Vec<Result<RasterImage>> = pages
        .par_iter()
        .map(|page| ScanPipeline::new(config)?.process(page))
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(pages = pages.len(), failed, "Batch complete");
    results
}

/// Process every page in parallel, failing with the first error in page
/// order.
pub fn process_pages_strict(
    pages: &[RasterImage],
    config: &PipelineConfig,
) -> Result<Vec<RasterImage>> {
    process_pages(pages, config).into_iter().collect()
}
