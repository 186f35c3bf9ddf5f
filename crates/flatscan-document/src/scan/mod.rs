// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: boundary detection, perspective rectification,
// enhancement, and page-parallel batches.

pub mod batch;
pub mod detect;
pub mod enhance;
pub mod pipeline;
pub mod rectify;

pub use batch::{process_pages, process_pages_strict};
pub use detect::{CandidateContour, DocumentDetector};
pub use enhance::ScanEnhancer;
pub use pipeline::{ProcessedPage, ScanPipeline, process_page};
pub use rectify::{Rectification, RectifyOutcome, rectify};
