// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan-document: page processing for Flatscan.
//
// Finds the document boundary in a photographed or scanned page, flattens it
// with a perspective warp, and binarizes it for printing. Also provides the
// PDF and image codecs that feed pages in and write results out.

pub mod codec;
pub mod document;
pub mod geometry;
pub mod pdf;
pub mod scan;

// Re-export the primary types so callers can use `flatscan_document::ScanPipeline` etc.
pub use codec::ImageCodec;
pub use document::{DocumentEnhancer, EnhanceReport, output_path_for};
pub use geometry::{GeometryError, compute_perspective_warp, distance, order_rect};
pub use pdf::reader::PdfPageSource;
pub use pdf::writer::PdfWriter;
pub use scan::batch::{process_pages, process_pages_strict};
pub use scan::detect::DocumentDetector;
pub use scan::enhance::ScanEnhancer;
pub use scan::pipeline::{ScanPipeline, process_page};
pub use scan::rectify::{RectifyOutcome, rectify};
