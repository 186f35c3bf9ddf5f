// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: rasterise scanned pages in, write processed pages out.

pub mod reader;
pub mod writer;

pub use reader::PdfPageSource;
pub use writer::PdfWriter;
