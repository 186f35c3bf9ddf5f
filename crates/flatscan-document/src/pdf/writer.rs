// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble processed pages into a multi-page PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{Channels, RasterImage};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

const MM_PER_INCH: f32 = 25.4;
const DOCUMENT_TITLE: &str = "Flatscan Document";

/// Creates PDF documents with one full-bleed raster image per page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfWriter;

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    // -- Pages to PDF ---------------------------------------------------------

    /// Create a PDF with one page per image, in order.
    ///
    /// Each page is sized so that its image fills it exactly at `dpi`. For
    /// upscaled output the caller passes the effective resolution
    /// (`source dpi × upscale factor`) so the physical page size is unchanged.
    #[instrument(skip(self, pages), fields(pages = pages.len(), dpi))]
    pub fn create_from_pages(&self, pages: &[RasterImage], dpi: u32) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(FlatscanError::NoPages);
        }
        if dpi == 0 {
            return Err(FlatscanError::out_of_range("dpi", dpi, 1, u32::MAX));
        }
        info!("Creating PDF from pages");

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut pdf_pages = Vec::with_capacity(pages.len());

        for (index, page) in pages.iter().enumerate() {
            let raw = raw_image(page, index)?;
            let xobject_id = doc.add_image(&raw);

            let page_w = Mm(page.width() as f32 / dpi as f32 * MM_PER_INCH);
            let page_h = Mm(page.height() as f32 / dpi as f32 * MM_PER_INCH);

            // At native size and `dpi`, the image covers the page from the
            // bottom-left origin.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(dpi as f32),
                    rotate: None,
                },
            }];
            debug!(index, w_mm = page_w.0, h_mm = page_h.0, "Page placed");
            pdf_pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }

        debug!(bytes = output.len(), "PDF serialised");
        Ok(output)
    }
}

/// Pack a page into printpdf's raw image form. Gray pages stay single-channel.
fn raw_image(page: &RasterImage, index: usize) -> Result<RawImage> {
    let (pixels, data_format) = match page.channels() {
        Channels::Gray => (page.to_gray_image()?.into_raw(), RawImageFormat::R8),
        Channels::Rgb => (page.to_rgb_image()?.into_raw(), RawImageFormat::RGB8),
    };
    Ok(RawImage {
        pixels: RawImageData::U8(pixels),
        width: page.width() as usize,
        height: page.height() as usize,
        data_format,
        tag: format!("page-{index}").into_bytes(),
    })
}
