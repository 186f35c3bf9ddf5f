// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image codec: decode standalone image files into RGB page buffers and
// re-encode processed pages in their original format.

use std::io::Cursor;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{Channels, DocumentType, RasterImage};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};

/// Decodes and encodes single-image documents.
pub struct ImageCodec;

impl ImageCodec {
    // -- Decoding -------------------------------------------------------------

    /// Decode any supported image, guessing the format from its header.
    /// Alpha is dropped and gray is expanded so the result is always RGB.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode(data: &[u8]) -> Result<RasterImage> {
        let img = image::load_from_memory(data)
            .map_err(|err| FlatscanError::ImageError(format!("failed to decode image: {err}")))?;
        Self::normalise(img)
    }

    /// Decode with an explicit format instead of sniffing the header.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn decode_as(data: &[u8], doc_type: DocumentType) -> Result<RasterImage> {
        let format = image_format(doc_type)?;
        let img = image::load_from_memory_with_format(data, format).map_err(|err| {
            FlatscanError::ImageError(format!("failed to decode {doc_type:?} image: {err}"))
        })?;
        Self::normalise(img)
    }

    fn normalise(img: DynamicImage) -> Result<RasterImage> {
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded"
        );
        RasterImage::from_rgb(img.to_rgb8())
    }

    // -- Encoding -------------------------------------------------------------

    /// Encode `page` as `doc_type`. JPEG honours `quality` (1-100); PNG uses
    /// the best compression level; TIFF and BMP use their defaults.
    #[instrument(skip(page), fields(width = page.width(), height = page.height()))]
    pub fn encode(page: &RasterImage, doc_type: DocumentType, quality: u8) -> Result<Vec<u8>> {
        let img = to_dynamic(page)?;
        let mut buffer = Vec::new();

        match doc_type {
            DocumentType::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                img.write_with_encoder(encoder).map_err(|err| {
                    FlatscanError::ImageError(format!("JPEG encoding failed: {err}"))
                })?;
            }
            DocumentType::Png => {
                let encoder = PngEncoder::new_with_quality(
                    &mut buffer,
                    CompressionType::Best,
                    FilterType::Adaptive,
                );
                img.write_with_encoder(encoder).map_err(|err| {
                    FlatscanError::ImageError(format!("PNG encoding failed: {err}"))
                })?;
            }
            other => {
                let format = image_format(other)?;
                img.write_to(&mut Cursor::new(&mut buffer), format)
                    .map_err(|err| {
                        FlatscanError::ImageError(format!("image encoding failed: {err}"))
                    })?;
            }
        }

        debug!(bytes = buffer.len(), ?doc_type, "Image encoded");
        Ok(buffer)
    }
}

/// Map a document type onto the `image` crate's format enum.
fn image_format(doc_type: DocumentType) -> Result<ImageFormat> {
    match doc_type {
        DocumentType::Jpeg => Ok(ImageFormat::Jpeg),
        DocumentType::Png => Ok(ImageFormat::Png),
        DocumentType::Tiff => Ok(ImageFormat::Tiff),
        DocumentType::Bmp => Ok(ImageFormat::Bmp),
        DocumentType::Pdf => Err(FlatscanError::UnsupportedDocument(
            "PDF is not a single-image format".into(),
        )),
    }
}

fn to_dynamic(page: &RasterImage) -> Result<DynamicImage> {
    Ok(match page.channels() {
        Channels::Gray => DynamicImage::ImageLuma8(page.to_gray_image()?),
        Channels::Rgb => DynamicImage::ImageRgb8(page.to_rgb_image()?),
    })
}
