// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page source: pull the scanned image out of each page with `lopdf` and
// resample it to the page size at a requested resolution.
//
// Scanned PDFs carry one full-page image per page. We take the largest image
// XObject on each page, decode it, and resize it so that it covers the page
// MediaBox at `dpi`. Pages drawn only with vector operators are rejected.
// Scanners that store a page as several strips or tiles are not reassembled:
// only the largest strip survives, stretched over the whole page.

use std::path::Path;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::RasterImage;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f64 = 72.0;

/// Guard against runaway Parent chains when resolving inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Supplies one RGB raster per page of a scanned PDF.
pub struct PdfPageSource {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfPageSource {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            FlatscanError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Load a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            FlatscanError::PdfError(format!("failed to load PDF from memory: {err}"))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Rasterisation --------------------------------------------------------

    /// Raster every page in page order at `dpi`.
    #[instrument(skip(self))]
    pub fn render_pages(&self, dpi: u32) -> Result<Vec<RasterImage>> {
        let pages = self.document.get_pages();
        if pages.is_empty() {
            return Err(FlatscanError::NoPages);
        }
        info!(pages = pages.len(), dpi, "Rasterising PDF pages");
        // BTreeMap iteration is already ordered by page number.
        pages
            .iter()
            .map(|(&number, &id)| self.render_page_id(number, id, dpi))
            .collect()
    }

    /// Raster a single page (1-indexed) at `dpi`.
    pub fn render_page(&self, page_number: u32, dpi: u32) -> Result<RasterImage> {
        let pages = self.document.get_pages();
        let id = *pages.get(&page_number).ok_or_else(|| {
            FlatscanError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;
        self.render_page_id(page_number, id, dpi)
    }

    fn render_page_id(&self, page_number: u32, page_id: ObjectId, dpi: u32) -> Result<RasterImage> {
        let page = self.document.get_dictionary(page_id).map_err(|err| {
            FlatscanError::PdfError(format!("cannot read page {page_number}: {err}"))
        })?;

        let stream = self.largest_image(page).ok_or_else(|| {
            FlatscanError::UnsupportedDocument(format!(
                "page {page_number} has no embedded scan image"
            ))
        })?;
        let decoded = decode_image_stream(&self.document, stream)
            .map_err(|err| prefix_page(err, page_number))?;

        let rotation = self
            .inherited(page, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360);
        let rotated = rotate(decoded, rotation);

        let (target_w, target_h) = match self.media_box(page) {
            Some((w_pt, h_pt)) => {
                let (w_pt, h_pt) = if rotation == 90 || rotation == 270 {
                    (h_pt, w_pt)
                } else {
                    (w_pt, h_pt)
                };
                (points_to_pixels(w_pt, dpi), points_to_pixels(h_pt, dpi))
            }
            None => {
                warn!(page_number, "Page has no MediaBox; keeping native image size");
                rotated.dimensions()
            }
        };

        let page_image = if rotated.dimensions() == (target_w, target_h) {
            rotated
        } else {
            imageops::resize(&rotated, target_w, target_h, FilterType::CatmullRom)
        };
        debug!(
            page_number,
            width = page_image.width(),
            height = page_image.height(),
            "Page rasterised"
        );
        RasterImage::from_rgb(page_image)
    }

    // -- Page tree helpers ----------------------------------------------------

    /// Look up `key` on the page or the nearest ancestor that defines it.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = node.get(key) {
                return self.resolve(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        self.document.dereference(object).ok().map(|(_, obj)| obj)
    }

    /// Page width and height in points.
    fn media_box(&self, page: &Dictionary) -> Option<(f64, f64)> {
        let values = self.inherited(page, b"MediaBox")?.as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut coords = [0f64; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = f64::from(self.resolve(value)?.as_float().ok()?);
        }
        let width = (coords[2] - coords[0]).abs();
        let height = (coords[3] - coords[1]).abs();
        (width > 0.0 && height > 0.0).then_some((width, height))
    }

    /// The image XObject with the most pixels among the page's resources.
    fn largest_image<'a>(&'a self, page: &'a Dictionary) -> Option<&'a Stream> {
        let resources = self
            .inherited(page, b"Resources")
            .and_then(|o| o.as_dict().ok())?;
        let xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_dict().ok())?;

        let mut best: Option<(u64, &Stream)> = None;
        for (name, value) in xobjects.iter() {
            let Some(stream) = self.resolve(value).and_then(|o| o.as_stream().ok()) else {
                continue;
            };
            let dict = &stream.dict;
            if dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Image".as_slice()) {
                continue;
            }
            if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
                continue;
            }
            let (w, h) = (
                dict_u32(&self.document, dict, b"Width"),
                dict_u32(&self.document, dict, b"Height"),
            );
            let pixels = u64::from(w) * u64::from(h);
            debug!(name = %String::from_utf8_lossy(name), w, h, "Image XObject");
            if pixels > 0 && best.is_none_or(|(most, _)| pixels > most) {
                best = Some((pixels, stream));
            }
        }
        best.map(|(_, stream)| stream)
    }
}

// -- Image stream decoding ------------------------------------------------------

/// Component count implied by an image colour space.
fn color_components(doc: &Document, color_space: &Object) -> Result<u32> {
    let resolved = doc
        .dereference(color_space)
        .map(|(_, obj)| obj)
        .unwrap_or(color_space);
    match resolved {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(3),
            b"DeviceCMYK" | b"CMYK" => Ok(4),
            other => Err(FlatscanError::UnsupportedDocument(format!(
                "colour space {}",
                String::from_utf8_lossy(other)
            ))),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| o.as_name().ok()).unwrap_or(&[]);
            match family {
                b"ICCBased" => {
                    let n = items
                        .get(1)
                        .and_then(|o| doc.dereference(o).ok())
                        .and_then(|(_, o)| o.as_stream().ok())
                        .map(|s| dict_u32(doc, &s.dict, b"N"))
                        .unwrap_or(0);
                    match n {
                        1 | 3 | 4 => Ok(n),
                        _ => Err(FlatscanError::UnsupportedDocument(format!(
                            "ICC profile with {n} components"
                        ))),
                    }
                }
                b"CalGray" => Ok(1),
                b"CalRGB" => Ok(3),
                other => Err(FlatscanError::UnsupportedDocument(format!(
                    "colour space {}",
                    String::from_utf8_lossy(other)
                ))),
            }
        }
        _ => Err(FlatscanError::UnsupportedDocument(
            "image without a colour space".into(),
        )),
    }
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<RgbImage> {
    let dict = &stream.dict;
    let filters: Vec<Vec<u8>> = stream
        .filters()
        .map(|names| names.into_iter().map(<[u8]>::to_vec).collect())
        .unwrap_or_default();

    if filters.iter().any(|f| f == b"DCTDecode") {
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| FlatscanError::ImageError(format!("JPEG page image: {err}")))?;
        return Ok(img.to_rgb8());
    }

    let width = dict_u32(doc, dict, b"Width");
    let height = dict_u32(doc, dict, b"Height");
    if width == 0 || height == 0 {
        return Err(FlatscanError::PdfError("image has no dimensions".into()));
    }
    let bits = dict_u32(doc, dict, b"BitsPerComponent");
    let components = match dict.get(b"ColorSpace") {
        Ok(cs) => color_components(doc, cs)?,
        Err(_) => 1,
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|err| {
            FlatscanError::UnsupportedDocument(format!(
                "image filter {:?}: {err}",
                filters
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
            ))
        })?
    };

    match (bits, components) {
        (8, n) => unpack_8bit(&samples, width, height, n),
        (1, 1) => unpack_1bit_gray(&samples, width, height),
        _ => Err(FlatscanError::UnsupportedDocument(format!(
            "{bits}-bit samples with {components} components"
        ))),
    }
}

fn unpack_8bit(samples: &[u8], width: u32, height: u32, components: u32) -> Result<RgbImage> {
    let needed = width as usize * height as usize * components as usize;
    if samples.len() < needed {
        return Err(FlatscanError::PdfError(format!(
            "image data holds {} bytes, expected {needed}",
            samples.len()
        )));
    }
    let data = &samples[..needed];
    let img = match components {
        1 => DynamicImage::ImageLuma8(
            GrayImage::from_raw(width, height, data.to_vec())
                .ok_or_else(|| FlatscanError::PdfError("bad gray image".into()))?,
        )
        .to_rgb8(),
        3 => RgbImage::from_raw(width, height, data.to_vec())
            .ok_or_else(|| FlatscanError::PdfError("bad RGB image".into()))?,
        4 => {
            let rgb: Vec<u8> = data.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| FlatscanError::PdfError("bad CMYK image".into()))?
        }
        n => {
            return Err(FlatscanError::UnsupportedDocument(format!(
                "{n}-component images"
            )));
        }
    };
    Ok(img)
}

fn cmyk_to_rgb(px: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(px[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(px[0]), channel(px[1]), channel(px[2])]
}

/// 1 bit per sample, rows padded to whole bytes, 0 = black.
fn unpack_1bit_gray(samples: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if samples.len() < row_bytes * height as usize {
        return Err(FlatscanError::PdfError("1-bit image data is truncated".into()));
    }
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let byte = samples[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        let v = if bit == 1 { 255 } else { 0 };
        image::Rgb([v, v, v])
    }))
}

fn rotate(image: RgbImage, degrees: i64) -> RgbImage {
    match degrees.rem_euclid(360) {
        90 => imageops::rotate90(&image),
        180 => imageops::rotate180(&image),
        270 => imageops::rotate270(&image),
        _ => image,
    }
}

fn points_to_pixels(points: f64, dpi: u32) -> u32 {
    ((points / POINTS_PER_INCH * f64::from(dpi)).round() as u32).max(1)
}

fn dict_u32(doc: &Document, dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn prefix_page(err: FlatscanError, page_number: u32) -> FlatscanError {
    match err {
        FlatscanError::UnsupportedDocument(msg) => {
            FlatscanError::UnsupportedDocument(format!("page {page_number}: {msg}"))
        }
        FlatscanError::PdfError(msg) => FlatscanError::PdfError(format!("page {page_number}: {msg}")),
        FlatscanError::ImageError(msg) => {
            FlatscanError::ImageError(format!("page {page_number}: {msg}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    struct TestImage {
        width: i64,
        height: i64,
        color_space: &'static str,
        data: Vec<u8>,
        compress: bool,
    }

    /// Build a PDF with one page per image, each page `page_pt` points.
    fn build_pdf(images: Vec<TestImage>, page_pt: (i64, i64)) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();

        for image in images {
            let mut stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width,
                    "Height" => image.height,
                    "ColorSpace" => image.color_space,
                    "BitsPerComponent" => 8i64,
                },
                image.data,
            );
            if image.compress {
                stream.compress().unwrap();
            }
            let image_id = doc.add_object(stream);
            let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", page_pt.0, page_pt.1);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(page_pt.0),
                    Object::Integer(page_pt.1),
                ],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn rgb_image(width: i64, height: i64, rgb: [u8; 3], compress: bool) -> TestImage {
        TestImage {
            width,
            height,
            color_space: "DeviceRGB",
            data: rgb.repeat((width * height) as usize),
            compress,
        }
    }

    #[test]
    fn pages_come_back_in_order_at_requested_dpi() {
        let bytes = build_pdf(
            vec![
                rgb_image(20, 10, [255, 0, 0], false),
                rgb_image(20, 10, [0, 0, 255], true),
            ],
            (144, 72),
        );
        let source = PdfPageSource::from_bytes(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);

        let pages = source.render_pages(100).unwrap();
        assert_eq!(pages.len(), 2);
        // 144pt x 72pt at 100 dpi.
        assert_eq!(pages[0].dimensions(), (200, 100));
        assert_eq!(pages[0].pixel(100, 50), &[255, 0, 0]);
        assert_eq!(pages[1].pixel(100, 50), &[0, 0, 255]);
    }

    #[test]
    fn gray_and_cmyk_are_expanded_to_rgb() {
        let gray = TestImage {
            width: 4,
            height: 4,
            color_space: "DeviceGray",
            data: vec![128; 16],
            compress: false,
        };
        let cmyk = TestImage {
            width: 4,
            height: 4,
            color_space: "DeviceCMYK",
            data: [0, 0, 0, 255].repeat(16),
            compress: true,
        };
        let bytes = build_pdf(vec![gray, cmyk], (72, 72));
        let pages = PdfPageSource::from_bytes(&bytes).unwrap().render_pages(72).unwrap();
        assert_eq!(pages[0].dimensions(), (72, 72));
        assert_eq!(pages[0].pixel(36, 36), &[128, 128, 128]);
        assert_eq!(pages[1].pixel(36, 36), &[0, 0, 0]);
    }

    #[test]
    fn only_the_largest_strip_is_used() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let strip = |rgb: [u8; 3], height: i64| {
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => 20i64,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8i64,
                },
                rgb.repeat(20 * height as usize),
            )
        };
        let top = doc.add_object(strip([255, 0, 0], 6));
        let bottom = doc.add_object(strip([0, 0, 255], 4));
        let content = b"q 20 0 0 6 0 4 cm /Top Do Q q 20 0 0 4 0 0 cm /Bottom Do Q".to_vec();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Top" => top, "Bottom" => bottom },
            },
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(20),
                Object::Integer(10),
            ],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let page = PdfPageSource::from_bytes(&bytes).unwrap().render_page(1, 72).unwrap();
        assert_eq!(page.dimensions(), (20, 10));
        assert!(page.rows().all(|row| row.chunks(3).all(|px| px[0] >= 250 && px[2] <= 5)));
    }

    #[test]
    fn empty_document_has_no_pages() {
        let bytes = build_pdf(Vec::new(), (72, 72));
        let err = PdfPageSource::from_bytes(&bytes)
            .unwrap()
            .render_pages(200)
            .unwrap_err();
        assert!(matches!(err, FlatscanError::NoPages));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        let err = PdfPageSource::from_bytes(b"%PDF-nope").err().unwrap();
        assert!(matches!(err, FlatscanError::PdfError(_)));
    }

    #[test]
    fn out_of_range_page_is_rejected() {
        let bytes = build_pdf(vec![rgb_image(2, 2, [1, 2, 3], false)], (72, 72));
        let source = PdfPageSource::from_bytes(&bytes).unwrap();
        assert!(source.render_page(2, 72).is_err());
        assert!(source.render_page(1, 72).is_ok());
    }

    #[test]
    fn one_bit_rows_are_padded_to_bytes() {
        // 10 px wide: two bytes per row. First pixel white, rest black.
        let samples = [0b1000_0000, 0, 0b1000_0000, 0];
        let img = unpack_1bit_gray(&samples, 10, 2).unwrap();
        assert_eq!(img.get_pixel(0, 1).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(9, 0).0, [0, 0, 0]);
    }

    #[test]
    fn dpi_converts_points() {
        assert_eq!(points_to_pixels(612.0, 200), 1700);
        assert_eq!(points_to_pixels(792.0, 72), 792);
    }
}
