// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-document workflows: decode a PDF or image, run every page through the
// scan pipeline, and encode the result. Images are re-encoded in the format
// named by the output extension, which defaults to the source format.

use std::path::{Path, PathBuf};

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::{DocumentType, OutputOptions, PipelineConfig};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::codec::ImageCodec;
use crate::pdf::{PdfPageSource, PdfWriter};
use crate::scan::{ScanPipeline, process_pages_strict};

/// Suffix appended to the input stem when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_enhanced";

/// What a file-level run did, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EnhanceReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub document_type: DocumentType,
    /// Format actually written; differs from `document_type` when the output
    /// path names another image format.
    pub output_type: DocumentType,
    pub pages: usize,
    pub config: PipelineConfig,
    pub options: OutputOptions,
}

/// Runs the scan pipeline over whole documents.
pub struct DocumentEnhancer;

impl DocumentEnhancer {
    /// Enhance every page of a scanned PDF, returning a new PDF.
    ///
    /// Pages are rasterised at `options.dpi` and the output is written at
    /// `dpi × upscale_factor` so the physical page size is unchanged.
    pub fn enhance_pdf(
        data: &[u8],
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<Vec<u8>> {
        Self::enhance_pdf_counted(data, config, options).map(|(bytes, _)| bytes)
    }

    #[instrument(skip_all, fields(bytes_len = data.len(), dpi = options.dpi))]
    fn enhance_pdf_counted(
        data: &[u8],
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<(Vec<u8>, usize)> {
        config.validate()?;
        options.validate()?;

        let pages = PdfPageSource::from_bytes(data)?.render_pages(options.dpi)?;
        let processed = process_pages_strict(&pages, config)?;

        let effective_dpi = options.dpi * config.upscale_factor;
        let output = PdfWriter::new().create_from_pages(&processed, effective_dpi)?;
        info!(pages = processed.len(), effective_dpi, "PDF enhanced");
        Ok((output, processed.len()))
    }

    /// Enhance a single image and re-encode it as `doc_type`.
    pub fn enhance_image(
        data: &[u8],
        doc_type: DocumentType,
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<Vec<u8>> {
        Self::convert_image(data, doc_type, doc_type, config, options)
    }

    /// Enhance an image read as `input_type` and encode it as `output_type`.
    #[instrument(skip_all, fields(bytes_len = data.len(), ?input_type, ?output_type))]
    pub fn convert_image(
        data: &[u8],
        input_type: DocumentType,
        output_type: DocumentType,
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<Vec<u8>> {
        if input_type == DocumentType::Pdf || output_type == DocumentType::Pdf {
            return Err(FlatscanError::UnsupportedDocument(
                "use enhance_pdf for PDF documents".into(),
            ));
        }
        options.validate()?;
        let pipeline = ScanPipeline::new(config)?;

        let page = ImageCodec::decode_as(data, input_type)?;
        let processed = pipeline.process(&page)?;
        ImageCodec::encode(&processed, output_type, options.quality)
    }

    /// Enhance the file at `input` and write the result to `output`, or to
    /// [`output_path_for`] next to the input. Returns the path written.
    pub fn enhance_path(
        input: &Path,
        output: Option<&Path>,
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<PathBuf> {
        Self::enhance_path_report(input, output, config, options).map(|report| report.output)
    }

    /// Like [`enhance_path`](Self::enhance_path) but returns a full report.
    #[instrument(skip(config, options), fields(input = %input.display()))]
    pub fn enhance_path_report(
        input: &Path,
        output: Option<&Path>,
        config: &PipelineConfig,
        options: &OutputOptions,
    ) -> Result<EnhanceReport> {
        let doc_type = DocumentType::from_path(input).ok_or_else(|| {
            FlatscanError::UnsupportedDocument(format!(
                "cannot tell the format of {} from its extension",
                input.display()
            ))
        })?;
        let output = output.map_or_else(|| output_path_for(input), Path::to_path_buf);
        let output_type = output_format(doc_type, &output)?;

        let data = std::fs::read(input)?;
        let (bytes, pages) = match doc_type {
            DocumentType::Pdf => Self::enhance_pdf_counted(&data, config, options)?,
            other => (
                Self::convert_image(&data, other, output_type, config, options)?,
                1,
            ),
        };
        std::fs::write(&output, &bytes)?;

        info!(output = %output.display(), pages, "Document written");
        Ok(EnhanceReport {
            input: input.to_path_buf(),
            output,
            document_type: doc_type,
            output_type,
            pages,
            config: *config,
            options: *options,
        })
    }
}

/// Format to write for `output`. Image outputs follow their extension; an
/// unrecognised extension keeps the input format. PDF and image formats
/// cannot be swapped for one another.
fn output_format(input_type: DocumentType, output: &Path) -> Result<DocumentType> {
    match DocumentType::from_path(output) {
        Some(output_type) if output_type == input_type => Ok(output_type),
        Some(output_type)
            if input_type == DocumentType::Pdf || output_type == DocumentType::Pdf =>
        {
            Err(FlatscanError::UnsupportedDocument(format!(
                "cannot write {input_type:?} input to {}",
                output.display()
            )))
        }
        Some(output_type) => Ok(output_type),
        None => {
            warn!(
                output = %output.display(),
                ?input_type,
                "Output extension not recognised, keeping the input format"
            );
            Ok(input_type)
        }
    }
}

/// Default output path: `<stem>_enhanced.<ext>` beside the input.
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    input.with_file_name(file_name)
}
