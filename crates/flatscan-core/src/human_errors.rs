// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every technical error is mapped to a plain sentence with a clear suggestion.
// Severity decides how the CLI frames the message.

use crate::error::FlatscanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The user supplied something we cannot use (bad option, bad file).
    InputProblem,
    /// The document itself cannot be processed by this tool.
    Permanent,
    /// Something went wrong on our side (disk, encoder).
    Internal,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `FlatscanError` into a `HumanError`.
pub fn humanize_error(err: &FlatscanError) -> HumanError {
    match err {
        FlatscanError::InvalidInput(detail) => HumanError {
            message: "The image is empty or damaged.".into(),
            suggestion: format!("Check that the file opens in an image viewer. ({detail})"),
            severity: Severity::InputProblem,
        },

        FlatscanError::ConfigurationOutOfRange {
            field, min, max, ..
        } => HumanError {
            message: format!("The value for {} is not allowed.", option_name(field)),
            suggestion: format!("Choose a value between {min} and {max}."),
            severity: Severity::InputProblem,
        },

        FlatscanError::UnsupportedDocument(detail) => HumanError {
            message: "This type of document isn't supported.".into(),
            suggestion: format!(
                "Use a scanned PDF or a PNG, JPEG, TIFF, or BMP image. ({detail})"
            ),
            severity: Severity::Permanent,
        },

        FlatscanError::PdfError(detail) => HumanError {
            message: "The PDF could not be read or written.".into(),
            suggestion: format!("The file may be damaged or password protected. ({detail})"),
            severity: Severity::Permanent,
        },

        FlatscanError::ImageError(detail) => HumanError {
            message: "The image could not be read or written.".into(),
            suggestion: format!("Try re-saving the image as PNG. ({detail})"),
            severity: Severity::Permanent,
        },

        FlatscanError::NoPages => HumanError {
            message: "The document has no pages.".into(),
            suggestion: "Check that you picked the right file.".into(),
            severity: Severity::InputProblem,
        },

        FlatscanError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => HumanError {
            message: "The file could not be found.".into(),
            suggestion: format!("Check the spelling of the path. ({io})"),
            severity: Severity::InputProblem,
        },

        FlatscanError::Io(io) => HumanError {
            message: "A file could not be read or written.".into(),
            suggestion: format!("Check the path and permissions. ({io})"),
            severity: Severity::Internal,
        },

        FlatscanError::Serialization(detail) => HumanError {
            message: "A settings or report file is malformed.".into(),
            suggestion: format!("Check the JSON syntax. ({detail})"),
            severity: Severity::Internal,
        },
    }
}

/// Map a configuration field to the CLI flag that sets it.
fn option_name(field: &str) -> &str {
    match field {
        "area_threshold_ratio" => "--area-threshold",
        "upscale_factor" => "--upscale",
        "quality" => "--quality",
        "dpi" => "--dpi",
        other => other,
    }
}
