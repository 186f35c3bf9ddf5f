// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan: straighten and binarize a scanned PDF or photographed page.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::human_errors::{Severity, humanize_error};
use flatscan_core::{OutputOptions, PipelineConfig};
use flatscan_document::{DocumentEnhancer, EnhanceReport};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "flatscan")]
#[command(version, about = "Detect, flatten, and binarize scanned documents for printing")]
struct Cli {
    /// PDF or image file to enhance (PDF, PNG, JPEG, TIFF, BMP)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the result; an image extension selects the output
    /// format [default: <INPUT stem>_enhanced.<ext>]
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Fraction of the page a document outline must exceed (0.1-1.0)
    #[arg(long, default_value_t = 0.4)]
    area_threshold: f64,

    /// Integer upscale factor applied before binarization (1-5)
    #[arg(long, default_value_t = 2)]
    upscale: u32,

    /// JPEG quality for lossy output (1-100)
    #[arg(long, default_value_t = 95)]
    quality: u8,

    /// Resolution at which PDF pages are rasterised (72-600)
    #[arg(long, default_value_t = 200)]
    dpi: u32,

    /// Print a JSON summary of the run to stdout
    #[arg(long)]
    report: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            if cli.report {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(err) => return fail(&FlatscanError::from(err)),
                }
            } else {
                eprintln!("Wrote {}", report.output.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err),
    }
}

/// Logs go to stderr so `--report` output stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<EnhanceReport> {
    let config = PipelineConfig::new(cli.area_threshold, cli.upscale)?;
    let options = OutputOptions::new(cli.quality, cli.dpi)?;
    debug!(?config, ?options, "Configuration validated");

    if !cli.input.is_file() {
        return Err(FlatscanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", cli.input.display()),
        )));
    }

    info!(input = %cli.input.display(), "Enhancing document");
    DocumentEnhancer::enhance_path_report(&cli.input, cli.output.as_deref(), &config, &options)
}

fn fail(err: &FlatscanError) -> ExitCode {
    let human = humanize_error(err);
    let label = match human.severity {
        Severity::InputProblem => "error",
        Severity::Permanent => "cannot process",
        Severity::Internal => "internal error",
    };
    eprintln!("{label}: {}", human.message);
    eprintln!("  {}", human.suggestion);
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatscan_core::DocumentType;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["flatscan", "scan.pdf"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("scan.pdf"));
        assert_eq!(cli.output, None);
        assert_eq!(cli.area_threshold, PipelineConfig::default().area_threshold_ratio);
        assert_eq!(cli.upscale, PipelineConfig::default().upscale_factor);
        assert_eq!(cli.quality, OutputOptions::default().quality);
        assert_eq!(cli.dpi, OutputOptions::default().dpi);
        assert!(!cli.report);
    }

    #[test]
    fn all_options_parse() {
        let cli = Cli::try_parse_from([
            "flatscan",
            "photo.jpg",
            "-o",
            "out.jpg",
            "--area-threshold",
            "0.25",
            "--upscale",
            "3",
            "--quality",
            "80",
            "--dpi",
            "300",
            "--report",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.jpg")));
        assert_eq!(cli.area_threshold, 0.25);
        assert_eq!(cli.upscale, 3);
        assert_eq!(cli.quality, 80);
        assert_eq!(cli.dpi, 300);
        assert!(cli.report && cli.verbose);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["flatscan"]).is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        for args in [
            ["flatscan", "a.png", "--upscale", "6"],
            ["flatscan", "a.png", "--area-threshold", "0.05"],
            ["flatscan", "a.png", "--quality", "0"],
            ["flatscan", "a.png", "--dpi", "50"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            let err = run(&cli).unwrap_err();
            assert!(
                matches!(err, FlatscanError::ConfigurationOutOfRange { .. }),
                "{args:?}: {err:?}"
            );
        }
    }

    #[test]
    fn missing_input_is_reported() {
        let cli = Cli::try_parse_from(["flatscan", "/definitely/not/here.png"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(matches!(err, FlatscanError::Io(_)));
        assert_eq!(humanize_error(&err).severity, Severity::InputProblem);
    }

    #[test]
    fn run_writes_the_default_output() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("page.png");
        RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]))
            .save(&input)
            .unwrap();

        let cli = Cli::try_parse_from(["flatscan", input.to_str().unwrap(), "--upscale", "1"])
            .unwrap();
        let report = run(&cli).unwrap();

        assert_eq!(report.output, dir.path().join("page_enhanced.png"));
        assert_eq!(report.document_type, DocumentType::Png);
        assert!(report.output.is_file());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pages"], 1);
        assert_eq!(json["config"]["upscale_factor"], 1);
    }
}
