// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Flatscan core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod raster;
pub mod types;

pub use config::{BinarizationParams, OutputOptions, PipelineConfig};
pub use error::FlatscanError;
pub use raster::{Channels, RasterImage};
pub use types::*;
