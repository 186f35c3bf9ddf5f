// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster buffer exchanged between the decoder, the page pipeline, and the
// encoder. Width, height, channel count, and row stride are explicit so that
// every stage boundary can check what it receives.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{FlatscanError, Result};

/// Number of interleaved 8-bit samples per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channels {
    Gray = 1,
    Rgb = 3,
}

impl Channels {
    pub const fn count(self) -> usize {
        self as usize
    }
}

/// An 8-bit raster image with an explicit row stride.
///
/// Pipeline stages never mutate a `RasterImage` they were given; each returns
/// a freshly allocated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    channels: Channels,
    stride: usize,
    data: Vec<u8>,
}

impl RasterImage {
    /// Wrap a raw buffer, rejecting empty or inconsistent layouts.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FlatscanError::InvalidInput(format!(
                "zero-dimension image ({width}x{height})"
            )));
        }
        let row_bytes = (width as usize)
            .checked_mul(channels.count())
            .ok_or_else(|| FlatscanError::InvalidInput(format!("row of {width} pixels overflows")))?;
        if stride < row_bytes {
            return Err(FlatscanError::InvalidInput(format!(
                "stride {stride} is shorter than a row of {row_bytes} bytes"
            )));
        }
        let required = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(row_bytes))
            .ok_or_else(|| {
                FlatscanError::InvalidInput(format!(
                    "stride {stride} over {height} rows overflows the address space"
                ))
            })?;
        if data.len() < required {
            return Err(FlatscanError::InvalidInput(format!(
                "buffer holds {} bytes, layout needs {required}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            stride,
            data,
        })
    }

    /// Take ownership of a tightly packed RGB image.
    pub fn from_rgb(image: RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(
            width,
            height,
            Channels::Rgb,
            width as usize * 3,
            image.into_raw(),
        )
    }

    /// Take ownership of a tightly packed grayscale image.
    pub fn from_gray(image: GrayImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::new(
            width,
            height,
            Channels::Gray,
            width as usize,
            image.into_raw(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Samples of the pixel at (x, y). Panics when out of bounds, like
    /// `image::ImageBuffer::get_pixel`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        let n = self.channels.count();
        let start = y as usize * self.stride + x as usize * n;
        &self.data[start..start + n]
    }

    /// Iterate over rows, each trimmed to `width * channels` bytes.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.width as usize * self.channels.count();
        (0..self.height as usize).map(move |y| {
            let start = y * self.stride;
            &self.data[start..start + row_bytes]
        })
    }

    /// True when the image is single-channel and every sample is 0 or 255.
    pub fn is_binary(&self) -> bool {
        self.channels == Channels::Gray
            && self
                .rows()
                .all(|row| row.iter().all(|&v| v == 0 || v == 255))
    }

    /// Copy into a tightly packed `RgbImage`. Fails on grayscale input.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        self.expect_channels(Channels::Rgb)?;
        let packed: Vec<u8> = self.rows().flatten().copied().collect();
        RgbImage::from_raw(self.width, self.height, packed).ok_or_else(|| {
            FlatscanError::InvalidInput("RGB buffer does not match its dimensions".into())
        })
    }

    /// Copy into a tightly packed `GrayImage`. Fails on colour input.
    pub fn to_gray_image(&self) -> Result<GrayImage> {
        self.expect_channels(Channels::Gray)?;
        let packed: Vec<u8> = self.rows().flatten().copied().collect();
        GrayImage::from_raw(self.width, self.height, packed).ok_or_else(|| {
            FlatscanError::InvalidInput("grayscale buffer does not match its dimensions".into())
        })
    }

    /// Check the channel count at a stage boundary.
    pub fn expect_channels(&self, expected: Channels) -> Result<()> {
        if self.channels != expected {
            return Err(FlatscanError::InvalidInput(format!(
                "expected {} channel(s), got {}",
                expected.count(),
                self.channels.count()
            )));
        }
        Ok(())
    }
}
