// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end page pipeline scenarios on synthetic photographs.

use flatscan_core::{Channels, FlatscanError, PipelineConfig, RasterImage};
use flatscan_document::{DocumentDetector, RectifyOutcome, ScanPipeline, process_pages, rectify};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Corners of a `w`×`h` rectangle centred at (`cx`, `cy`) and rotated by
/// `degrees` clockwise (image coordinates, y down).
fn rotated_rect(cx: f64, cy: f64, w: f64, h: f64, degrees: f64) -> Vec<Point<i32>> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [(-w, -h), (w, -h), (w, h), (-w, h)]
        .iter()
        .map(|&(dx, dy)| {
            let (dx, dy) = (dx / 2.0, dy / 2.0);
            Point::new(
                (cx + dx * cos - dy * sin).round() as i32,
                (cy + dx * sin + dy * cos).round() as i32,
            )
        })
        .collect()
}

/// 1000×800 black background with an 800×600 white sheet (60% of the frame)
/// rotated by 15°.
fn photographed_sheet() -> RgbImage {
    let mut img = RgbImage::from_pixel(1000, 800, Rgb([0, 0, 0]));
    draw_polygon_mut(
        &mut img,
        &rotated_rect(500.0, 400.0, 800.0, 600.0, 15.0),
        Rgb([255, 255, 255]),
    );
    img
}

fn within(actual: u32, expected: u32, tolerance: f64) -> bool {
    (f64::from(actual) - f64::from(expected)).abs() <= f64::from(expected) * tolerance
}

#[test]
fn rotated_sheet_is_flattened_and_binarized() {
    let config = PipelineConfig::new(0.4, 2).unwrap();
    let pipeline = ScanPipeline::new(&config).unwrap();
    let page = RasterImage::from_rgb(photographed_sheet()).unwrap();

    let result = pipeline.process_detailed(&page).unwrap();

    let RectifyOutcome::Warped(quad) = result.outcome else {
        panic!("expected the sheet to be detected, got {:?}", result.outcome);
    };
    // Top-left corner of the rotated sheet sits near (191, 7).
    assert!((quad.top_left.x - 191.0).abs() < 6.0, "{quad:?}");
    assert!((quad.top_left.y - 7.0).abs() < 6.0, "{quad:?}");

    let (w, h) = result.image.dimensions();
    assert!(within(w, 1600, 0.02), "width {w}");
    assert!(within(h, 1200, 0.02), "height {h}");
    assert_eq!(result.image.channels(), Channels::Gray);
    assert!(result.image.is_binary());
}

#[test]
fn detector_finds_the_sheet_directly() {
    let quad = DocumentDetector::new(0.4)
        .detect(&photographed_sheet())
        .expect("sheet covers 60% of the frame");
    let area = quad.area();
    assert!(within(area as u32, 480_000, 0.03), "area {area}");
    assert!(quad.is_convex());
}

#[test]
fn all_black_page_passes_through_at_scaled_size() {
    let config = PipelineConfig::new(0.4, 2).unwrap();
    let black = RasterImage::from_rgb(RgbImage::from_pixel(300, 200, Rgb([0, 0, 0]))).unwrap();

    let result = ScanPipeline::new(&config)
        .unwrap()
        .process_detailed(&black)
        .unwrap();

    assert_eq!(result.outcome, RectifyOutcome::NoDocument);
    assert_eq!(result.image.dimensions(), (600, 400));
    assert!(result.image.is_binary());
}

#[test]
fn small_sheet_falls_back_to_full_page() {
    // 25% of the frame: below a 0.4 threshold, above 0.1.
    let mut img = RgbImage::from_pixel(400, 300, Rgb([0, 0, 0]));
    draw_polygon_mut(
        &mut img,
        &rotated_rect(200.0, 150.0, 200.0, 150.0, 0.0),
        Rgb([255, 255, 255]),
    );
    let page = RasterImage::from_rgb(img).unwrap();

    let strict = ScanPipeline::new(&PipelineConfig::new(0.4, 1).unwrap()).unwrap();
    let strict_result = strict.process_detailed(&page).unwrap();
    assert_eq!(strict_result.outcome, RectifyOutcome::NoDocument);
    assert_eq!(strict_result.image.dimensions(), (400, 300));

    let lenient = ScanPipeline::new(&PipelineConfig::new(0.1, 1).unwrap()).unwrap();
    let lenient_result = lenient.process_detailed(&page).unwrap();
    assert!(matches!(lenient_result.outcome, RectifyOutcome::Warped(_)));
    let (w, h) = lenient_result.image.dimensions();
    assert!(within(w, 200, 0.05) && within(h, 150, 0.05), "{w}x{h}");
}

#[test]
fn empty_buffer_is_rejected_before_processing() {
    let err = RasterImage::new(0, 0, Channels::Rgb, 0, Vec::new()).unwrap_err();
    assert!(matches!(err, FlatscanError::InvalidInput(_)));
}

#[test]
fn batch_preserves_page_order() {
    let pages: Vec<RasterImage> = [(40, 30), (50, 20), (30, 60)]
        .iter()
        .map(|&(w, h)| RasterImage::from_rgb(RgbImage::from_pixel(w, h, Rgb([10, 10, 10]))).unwrap())
        .collect();
    let config = PipelineConfig::new(0.4, 3).unwrap();

    let dims: Vec<(u32, u32)> = process_pages(&pages, &config)
        .into_iter()
        .map(|r| r.unwrap().dimensions())
        .collect();
    assert_eq!(dims, vec![(120, 90), (150, 60), (90, 180)]);
}

#[test]
fn textureless_page_is_returned_unchanged_by_the_rectifier() {
    let flat = RgbImage::from_pixel(120, 90, Rgb([0, 0, 0]));
    let quad = DocumentDetector::new(0.4).detect(&flat);
    assert!(quad.is_none());

    let rectified = rectify(&flat, quad.as_ref());
    assert!(rectified.is_pass_through());
    assert_eq!(*rectified.image, flat);
}
