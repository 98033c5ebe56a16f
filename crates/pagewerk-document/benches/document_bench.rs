// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the page preparation path in pagewerk-document:
// decoding, normalization and binarization of a synthetic scan.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{GrayImage, Luma, RgbaImage};

use pagewerk_core::Raster;
use pagewerk_document::image::{decode, normalize_page};
use pagewerk_document::scan::otsu_binarize;

/// A 400x300 light page with dark "text" bars, PNG encoded.
fn synthetic_scan_png() -> Vec<u8> {
    let (width, height) = (400u32, 300u32);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let on_bar = (y / 12) % 2 == 1 && (20..380).contains(&x) && (x / 40) % 3 != 2;
        if on_bar {
            image::Rgba([25, 25, 25, 255])
        } else {
            image::Rgba([235, 232, 228, 200])
        }
    });
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode synthetic scan");
    out
}

fn bench_decode_and_normalize(c: &mut Criterion) {
    let png = synthetic_scan_png();
    c.bench_function("decode + normalize (400x300 RGBA)", |b| {
        b.iter(|| {
            let raster = decode(black_box(&png)).expect("decode");
            black_box(normalize_page(raster, 300).expect("normalize"));
        });
    });
}

fn bench_binarize(c: &mut Criterion) {
    let gray = GrayImage::from_fn(400, 300, |x, y| {
        if (y / 10) % 2 == 0 && x % 50 < 35 {
            Luma([30u8])
        } else {
            Luma([220u8])
        }
    });
    let mut raster = Raster::new(400, 300, 8, 1).expect("raster");
    for (x, y, px) in gray.enumerate_pixels() {
        raster.set_sample(x, y, px.0[0]);
    }

    c.bench_function("otsu_binarize (400x300 gray)", |b| {
        b.iter(|| black_box(otsu_binarize(black_box(&raster)).expect("binarize")));
    });
}

criterion_group!(benches, bench_decode_and_normalize, bench_binarize);
criterion_main!(benches);
