// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Global Otsu binarization producing the 1-bit raster the engine recognizes
// from.

use imageproc::contrast::otsu_level;
use pagewerk_core::error::Result;
use pagewerk_core::raster::Raster;
use tracing::{debug, instrument};

use crate::image::codec::to_gray_image;

/// Binarize `raster` with an Otsu threshold. Dark pixels become set bits
/// (black); resolution is carried over.
#[instrument(skip(raster), fields(width = raster.width(), height = raster.height()))]
pub fn otsu_binarize(raster: &Raster) -> Result<Raster> {
    let gray = to_gray_image(raster);
    let level = otsu_level(&gray);
    debug!(level, "Otsu threshold computed");

    let mut out = Raster::new(raster.width(), raster.height(), 1, 1)?;
    let (x_res, y_res) = raster.resolution();
    out.set_resolution(x_res, y_res);
    for (x, y, px) in gray.enumerate_pixels() {
        if px.0[0] <= level {
            out.set_sample(x, y, 1);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_text_on_light_page() {
        let mut raster = Raster::new(20, 10, 8, 1).expect("raster");
        for y in 0..10 {
            for x in 0..20 {
                let v = if (5..15).contains(&x) && (3..7).contains(&y) { 20 } else { 230 };
                raster.set_sample(x, y, v);
            }
        }
        raster.set_resolution(300, 300);

        let binary = otsu_binarize(&raster).expect("binarize");
        assert_eq!(binary.depth(), 1);
        assert_eq!(binary.resolution(), (300, 300));
        assert_eq!(binary.sample(10, 5), 1);
        assert_eq!(binary.sample(0, 0), 0);
        assert_eq!(binary.stride(), 4);
    }
}
