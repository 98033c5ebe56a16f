// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalization applied before a page is handed to the engine and the
// renderer: palettes are expanded, alpha is flattened onto white, sub-byte
// depths are widened to 8 bits and a missing resolution gets a default.

use pagewerk_core::error::Result;
use pagewerk_core::raster::{Raster, expand_gray};
use tracing::{debug, instrument};

/// Run every normalization step in order.
#[instrument(skip(raster), fields(
    width = raster.width(),
    height = raster.height(),
    depth = raster.depth(),
))]
pub fn normalize_page(raster: Raster, default_resolution: u32) -> Result<Raster> {
    let raster = remove_colormap(raster)?;
    let raster = remove_alpha(raster)?;
    let raster = widen_to_8_bits(raster)?;
    let raster = ensure_resolution(raster, default_resolution);
    debug!(
        depth = raster.depth(),
        spp = raster.samples_per_pixel(),
        resolution = ?raster.resolution(),
        "Page normalized"
    );
    Ok(raster)
}

/// Replace a palette with the colours it indexes.
///
/// All-gray palettes produce an 8-bit gray raster, anything else 32-bit RGB.
pub fn remove_colormap(mut raster: Raster) -> Result<Raster> {
    let Some(cmap) = raster.take_colormap() else {
        return Ok(raster);
    };
    let gray = cmap.iter().all(|[r, g, b]| r == g && g == b);
    let (width, height) = (raster.width(), raster.height());

    let mut out = if gray {
        Raster::new(width, height, 8, 1)?
    } else {
        Raster::new(width, height, 32, 3)?
    };
    out.set_resolution(raster.resolution().0, raster.resolution().1);

    for y in 0..height {
        for x in 0..width {
            let [r, g, b] = cmap
                .get(raster.sample(x, y) as usize)
                .copied()
                .unwrap_or([0, 0, 0]);
            if gray {
                out.set_sample(x, y, r);
            } else {
                out.set_rgba(x, y, [r, g, b, 255]);
            }
        }
    }
    debug!(entries = cmap.len(), gray, "Colormap removed");
    Ok(out)
}

/// Composite a four-sample raster over a white background.
pub fn remove_alpha(raster: Raster) -> Result<Raster> {
    if !raster.has_alpha() {
        return Ok(raster);
    }
    let (width, height) = (raster.width(), raster.height());
    let mut out = Raster::new(width, height, 32, 3)?;
    out.set_resolution(raster.resolution().0, raster.resolution().1);

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = raster.rgba(x, y);
            let blend = |c: u8| -> u8 {
                let a = a as u32;
                ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8
            };
            out.set_rgba(x, y, [blend(r), blend(g), blend(b), 255]);
        }
    }
    Ok(out)
}

/// Widen 1, 2 and 4-bit gray rasters to 8 bits.
pub fn widen_to_8_bits(raster: Raster) -> Result<Raster> {
    let depth = raster.depth();
    if depth >= 8 {
        return Ok(raster);
    }
    let (width, height) = (raster.width(), raster.height());
    let mut out = Raster::new(width, height, 8, 1)?;
    out.set_resolution(raster.resolution().0, raster.resolution().1);

    for y in 0..height {
        for x in 0..width {
            out.set_sample(x, y, expand_gray(raster.sample(x, y), depth));
        }
    }
    Ok(out)
}

/// Fill in `default_resolution` on either axis that is unknown.
pub fn ensure_resolution(mut raster: Raster, default_resolution: u32) -> Raster {
    let (x_res, y_res) = raster.resolution();
    if x_res == 0 || y_res == 0 {
        let x = if x_res == 0 { default_resolution } else { x_res };
        let y = if y_res == 0 { default_resolution } else { y_res };
        raster.set_resolution(x, y);
    }
    raster
}
