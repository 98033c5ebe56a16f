// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoding encoded images into engine rasters and converting rasters back into
// `image` buffers. Uses the `image` crate for every container format it
// supports (PNG, JPEG, TIFF, BMP, GIF, WebP, ...).

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::raster::Raster;
use tracing::{debug, instrument};

/// Decode an encoded image into a raster.
///
/// Gray images become 8-bit single-sample rasters; colour images become
/// 32-bit rasters with three samples, or four when the source has alpha.
/// Resolution is left unknown.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<Raster> {
    if data.is_empty() {
        return Err(PagewerkError::ImageError("image buffer is empty".into()));
    }
    let img = image::load_from_memory(data)
        .map_err(|err| PagewerkError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "Image decoded from bytes"
    );
    from_dynamic(&img)
}

/// Convert an already-decoded image.
pub fn from_dynamic(img: &DynamicImage) -> Result<Raster> {
    let (width, height) = (img.width(), img.height());

    match img {
        DynamicImage::ImageLuma8(gray) => {
            let mut raster = Raster::new(width, height, 8, 1)?;
            for (y, row) in gray.rows().enumerate() {
                let dst = raster.row_mut(y as u32);
                for (x, px) in row.enumerate() {
                    dst[x] = px.0[0];
                }
            }
            Ok(raster)
        }
        DynamicImage::ImageLuma16(_) => from_dynamic(&DynamicImage::ImageLuma8(img.to_luma8())),
        other if other.color().has_alpha() => {
            let rgba = other.to_rgba8();
            let mut raster = Raster::new(width, height, 32, 4)?;
            for (x, y, px) in rgba.enumerate_pixels() {
                raster.set_rgba(x, y, px.0);
            }
            Ok(raster)
        }
        other => {
            let rgb = other.to_rgb8();
            let mut raster = Raster::new(width, height, 32, 3)?;
            for (x, y, px) in rgb.enumerate_pixels() {
                let [r, g, b] = px.0;
                raster.set_rgba(x, y, [r, g, b, 255]);
            }
            Ok(raster)
        }
    }
}

/// Flatten a raster into a tightly packed RGB image. Alpha is ignored.
pub fn to_rgb_image(raster: &Raster) -> RgbImage {
    RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, _] = raster.rgba(x, y);
        image::Rgb([r, g, b])
    })
}

/// Luminance view of a raster (ITU-R 601 weights).
pub fn to_gray_image(raster: &Raster) -> GrayImage {
    GrayImage::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, _] = raster.rgba(x, y);
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        image::Luma([luma as u8])
    })
}

/// Encode a raster as PNG.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>> {
    let img = if raster.has_alpha() {
        let rgba = image::RgbaImage::from_fn(raster.width(), raster.height(), |x, y| {
            image::Rgba(raster.rgba(x, y))
        });
        DynamicImage::ImageRgba8(rgba)
    } else if raster.depth() <= 8 && raster.colormap().is_none() {
        DynamicImage::ImageLuma8(to_gray_image(raster))
    } else {
        DynamicImage::ImageRgb8(to_rgb_image(raster))
    };

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|err| PagewerkError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).expect("encode");
        buf.into_inner()
    }

    #[test]
    fn decode_gray_png() {
        let gray = GrayImage::from_fn(5, 3, |x, _| Luma([(x * 50) as u8]));
        let raster = decode(&png_bytes(DynamicImage::ImageLuma8(gray))).expect("decode");
        assert_eq!((raster.width(), raster.height()), (5, 3));
        assert_eq!(raster.depth(), 8);
        assert_eq!(raster.stride(), 8);
        assert_eq!(raster.sample(4, 2), 200);
        assert_eq!(raster.resolution(), (0, 0));
    }

    #[test]
    fn decode_rgba_keeps_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 128]));
        let raster = decode(&png_bytes(DynamicImage::ImageRgba8(rgba))).expect("decode");
        assert_eq!(raster.depth(), 32);
        assert!(raster.has_alpha());
        assert_eq!(raster.rgba(1, 1), [10, 20, 30, 128]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(&[]).is_err());
        assert!(decode(b"definitely not an image").is_err());
    }

    #[test]
    fn png_encoding_preserves_pixels() {
        let mut raster = Raster::new(3, 2, 32, 3).expect("raster");
        raster.set_rgba(2, 1, [200, 100, 50, 255]);
        let decoded = decode(&encode_png(&raster).expect("png")).expect("decode");
        assert_eq!(decoded.rgba(2, 1), [200, 100, 50, 255]);
        assert_eq!(decoded.rgba(0, 0), [0, 0, 0, 255]);
    }
}
