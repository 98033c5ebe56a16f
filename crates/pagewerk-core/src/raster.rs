// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine-facing pixel buffer.
//
// Rows are padded to a multiple of four bytes. Depths 1, 2 and 4 are packed
// MSB-first; a 1-bit pixel set to 1 is black. Depth 32 stores R, G, B, A per
// pixel; with three samples per pixel the fourth byte is ignored.

use crate::error::{PagewerkError, Result};

/// Depths a raster may carry.
pub const SUPPORTED_DEPTHS: [u8; 5] = [1, 2, 4, 8, 32];

/// Decoded image handed to the engine and to page renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    depth: u8,
    samples_per_pixel: u8,
    stride: usize,
    x_res: u32,
    y_res: u32,
    colormap: Option<Vec<[u8; 3]>>,
    data: Vec<u8>,
}

impl Raster {
    /// Bytes per row for the given width and depth, padded to 32 bits.
    pub fn stride_for(width: u32, depth: u8) -> usize {
        (width as usize * depth as usize).div_ceil(32) * 4
    }

    /// Allocate a zeroed raster.
    pub fn new(width: u32, height: u32, depth: u8, samples_per_pixel: u8) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PagewerkError::ImageError(format!(
                "raster dimensions must be positive; got {width}x{height}"
            )));
        }
        if !SUPPORTED_DEPTHS.contains(&depth) {
            return Err(PagewerkError::ImageError(format!(
                "unsupported raster depth {depth}"
            )));
        }
        let spp_ok = match depth {
            32 => samples_per_pixel == 3 || samples_per_pixel == 4,
            _ => samples_per_pixel == 1,
        };
        if !spp_ok {
            return Err(PagewerkError::ImageError(format!(
                "{samples_per_pixel} samples per pixel is invalid at depth {depth}"
            )));
        }

        let stride = Self::stride_for(width, depth);
        Ok(Self {
            width,
            height,
            depth,
            samples_per_pixel,
            stride,
            x_res: 0,
            y_res: 0,
            colormap: None,
            data: vec![0; stride * height as usize],
        })
    }

    /// Build a raster from caller-supplied pixels laid out `bytes_per_line`
    /// apart.
    ///
    /// `bytes_per_pixel` follows the usual engine convention: 0 for packed
    /// 1-bit, 1 for 8-bit gray, 3 for RGB and 4 for RGBA.
    pub fn from_raw_pixels(
        pixels: &[u8],
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        bytes_per_line: u32,
    ) -> Result<Self> {
        let (depth, spp) = match bytes_per_pixel {
            0 => (1, 1),
            1 => (8, 1),
            3 => (32, 3),
            4 => (32, 4),
            other => {
                return Err(PagewerkError::ImageError(format!(
                    "unsupported bytes per pixel {other}"
                )));
            }
        };

        let min_line = Self::min_bytes_per_line(width, bytes_per_pixel);
        let bytes_per_line = bytes_per_line as usize;
        if bytes_per_line < min_line {
            return Err(PagewerkError::ImageError(format!(
                "bytes per line {bytes_per_line} is smaller than the {min_line} bytes a row needs"
            )));
        }
        let needed = bytes_per_line * (height as usize - 1) + min_line;
        if pixels.len() < needed {
            return Err(PagewerkError::ImageError(format!(
                "pixel buffer holds {} bytes but {needed} are required",
                pixels.len()
            )));
        }

        let mut raster = Self::new(width, height, depth, spp)?;
        for y in 0..height as usize {
            let src = &pixels[y * bytes_per_line..y * bytes_per_line + min_line];
            let dst = raster.row_mut(y as u32);
            match bytes_per_pixel {
                0 | 1 => dst[..min_line].copy_from_slice(src),
                _ => {
                    let bpp = bytes_per_pixel as usize;
                    for (x, px) in src.chunks_exact(bpp).enumerate() {
                        let out = &mut dst[x * 4..x * 4 + 4];
                        out[..3].copy_from_slice(&px[..3]);
                        out[3] = if bpp == 4 { px[3] } else { 255 };
                    }
                }
            }
        }
        Ok(raster)
    }

    /// Smallest valid `bytes_per_line` for a row of `width` pixels.
    pub fn min_bytes_per_line(width: u32, bytes_per_pixel: u32) -> usize {
        match bytes_per_pixel {
            0 => (width as usize).div_ceil(8),
            n => width as usize * n as usize,
        }
    }

    // -- Properties -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn samples_per_pixel(&self) -> u8 {
        self.samples_per_pixel
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn has_alpha(&self) -> bool {
        self.samples_per_pixel == 4
    }

    pub fn colormap(&self) -> Option<&[[u8; 3]]> {
        self.colormap.as_deref()
    }

    /// Horizontal and vertical resolution in pixels per inch; 0 means unknown.
    pub fn resolution(&self) -> (u32, u32) {
        (self.x_res, self.y_res)
    }

    pub fn set_resolution(&mut self, x_res: u32, y_res: u32) {
        self.x_res = x_res;
        self.y_res = y_res;
    }

    /// Attach a palette. Only valid for depths of 8 bits or less.
    pub fn set_colormap(&mut self, colormap: Vec<[u8; 3]>) -> Result<()> {
        if self.depth > 8 {
            return Err(PagewerkError::ImageError(
                "colormaps require a depth of 8 bits or less".into(),
            ));
        }
        if colormap.is_empty() || colormap.len() > 1usize << self.depth {
            return Err(PagewerkError::ImageError(format!(
                "colormap of {} entries does not fit depth {}",
                colormap.len(),
                self.depth
            )));
        }
        self.colormap = Some(colormap);
        Ok(())
    }

    pub fn take_colormap(&mut self) -> Option<Vec<[u8; 3]>> {
        self.colormap.take()
    }

    // -- Pixel access ---------------------------------------------------------

    /// Raw stride-aligned bytes, padding included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        &mut self.data[start..start + self.stride]
    }

    /// Packed sample value at `(x, y)` for depths of 8 bits or less.
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        let row = self.row(y);
        match self.depth {
            8 => row[x as usize],
            d @ (1 | 2 | 4) => {
                let bit = x as usize * d as usize;
                let shift = 8 - d as usize - bit % 8;
                (row[bit / 8] >> shift) & ((1u8 << d) - 1)
            }
            _ => 0,
        }
    }

    /// Set a packed sample for depths of 8 bits or less.
    pub fn set_sample(&mut self, x: u32, y: u32, value: u8) {
        let depth = self.depth;
        let row = self.row_mut(y);
        match depth {
            8 => row[x as usize] = value,
            d @ (1 | 2 | 4) => {
                let bit = x as usize * d as usize;
                let shift = 8 - d as usize - bit % 8;
                let mask = ((1u8 << d) - 1) << shift;
                row[bit / 8] = (row[bit / 8] & !mask) | ((value << shift) & mask);
            }
            _ => {}
        }
    }

    /// Colour of the pixel at `(x, y)` as RGBA, resolving palettes and
    /// expanding low depths. Pixels without alpha are opaque.
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        if self.depth == 32 {
            let px = &self.row(y)[x as usize * 4..x as usize * 4 + 4];
            let alpha = if self.has_alpha() { px[3] } else { 255 };
            return [px[0], px[1], px[2], alpha];
        }

        let value = self.sample(x, y);
        if let Some(cmap) = &self.colormap {
            let [r, g, b] = cmap.get(value as usize).copied().unwrap_or([0, 0, 0]);
            return [r, g, b, 255];
        }
        let gray = expand_gray(value, self.depth);
        [gray, gray, gray, 255]
    }

    /// Write an RGBA colour at `(x, y)` on a 32-bit raster.
    pub fn set_rgba(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if self.depth != 32 {
            return;
        }
        let start = x as usize * 4;
        self.row_mut(y)[start..start + 4].copy_from_slice(&rgba);
    }
}

/// Map a gray sample of the given depth onto 0..=255.
///
/// 1-bit follows the "1 is black" convention.
pub fn expand_gray(value: u8, depth: u8) -> u8 {
    match depth {
        1 => {
            if value == 0 {
                255
            } else {
                0
            }
        }
        2 => value * 85,
        4 => value * 17,
        _ => value,
    }
}
