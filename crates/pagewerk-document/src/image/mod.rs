// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding to rasters, raster conversions and page
// normalization.

pub mod codec;
pub mod normalize;

pub use codec::{decode, encode_png, to_gray_image, to_rgb_image};
pub use normalize::normalize_page;
