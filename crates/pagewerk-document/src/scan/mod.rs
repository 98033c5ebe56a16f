// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: binarization, text exports from recognised words, and
// the optical character recognition (OCR) engine backend.

pub mod export;
pub mod threshold;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use export::PageLayout;
pub use threshold::otsu_binarize;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrsBackend};
