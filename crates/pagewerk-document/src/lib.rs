// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagewerk-document: image and document handling for the Pagewerk worker.
//
// Decodes encoded images into engine rasters and normalizes pages, renders
// searchable multi-page PDFs, exports recognised words as text formats, and
// (behind the `ocr` feature) provides an `ocrs`-backed OCR engine.

pub mod image;
pub mod pdf;
pub mod scan;

pub use pdf::PdfRenderer;
pub use scan::PageLayout;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrsBackend;
