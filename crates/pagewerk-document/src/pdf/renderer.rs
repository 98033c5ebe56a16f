// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Searchable PDF renderer for process-pages sessions, built on `printpdf` 0.8.
//
// Each page is sized from the raster's pixel dimensions and resolution. The
// page image is drawn full-bleed and every recognised word is laid over it as
// invisible text at its bounding box, so the output is searchable and
// selectable. In text-only mode the image is omitted and the words are drawn
// visibly instead.

use std::path::{Path, PathBuf};

use pagewerk_core::engine::{PageRenderer, RenderedPage};
use pagewerk_core::error::{PagewerkError, Result};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, TextRenderingMode, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::image::codec::to_rgb_image;

const PT_PER_INCH: f32 = 72.0;
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Multi-page PDF sink writing `<output_base>.pdf` when the document ends.
pub struct PdfRenderer {
    output_base: PathBuf,
    text_only: bool,
    doc: Option<PdfDocument>,
    pages: Vec<PdfPage>,
    healthy: bool,
    written: Option<PathBuf>,
}

impl PdfRenderer {
    pub fn new(output_base: impl Into<PathBuf>, text_only: bool) -> Self {
        Self {
            output_base: output_base.into(),
            text_only,
            doc: None,
            pages: Vec::new(),
            healthy: true,
            written: None,
        }
    }

    /// Path the document is (or will be) written to.
    pub fn output_path(&self) -> PathBuf {
        let mut path = self.output_base.clone().into_os_string();
        path.push(".pdf");
        PathBuf::from(path)
    }

    /// Set once `end_document` has persisted the file.
    pub fn written_path(&self) -> Option<&Path> {
        self.written.as_deref()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    // -- Page construction ----------------------------------------------------

    fn build_page(&mut self, page: &RenderedPage<'_>) -> Result<PdfPage> {
        let image = page.image;
        let (x_res, y_res) = image.resolution();
        if x_res == 0 || y_res == 0 {
            return Err(PagewerkError::PdfError(format!(
                "page {} has no resolution",
                page.index
            )));
        }

        let page_w_pt = image.width() as f32 * PT_PER_INCH / x_res as f32;
        let page_h_pt = image.height() as f32 * PT_PER_INCH / y_res as f32;
        let px_to_pt_x = PT_PER_INCH / x_res as f32;
        let px_to_pt_y = PT_PER_INCH / y_res as f32;

        let mut ops: Vec<Op> = Vec::new();

        if !self.text_only {
            let doc = self
                .doc
                .as_mut()
                .ok_or_else(|| PagewerkError::PdfError("document was not begun".into()))?;
            let rgb = to_rgb_image(image);
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: image.width() as usize,
                height: image.height() as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);
            ops.push(Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(1.0),
                    scale_y: Some(1.0),
                    dpi: Some(x_res as f32),
                    rotate: None,
                },
            });
        }

        let mode = if self.text_only {
            TextRenderingMode::Fill
        } else {
            TextRenderingMode::Invisible
        };

        for word in page.words.iter().filter(|w| !w.text.trim().is_empty()) {
            let font_size = (word.bbox.height().max(1) as f32 * px_to_pt_y).max(1.0);
            let x = word.bbox.left as f32 * px_to_pt_x;
            let y = page_h_pt - word.bbox.bottom as f32 * px_to_pt_y;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextRenderingMode { mode });
            ops.push(Op::SetTextCursor {
                pos: Point { x: Pt(x), y: Pt(y) },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(font_size),
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(word.text.clone())],
                font: BuiltinFont::Helvetica,
            });
            ops.push(Op::EndTextSection);
        }

        debug!(
            index = page.index,
            words = page.words.len(),
            page_w_pt,
            page_h_pt,
            "PDF page built"
        );
        Ok(PdfPage::new(
            Mm(page_w_pt * MM_PER_PT),
            Mm(page_h_pt * MM_PER_PT),
            ops,
        ))
    }

    fn write_document(&mut self) -> Result<PathBuf> {
        let mut doc = self
            .doc
            .take()
            .ok_or_else(|| PagewerkError::PdfError("document was not begun".into()))?;
        let pages = std::mem::take(&mut self.pages);
        let page_count = pages.len();
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        let path = self.output_path();
        std::fs::write(&path, &bytes)?;
        info!(path = %path.display(), page_count, bytes = bytes.len(), "Wrote PDF");
        Ok(path)
    }
}

impl PageRenderer for PdfRenderer {
    fn is_healthy(&self) -> bool {
        self.healthy
    }

    #[instrument(skip(self), fields(output_base = %self.output_base.display()))]
    fn begin_document(&mut self, title: &str) -> bool {
        if !self.healthy || self.doc.is_some() {
            return false;
        }
        self.doc = Some(PdfDocument::new(title));
        self.pages.clear();
        true
    }

    fn add_page(&mut self, page: &RenderedPage<'_>) -> bool {
        if !self.healthy || self.doc.is_none() {
            return false;
        }
        match self.build_page(page) {
            Ok(pdf_page) => {
                self.pages.push(pdf_page);
                true
            }
            Err(err) => {
                warn!(index = page.index, error = %err, "PDF page rejected");
                false
            }
        }
    }

    fn end_document(&mut self) -> bool {
        if !self.healthy || self.doc.is_none() {
            return false;
        }
        match self.write_document() {
            Ok(path) => {
                self.written = Some(path);
                true
            }
            Err(err) => {
                warn!(error = %err, "PDF could not be written");
                self.healthy = false;
                false
            }
        }
    }

    fn extension(&self) -> &str {
        "pdf"
    }
}
