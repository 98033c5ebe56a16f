// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine and renderer boundaries.
//
// The worker drives an `OcrEngine` and, during a process-pages session, a
// `PageRenderer` created by that engine. Neither trait requires `Send`: the
// worker builds its engine on its own thread and never hands it out.
//
// Methods returning `bool` report engine success; methods returning `Option`
// use `None` for "the engine produced nothing". The worker turns both into
// command errors that name the operation.

use std::path::PathBuf;

use crate::progress::ProgressMonitor;
use crate::raster::Raster;
use crate::types::{
    EngineMode, OrientationScript, PageSegMode, Rectangle, RecognizedWord, TextFormat,
};

/// Validated parameters for [`OcrEngine::init`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInit {
    pub data_path: Option<PathBuf>,
    /// Languages joined with `+`, e.g. `"eng+deu"`. Empty lets the engine pick.
    pub language: String,
    pub mode: EngineMode,
    pub configs: Vec<String>,
    pub variables: Vec<(String, String)>,
    pub set_only_non_debug_params: bool,
}

/// One page handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub struct RenderedPage<'a> {
    pub index: u32,
    pub image: &'a Raster,
    pub words: &'a [RecognizedWord],
    pub filename: Option<&'a str>,
}

/// Multi-page document sink used by process-pages sessions.
pub trait PageRenderer {
    /// `false` once the renderer hit an unrecoverable error.
    fn is_healthy(&self) -> bool;

    fn begin_document(&mut self, title: &str) -> bool;

    fn add_page(&mut self, page: &RenderedPage<'_>) -> bool;

    /// Finalize and persist the document.
    fn end_document(&mut self) -> bool;

    /// Extension appended to the output base, without the dot.
    fn extension(&self) -> &str {
        "pdf"
    }
}

/// A page submitted to [`OcrEngine::process_page`].
#[derive(Debug)]
pub struct PageRequest<'a> {
    pub image: Raster,
    pub index: u32,
    pub filename: Option<&'a str>,
    /// Milliseconds; 0 means no limit.
    pub timeout_ms: u32,
    pub monitor: Option<&'a ProgressMonitor>,
}

/// The OCR engine as seen by the worker.
pub trait OcrEngine {
    fn version(&self) -> String;

    fn init(&mut self, init: &EngineInit) -> bool;
    fn init_for_analyse_page(&mut self);

    // -- Variables ------------------------------------------------------------

    fn set_variable(&mut self, name: &str, value: &str) -> bool;
    fn set_debug_variable(&mut self, name: &str, value: &str) -> bool;
    fn int_variable(&self, name: &str) -> Option<i32>;
    fn bool_variable(&self, name: &str) -> Option<bool>;
    fn double_variable(&self, name: &str) -> Option<f64>;
    fn string_variable(&self, name: &str) -> Option<String>;

    // -- Names and paths ------------------------------------------------------

    fn set_input_name(&mut self, name: &str);
    fn input_name(&self) -> Option<String>;
    fn set_output_name(&mut self, name: &str);
    fn data_path(&self) -> Option<String>;

    // -- Images ---------------------------------------------------------------

    fn set_input_image(&mut self, image: Raster);
    fn input_image(&self) -> Option<&Raster>;
    fn set_image(&mut self, image: Raster);
    fn set_page_seg_mode(&mut self, mode: PageSegMode);
    fn set_rectangle(&mut self, rect: Rectangle);
    fn set_source_resolution(&mut self, ppi: u32);
    fn source_y_resolution(&self) -> i32;
    fn thresholded_image(&mut self) -> Option<Raster>;
    fn thresholded_image_scale_factor(&self) -> i32;

    // -- Recognition ----------------------------------------------------------

    fn recognize(&mut self, monitor: Option<&ProgressMonitor>) -> bool;
    fn analyse_layout(&mut self, merge_similar_words: bool) -> bool;
    fn detect_orientation_script(&mut self) -> Option<OrientationScript>;
    fn mean_text_conf(&mut self) -> i32;
    fn all_word_confidences(&mut self) -> Option<Vec<i32>>;
    fn text(
        &mut self,
        format: TextFormat,
        page: u32,
        monitor: Option<&ProgressMonitor>,
    ) -> Option<String>;

    // -- Languages ------------------------------------------------------------

    fn init_languages(&self) -> Option<String>;
    fn loaded_languages(&self) -> Vec<String>;
    fn available_languages(&self) -> Vec<String>;

    // -- Housekeeping ---------------------------------------------------------

    fn clear_persistent_cache(&mut self);
    fn clear_adaptive_classifier(&mut self);
    fn clear(&mut self);
    fn end(&mut self);

    // -- Multi-page rendering -------------------------------------------------

    fn create_renderer(&self, output_base: &str, text_only: bool) -> Box<dyn PageRenderer>;

    /// Recognize one page and hand it to `renderer`.
    fn process_page(&mut self, request: PageRequest<'_>, renderer: &mut dyn PageRenderer)
    -> bool;
}
