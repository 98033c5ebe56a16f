// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine backend built on the `ocrs` crate, a pure-Rust OCR engine backed
// by neural network models executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// pagewerk-document = { path = "crates/pagewerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// `init` loads two model files from the data path:
//
// - **Detection model** (`text-detection.rten`) locates words in the image.
// - **Recognition model** (`text-recognition.rten`) decodes characters from
//   detected lines.
//
// Models can be obtained by running the `ocrs-cli` tool once:
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png  # downloads models to ~/.cache/ocrs/
//   ```
//
// The default data path is `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).
// The models cover Latin script, exposed as the language `eng`.
//
// `ocrs` reports no per-word confidence, so recognised words carry 0 and the
// confidence queries report 0 for every word. Orientation and script
// detection is not available.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::imageops;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use pagewerk_core::engine::{EngineInit, OcrEngine, PageRenderer, PageRequest, RenderedPage};
use pagewerk_core::error::PagewerkError;
use pagewerk_core::progress::ProgressMonitor;
use pagewerk_core::raster::Raster;
use pagewerk_core::types::{
    BoundingBox, OrientationScript, PageSegMode, ProgressInfo, Rectangle, RecognizedWord,
    TextFormat,
};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use crate::image::codec::to_rgb_image;
use crate::pdf::PdfRenderer;
use crate::scan::export::{PageLayout, osd_text};
use crate::scan::threshold::otsu_binarize;

/// Default directory for cached OCR model files.
///
/// Follows the XDG Base Directory specification: `$XDG_CACHE_HOME/ocrs`, falling
/// back to `~/.cache/ocrs` when `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Languages the bundled models can read.
const SUPPORTED_LANGUAGES: [&str; 1] = ["eng"];

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects the directory to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn models_present(&self) -> bool {
        self.detection_model_path.exists() && self.recognition_model_path.exists()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<(), PagewerkError> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(PagewerkError::OcrError(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Load both models and build an `ocrs` engine.
    #[instrument(skip_all, fields(
        detection = %self.detection_model_path.display(),
        recognition = %self.recognition_model_path.display(),
    ))]
    pub fn load(&self) -> Result<OcrsEngine, PagewerkError> {
        self.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&self.detection_model_path).map_err(|err| {
            PagewerkError::OcrError(format!(
                "failed to load detection model from {}: {}",
                self.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model = Model::load_file(&self.recognition_model_path).map_err(|err| {
            PagewerkError::OcrError(format!(
                "failed to load recognition model from {}: {}",
                self.recognition_model_path.display(),
                err
            ))
        })?;

        OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| PagewerkError::OcrError(format!("failed to initialise OCR engine: {}", err)))
    }
}

// -- Parameters ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ParamValue {
    Int(i32),
    Bool(bool),
    Double(f64),
    Str(String),
}

impl ParamValue {
    /// Parse `raw` into the same type as `self`.
    fn parse_like(&self, raw: &str) -> Option<ParamValue> {
        let raw = raw.trim();
        match self {
            Self::Int(_) => raw.parse().ok().map(Self::Int),
            Self::Double(_) => raw.parse().ok().map(Self::Double),
            Self::Bool(_) => match raw {
                "1" | "T" | "t" | "true" | "TRUE" | "True" => Some(Self::Bool(true)),
                "0" | "F" | "f" | "false" | "FALSE" | "False" => Some(Self::Bool(false)),
                _ => None,
            },
            Self::Str(_) => Some(Self::Str(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct Param {
    value: ParamValue,
    debug: bool,
}

fn default_params() -> BTreeMap<String, Param> {
    let entries = [
        ("tessedit_char_whitelist", ParamValue::Str(String::new()), false),
        ("tessedit_char_blacklist", ParamValue::Str(String::new()), false),
        ("preserve_interword_spaces", ParamValue::Bool(false), false),
        ("user_defined_dpi", ParamValue::Int(0), false),
        ("min_word_length", ParamValue::Int(1), false),
        ("textonly_pdf", ParamValue::Bool(false), false),
        ("line_merge_tolerance", ParamValue::Double(0.5), false),
        ("debug_level", ParamValue::Int(0), true),
        ("debug_file", ParamValue::Str(String::new()), true),
    ];
    entries
        .into_iter()
        .map(|(name, value, debug)| (name.to_string(), Param { value, debug }))
        .collect()
}

// -- Backend ------------------------------------------------------------------

/// Why a recognition pass stopped early.
enum Interrupt {
    Cancelled,
    TimedOut,
}

/// [`OcrEngine`] implementation backed by `ocrs`.
pub struct OcrsBackend {
    engine: Option<OcrsEngine>,
    model_dir: Option<PathBuf>,
    languages: Vec<String>,
    params: BTreeMap<String, Param>,
    input_name: Option<String>,
    output_name: Option<String>,
    input_image: Option<Raster>,
    image: Option<Raster>,
    rectangle: Option<Rectangle>,
    page_seg_mode: PageSegMode,
    source_resolution: Option<u32>,
    layout: Option<PageLayout>,
    analysed_lines: usize,
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrsBackend {
    pub fn new() -> Self {
        Self {
            engine: None,
            model_dir: None,
            languages: Vec::new(),
            params: default_params(),
            input_name: None,
            output_name: None,
            input_image: None,
            image: None,
            rectangle: None,
            page_seg_mode: PageSegMode::Auto,
            source_resolution: None,
            layout: None,
            analysed_lines: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    pub fn page_seg_mode(&self) -> PageSegMode {
        self.page_seg_mode
    }

    /// Lines found by the last `analyse_layout`.
    pub fn analysed_lines(&self) -> usize {
        self.analysed_lines
    }

    /// Output name set by the caller, if any.
    pub fn output_name(&self) -> Option<&str> {
        self.output_name.as_deref()
    }

    fn set_param(&mut self, name: &str, value: &str, allow_debug: bool) -> bool {
        let Some(param) = self.params.get_mut(name) else {
            debug!(name, "Unknown variable");
            return false;
        };
        if param.debug && !allow_debug {
            return false;
        }
        match param.value.parse_like(value) {
            Some(parsed) => {
                param.value = parsed;
                true
            }
            None => false,
        }
    }

    fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name).map(|p| &p.value)
    }

    fn string_param(&self, name: &str) -> String {
        match self.param(name) {
            Some(ParamValue::Str(s)) => s.clone(),
            _ => String::new(),
        }
    }

    fn apply_config_file(&mut self, name: &str) {
        let candidates = [
            self.model_dir
                .as_ref()
                .map(|dir| dir.join("configs").join(name)),
            Some(PathBuf::from(name)),
        ];
        let Some(path) = candidates.into_iter().flatten().find(|p| p.is_file()) else {
            warn!(config = name, "Config file not found");
            return;
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    let mut parts = line.splitn(2, char::is_whitespace);
                    if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
                        if !self.set_param(key, value, true) {
                            warn!(config = name, key, "Config variable rejected");
                        }
                    }
                }
            }
            Err(err) => warn!(config = name, error = %err, "Config file unreadable"),
        }
    }

    /// The raster recognition runs on: the last `set_image`, else the input
    /// image.
    fn working_image(&self) -> Option<&Raster> {
        self.image.as_ref().or(self.input_image.as_ref())
    }

    /// Crop region inside the working image, clamped to its bounds.
    fn crop_region(&self, raster: &Raster) -> (u32, u32, u32, u32) {
        match self.rectangle {
            Some(rect) => {
                let left = (rect.left.max(0) as u32).min(raster.width().saturating_sub(1));
                let top = (rect.top.max(0) as u32).min(raster.height().saturating_sub(1));
                let width = (rect.width.max(1) as u32).min(raster.width() - left);
                let height = (rect.height.max(1) as u32).min(raster.height() - top);
                (left, top, width, height)
            }
            None => (0, 0, raster.width(), raster.height()),
        }
    }

    /// Detect, group and recognize the working image.
    fn run_recognition(
        &mut self,
        monitor: Option<&ProgressMonitor>,
        deadline: Option<Instant>,
    ) -> Result<PageLayout, PagewerkError> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| PagewerkError::OcrError("models are not loaded".into()))?;
        let raster = self
            .image
            .as_ref()
            .or(self.input_image.as_ref())
            .ok_or_else(|| PagewerkError::OcrError("no image has been set".into()))?;

        let (left, top, width, height) = self.crop_region(raster);
        let full = to_rgb_image(raster);
        let rgb = if (left, top, width, height) == (0, 0, raster.width(), raster.height()) {
            full
        } else {
            imageops::crop_imm(&full, left, top, width, height).to_image()
        };

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            PagewerkError::OcrError(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = engine
            .prepare_input(source)
            .map_err(|err| PagewerkError::OcrError(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = engine
            .detect_words(&input)
            .map_err(|err| PagewerkError::OcrError(format!("word detection failed: {}", err)))?;
        let line_rects = engine.find_text_lines(&input, &word_rects);
        debug!(
            words = word_rects.len(),
            lines = line_rects.len(),
            "Text lines found"
        );

        let whitelist = self.string_param("tessedit_char_whitelist");
        let blacklist = self.string_param("tessedit_char_blacklist");
        let total = line_rects.len().max(1);
        let mut words = Vec::new();

        for (line_idx, line_rect) in line_rects.iter().enumerate() {
            if let Some(interrupt) = interrupted(monitor, deadline) {
                return Err(PagewerkError::OcrError(match interrupt {
                    Interrupt::Cancelled => "recognition cancelled".into(),
                    Interrupt::TimedOut => "recognition timed out".into(),
                }));
            }

            let recognized = engine
                .recognize_text(&input, std::slice::from_ref(line_rect))
                .map_err(|err| {
                    PagewerkError::OcrError(format!("line recognition failed: {}", err))
                })?;

            let mut line_box: Option<BoundingBox> = None;
            for line in recognized.iter().flatten() {
                for word in line.words() {
                    let text: String = word
                        .to_string()
                        .chars()
                        .filter(|c| whitelist.is_empty() || whitelist.contains(*c))
                        .filter(|c| !blacklist.contains(*c))
                        .collect();
                    if text.trim().is_empty() {
                        continue;
                    }
                    let rect = word.bounding_rect();
                    let bbox = BoundingBox {
                        left: rect.left() as i32 + left as i32,
                        top: rect.top() as i32 + top as i32,
                        right: rect.right() as i32 + left as i32,
                        bottom: rect.bottom() as i32 + top as i32,
                    };
                    line_box = Some(line_box.map_or(bbox, |b| b.union(&bbox)));
                    words.push(RecognizedWord {
                        text,
                        bbox,
                        confidence: 0.0,
                        line: line_idx as u32,
                    });
                }
            }

            if let Some(monitor) = monitor {
                let b = line_box.unwrap_or_default();
                monitor.report(ProgressInfo {
                    progress: line_idx as i32 + 1,
                    percent: ((line_idx + 1) * 100 / total) as i32,
                    ocr_alive: true,
                    top: b.top,
                    right: b.right,
                    bottom: b.bottom,
                    left: b.left,
                });
            }
        }

        info!(words = words.len(), lines = line_rects.len(), "Recognition complete");
        Ok(PageLayout {
            width: raster.width(),
            height: raster.height(),
            words,
        })
    }

    fn ensure_recognized(&mut self, monitor: Option<&ProgressMonitor>) -> bool {
        if self.layout.is_some() {
            return true;
        }
        self.recognize(monitor)
    }

    fn reset_page(&mut self) {
        self.layout = None;
        self.analysed_lines = 0;
    }
}

fn interrupted(monitor: Option<&ProgressMonitor>, deadline: Option<Instant>) -> Option<Interrupt> {
    if monitor.is_some_and(|m| m.is_cancelled()) {
        return Some(Interrupt::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Some(Interrupt::TimedOut);
    }
    None
}

impl OcrEngine for OcrsBackend {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    #[instrument(skip_all, fields(language = %init.language, mode = ?init.mode))]
    fn init(&mut self, init: &EngineInit) -> bool {
        let mut languages: Vec<String> = init
            .language
            .split('+')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if languages.is_empty() {
            languages.push("eng".into());
        }
        if let Some(lang) = languages
            .iter()
            .find(|l| !SUPPORTED_LANGUAGES.contains(&l.as_str()))
        {
            warn!(language = %lang, "Language is not available");
            return false;
        }

        let dir = init.data_path.clone().unwrap_or_else(default_model_dir);
        let engine = match OcrConfig::from_dir(&dir).load() {
            Ok(engine) => engine,
            Err(err) => {
                warn!(error = %err, "OCR models could not be loaded");
                return false;
            }
        };

        self.engine = Some(engine);
        self.model_dir = Some(dir);
        self.languages = languages;
        self.params = default_params();
        self.reset_page();

        for config in &init.configs {
            self.apply_config_file(config);
        }
        for (name, value) in &init.variables {
            if !self.set_param(name, value, !init.set_only_non_debug_params) {
                warn!(name = %name, "Init variable rejected");
            }
        }
        info!("OCR backend initialised");
        true
    }

    fn init_for_analyse_page(&mut self) {
        self.reset_page();
    }

    fn set_variable(&mut self, name: &str, value: &str) -> bool {
        self.set_param(name, value, false)
    }

    fn set_debug_variable(&mut self, name: &str, value: &str) -> bool {
        self.set_param(name, value, true)
    }

    fn int_variable(&self, name: &str) -> Option<i32> {
        match self.param(name) {
            Some(ParamValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    fn bool_variable(&self, name: &str) -> Option<bool> {
        match self.param(name) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn double_variable(&self, name: &str) -> Option<f64> {
        match self.param(name) {
            Some(ParamValue::Double(n)) => Some(*n),
            _ => None,
        }
    }

    fn string_variable(&self, name: &str) -> Option<String> {
        match self.param(name) {
            Some(ParamValue::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn set_input_name(&mut self, name: &str) {
        self.input_name = Some(name.to_string());
    }

    fn input_name(&self) -> Option<String> {
        self.input_name.clone()
    }

    fn set_output_name(&mut self, name: &str) {
        self.output_name = Some(name.to_string());
    }

    fn data_path(&self) -> Option<String> {
        self.model_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned())
    }

    fn set_input_image(&mut self, image: Raster) {
        self.input_image = Some(image);
        self.reset_page();
    }

    fn input_image(&self) -> Option<&Raster> {
        self.input_image.as_ref()
    }

    fn set_image(&mut self, image: Raster) {
        self.image = Some(image);
        self.rectangle = None;
        self.reset_page();
    }

    fn set_page_seg_mode(&mut self, mode: PageSegMode) {
        self.page_seg_mode = mode;
    }

    fn set_rectangle(&mut self, rect: Rectangle) {
        self.rectangle = Some(rect);
        self.reset_page();
    }

    fn set_source_resolution(&mut self, ppi: u32) {
        self.source_resolution = Some(ppi);
    }

    fn source_y_resolution(&self) -> i32 {
        let from_image = self.working_image().map(|r| r.resolution().1).unwrap_or(0);
        let ppi = self
            .source_resolution
            .or((from_image > 0).then_some(from_image))
            .unwrap_or_else(|| self.int_variable("user_defined_dpi").unwrap_or(0).max(0) as u32);
        i32::try_from(ppi).unwrap_or(i32::MAX)
    }

    fn thresholded_image(&mut self) -> Option<Raster> {
        let raster = self.working_image()?;
        match otsu_binarize(raster) {
            Ok(binary) => Some(binary),
            Err(err) => {
                warn!(error = %err, "Thresholding failed");
                None
            }
        }
    }

    fn thresholded_image_scale_factor(&self) -> i32 {
        1
    }

    fn recognize(&mut self, monitor: Option<&ProgressMonitor>) -> bool {
        match self.run_recognition(monitor, None) {
            Ok(layout) => {
                self.layout = Some(layout);
                true
            }
            Err(err) => {
                warn!(error = %err, "Recognition failed");
                self.layout = None;
                false
            }
        }
    }

    fn analyse_layout(&mut self, merge_similar_words: bool) -> bool {
        let Some(engine) = self.engine.as_ref() else {
            return false;
        };
        let Some(raster) = self.working_image() else {
            return false;
        };
        let rgb = to_rgb_image(raster);
        let lines = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .ok()
            .and_then(|source| engine.prepare_input(source).ok())
            .and_then(|input| {
                let words = engine.detect_words(&input).ok()?;
                Some(engine.find_text_lines(&input, &words).len())
            });
        match lines {
            Some(count) => {
                debug!(count, merge_similar_words, "Layout analysed");
                self.analysed_lines = count;
                true
            }
            None => false,
        }
    }

    fn detect_orientation_script(&mut self) -> Option<OrientationScript> {
        None
    }

    fn mean_text_conf(&mut self) -> i32 {
        if !self.ensure_recognized(None) {
            return 0;
        }
        self.layout.as_ref().map_or(0, PageLayout::mean_confidence)
    }

    fn all_word_confidences(&mut self) -> Option<Vec<i32>> {
        if !self.ensure_recognized(None) {
            return None;
        }
        self.layout.as_ref().map(|layout| {
            layout
                .words
                .iter()
                .map(|w| w.confidence.round() as i32)
                .collect()
        })
    }

    fn text(
        &mut self,
        format: TextFormat,
        page: u32,
        monitor: Option<&ProgressMonitor>,
    ) -> Option<String> {
        if format == TextFormat::Osd {
            return self
                .detect_orientation_script()
                .map(|osd| osd_text(page, &osd));
        }
        if !self.ensure_recognized(monitor) {
            return None;
        }
        let layout = self.layout.as_ref()?;
        let image_name = self.input_name.clone().unwrap_or_default();
        Some(match format {
            TextFormat::Utf8 | TextFormat::Unlv => layout.to_text(),
            TextFormat::Hocr => layout.to_hocr(page),
            TextFormat::Tsv => layout.to_tsv(page),
            TextFormat::Alto => layout.to_alto(page),
            TextFormat::Page => layout.to_page_xml(page, &image_name),
            TextFormat::LstmBox => layout.to_lstm_box(page),
            TextFormat::Box => layout.to_box(page),
            TextFormat::WordStrBox => layout.to_word_str_box(page),
            TextFormat::Osd => return None,
        })
    }

    fn init_languages(&self) -> Option<String> {
        if self.engine.is_none() {
            return None;
        }
        Some(self.languages.join("+"))
    }

    fn loaded_languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn available_languages(&self) -> Vec<String> {
        let config = match &self.model_dir {
            Some(dir) => OcrConfig::from_dir(dir),
            None => OcrConfig::default(),
        };
        if config.models_present() {
            SUPPORTED_LANGUAGES.iter().map(|l| l.to_string()).collect()
        } else {
            Vec::new()
        }
    }

    fn clear_persistent_cache(&mut self) {
        debug!("No persistent cache to clear");
    }

    fn clear_adaptive_classifier(&mut self) {
        debug!("No adaptive classifier to clear");
    }

    fn clear(&mut self) {
        self.image = None;
        self.rectangle = None;
        self.reset_page();
    }

    fn end(&mut self) {
        self.engine = None;
        self.languages.clear();
        self.input_image = None;
        self.source_resolution = None;
        self.clear();
        info!("OCR backend ended");
    }

    fn create_renderer(&self, output_base: &str, text_only: bool) -> Box<dyn PageRenderer> {
        Box::new(PdfRenderer::new(output_base, text_only))
    }

    #[instrument(skip_all, fields(index = request.index, timeout_ms = request.timeout_ms))]
    fn process_page(
        &mut self,
        request: PageRequest<'_>,
        renderer: &mut dyn PageRenderer,
    ) -> bool {
        let deadline = (request.timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(request.timeout_ms as u64));
        self.set_image(request.image);

        let layout = match self.run_recognition(request.monitor, deadline) {
            Ok(layout) => layout,
            Err(err) => {
                warn!(error = %err, "Page recognition failed");
                return false;
            }
        };
        let Some(image) = self.image.as_ref() else {
            return false;
        };
        let page = RenderedPage {
            index: request.index,
            image,
            words: &layout.words,
            filename: request.filename,
        };
        let added = renderer.add_page(&page);
        self.layout = Some(layout);
        added
    }
}
