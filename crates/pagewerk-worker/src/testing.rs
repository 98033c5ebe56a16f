// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deterministic in-memory engine and renderer for worker tests.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pagewerk_core::engine::{EngineInit, OcrEngine, PageRenderer, PageRequest, RenderedPage};
use pagewerk_core::progress::ProgressMonitor;
use pagewerk_core::raster::Raster;
use pagewerk_core::types::{
    OrientationScript, PageSegMode, ProgressInfo, Rectangle, TextFormat,
};

/// Shared record of engine calls. Also detects overlapping calls.
#[derive(Debug, Default)]
pub(crate) struct CallLog {
    calls: Mutex<Vec<String>>,
    busy: AtomicBool,
    overlaps: AtomicUsize,
}

impl CallLog {
    fn enter(self: &Arc<Self>, name: &str) -> CallGuard {
        if self.busy.swap(true, Ordering::AcqRel) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        CallGuard {
            log: Arc::clone(self),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|call| *call == name).count()
    }

    /// Calls that started while another was still running.
    pub(crate) fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

struct CallGuard {
    log: Arc<CallLog>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.log.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum FakeVar {
    Int(i32),
    Bool(bool),
    Double(f64),
    Str(String),
}

/// What the engine saw for one processed page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PageRecord {
    pub index: u32,
    pub resolution: (u32, u32),
    pub depth: u8,
    pub has_alpha: bool,
    pub filename: Option<String>,
}

pub(crate) struct FakeEngine {
    log: Arc<CallLog>,
    variables: BTreeMap<String, FakeVar>,
    input_name: Option<String>,
    output_name: Option<String>,
    data_path: Option<String>,
    input_image: Option<Raster>,
    image: Option<Raster>,
    source_resolution: Option<u32>,
    languages: Vec<String>,
    recognized: bool,
    fail_next_page: bool,
    fail_end_document: bool,
    renderer_broken: Arc<AtomicBool>,
    panic_on_recognize: bool,
    delay: Option<Duration>,
    pages: Vec<PageRecord>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::with_log(Arc::new(CallLog::default()))
    }
}

impl FakeEngine {
    pub(crate) fn with_log(log: Arc<CallLog>) -> Self {
        let variables = [
            ("tessedit_char_whitelist", FakeVar::Str(String::new())),
            ("user_defined_dpi", FakeVar::Int(0)),
            ("preserve_interword_spaces", FakeVar::Bool(false)),
            ("textord_noise_area_ratio", FakeVar::Double(0.7)),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            log,
            variables,
            input_name: None,
            output_name: None,
            data_path: None,
            input_image: None,
            image: None,
            source_resolution: None,
            languages: Vec::new(),
            recognized: false,
            fail_next_page: false,
            fail_end_document: false,
            renderer_broken: Arc::new(AtomicBool::new(false)),
            panic_on_recognize: false,
            delay: None,
            pages: Vec::new(),
        }
    }

    pub(crate) fn fail_next_page(&mut self) {
        self.fail_next_page = true;
    }

    pub(crate) fn fail_end_document(&mut self) {
        self.fail_end_document = true;
    }

    /// Mark every renderer this engine created as unhealthy, including ones
    /// already held by an open session.
    pub(crate) fn break_renderer(&self) {
        self.renderer_broken.store(true, Ordering::SeqCst);
    }

    pub(crate) fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub(crate) fn panicking_on_recognize(mut self) -> Self {
        self.panic_on_recognize = true;
        self
    }

    /// Make `recognize` sleep, to keep the worker busy.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn last_page(&self) -> Option<&PageRecord> {
        self.pages.last()
    }

    fn assign(&mut self, name: &str, value: &str) -> bool {
        let Some(slot) = self.variables.get_mut(name) else {
            return false;
        };
        let parsed = match slot {
            FakeVar::Int(_) => value.parse().ok().map(FakeVar::Int),
            FakeVar::Bool(_) => match value {
                "1" | "true" => Some(FakeVar::Bool(true)),
                "0" | "false" => Some(FakeVar::Bool(false)),
                _ => None,
            },
            FakeVar::Double(_) => value.parse().ok().map(FakeVar::Double),
            FakeVar::Str(_) => Some(FakeVar::Str(value.to_string())),
        };
        match parsed {
            Some(parsed) => {
                *slot = parsed;
                true
            }
            None => false,
        }
    }

    fn working_image(&self) -> Option<&Raster> {
        self.image.as_ref().or(self.input_image.as_ref())
    }
}

impl OcrEngine for FakeEngine {
    fn version(&self) -> String {
        let _call = self.log.enter("version");
        "5.3.0-fake".into()
    }

    fn init(&mut self, init: &EngineInit) -> bool {
        let _call = self.log.enter("init");
        if init.language.split('+').any(|lang| lang == "missing") {
            return false;
        }
        self.languages = if init.language.is_empty() {
            vec!["eng".into()]
        } else {
            init.language.split('+').map(String::from).collect()
        };
        self.data_path = Some(
            init.data_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| "/fake/tessdata".into()),
        );
        for (name, value) in &init.variables {
            self.assign(name, value);
        }
        true
    }

    fn init_for_analyse_page(&mut self) {
        let _call = self.log.enter("init_for_analyse_page");
    }

    fn set_variable(&mut self, name: &str, value: &str) -> bool {
        let _call = self.log.enter("set_variable");
        self.assign(name, value)
    }

    fn set_debug_variable(&mut self, name: &str, value: &str) -> bool {
        let _call = self.log.enter("set_debug_variable");
        self.assign(name, value)
    }

    fn int_variable(&self, name: &str) -> Option<i32> {
        let _call = self.log.enter("int_variable");
        match self.variables.get(name) {
            Some(FakeVar::Int(n)) => Some(*n),
            _ => None,
        }
    }

    fn bool_variable(&self, name: &str) -> Option<bool> {
        let _call = self.log.enter("bool_variable");
        match self.variables.get(name) {
            Some(FakeVar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn double_variable(&self, name: &str) -> Option<f64> {
        let _call = self.log.enter("double_variable");
        match self.variables.get(name) {
            Some(FakeVar::Double(n)) => Some(*n),
            _ => None,
        }
    }

    fn string_variable(&self, name: &str) -> Option<String> {
        let _call = self.log.enter("string_variable");
        match self.variables.get(name) {
            Some(FakeVar::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn set_input_name(&mut self, name: &str) {
        let _call = self.log.enter(&format!("set_input_name:{name}"));
        self.input_name = Some(name.to_string());
    }

    fn input_name(&self) -> Option<String> {
        let _call = self.log.enter("input_name");
        self.input_name.clone()
    }

    fn set_output_name(&mut self, name: &str) {
        let _call = self.log.enter("set_output_name");
        self.output_name = Some(name.to_string());
    }

    fn data_path(&self) -> Option<String> {
        let _call = self.log.enter("data_path");
        self.data_path.clone()
    }

    fn set_input_image(&mut self, image: Raster) {
        let _call = self.log.enter("set_input_image");
        self.input_image = Some(image);
        self.recognized = false;
    }

    fn input_image(&self) -> Option<&Raster> {
        let _call = self.log.enter("input_image");
        self.input_image.as_ref()
    }

    fn set_image(&mut self, image: Raster) {
        let _call = self.log.enter("set_image");
        self.image = Some(image);
        self.recognized = false;
    }

    fn set_page_seg_mode(&mut self, _mode: PageSegMode) {
        let _call = self.log.enter("set_page_seg_mode");
    }

    fn set_rectangle(&mut self, _rect: Rectangle) {
        let _call = self.log.enter("set_rectangle");
        self.recognized = false;
    }

    fn set_source_resolution(&mut self, ppi: u32) {
        let _call = self.log.enter("set_source_resolution");
        self.source_resolution = Some(ppi);
    }

    fn source_y_resolution(&self) -> i32 {
        let _call = self.log.enter("source_y_resolution");
        self.source_resolution
            .or_else(|| self.working_image().map(|r| r.resolution().1))
            .unwrap_or(0) as i32
    }

    fn thresholded_image(&mut self) -> Option<Raster> {
        let _call = self.log.enter("thresholded_image");
        let image = self.working_image()?;
        Raster::new(image.width(), image.height(), 1, 1).ok()
    }

    fn thresholded_image_scale_factor(&self) -> i32 {
        let _call = self.log.enter("thresholded_image_scale_factor");
        1
    }

    fn recognize(&mut self, monitor: Option<&ProgressMonitor>) -> bool {
        let _call = self.log.enter("recognize");
        if self.panic_on_recognize {
            panic!("fake engine exploded");
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.working_image().is_none() {
            return false;
        }
        if let Some(monitor) = monitor {
            if monitor.is_cancelled() {
                return false;
            }
            for percent in [50, 100] {
                monitor.report(ProgressInfo {
                    progress: percent,
                    percent,
                    ocr_alive: true,
                    ..Default::default()
                });
            }
        }
        self.recognized = true;
        true
    }

    fn analyse_layout(&mut self, _merge_similar_words: bool) -> bool {
        let _call = self.log.enter("analyse_layout");
        self.working_image().is_some()
    }

    fn detect_orientation_script(&mut self) -> Option<OrientationScript> {
        let _call = self.log.enter("detect_orientation_script");
        self.working_image()?;
        Some(OrientationScript {
            orientation_degrees: 0,
            orientation_confidence: 12.5,
            script_name: "Latin".into(),
            script_confidence: 3.25,
        })
    }

    fn mean_text_conf(&mut self) -> i32 {
        let _call = self.log.enter("mean_text_conf");
        if self.recognized { 87 } else { 0 }
    }

    fn all_word_confidences(&mut self) -> Option<Vec<i32>> {
        let _call = self.log.enter("all_word_confidences");
        self.recognized.then(|| vec![91, 83])
    }

    fn text(
        &mut self,
        format: TextFormat,
        page: u32,
        monitor: Option<&ProgressMonitor>,
    ) -> Option<String> {
        let _call = self.log.enter("text");
        self.working_image()?;
        if let Some(monitor) = monitor {
            monitor.report(ProgressInfo {
                progress: 100,
                percent: 100,
                ocr_alive: true,
                ..Default::default()
            });
        }
        Some(format!("{}:{page}", format.method()))
    }

    fn init_languages(&self) -> Option<String> {
        let _call = self.log.enter("init_languages");
        (!self.languages.is_empty()).then(|| self.languages.join("+"))
    }

    fn loaded_languages(&self) -> Vec<String> {
        let _call = self.log.enter("loaded_languages");
        self.languages.clone()
    }

    fn available_languages(&self) -> Vec<String> {
        let _call = self.log.enter("available_languages");
        vec!["eng".into(), "osd".into()]
    }

    fn clear_persistent_cache(&mut self) {
        let _call = self.log.enter("clear_persistent_cache");
    }

    fn clear_adaptive_classifier(&mut self) {
        let _call = self.log.enter("clear_adaptive_classifier");
    }

    fn clear(&mut self) {
        let _call = self.log.enter("clear");
        self.image = None;
        self.recognized = false;
    }

    fn end(&mut self) {
        let _call = self.log.enter("end");
        self.languages.clear();
        self.image = None;
        self.input_image = None;
    }

    fn create_renderer(&self, output_base: &str, _text_only: bool) -> Box<dyn PageRenderer> {
        let _call = self.log.enter("create_renderer");
        Box::new(FakeRenderer {
            healthy: !output_base.contains("unwritable"),
            fail_end: self.fail_end_document,
            broken: Arc::clone(&self.renderer_broken),
        })
    }

    fn process_page(
        &mut self,
        request: PageRequest<'_>,
        renderer: &mut dyn PageRenderer,
    ) -> bool {
        let _call = self.log.enter("process_page");
        if std::mem::take(&mut self.fail_next_page) {
            return false;
        }
        self.pages.push(PageRecord {
            index: request.index,
            resolution: request.image.resolution(),
            depth: request.image.depth(),
            has_alpha: request.image.has_alpha(),
            filename: request.filename.map(String::from),
        });
        renderer.add_page(&RenderedPage {
            index: request.index,
            image: &request.image,
            words: &[],
            filename: request.filename,
        })
    }
}

#[derive(Debug)]
pub(crate) struct FakeRenderer {
    healthy: bool,
    fail_end: bool,
    broken: Arc<AtomicBool>,
}

impl PageRenderer for FakeRenderer {
    fn is_healthy(&self) -> bool {
        self.healthy && !self.broken.load(Ordering::SeqCst)
    }

    fn begin_document(&mut self, title: &str) -> bool {
        !title.is_empty()
    }

    fn add_page(&mut self, _page: &RenderedPage<'_>) -> bool {
        self.is_healthy()
    }

    fn end_document(&mut self) -> bool {
        if self.fail_end {
            self.healthy = false;
            return false;
        }
        true
    }
}

/// A small RGBA PNG with no resolution metadata.
pub(crate) fn encoded_page() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(16, 12, |x, y| {
        if (x + y) % 5 == 0 {
            image::Rgba([10, 10, 10, 255])
        } else {
            image::Rgba([240, 240, 240, 180])
        }
    });
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode test page");
    out
}
