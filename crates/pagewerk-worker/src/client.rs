// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing handle to an OCR worker.
//
// `OcrWorker` can be shared across threads (`&OcrWorker` is enough to
// submit). Every method enqueues one command and returns its `Completion`
// without waiting for the worker. Dropping the handle stops the worker:
// the running job finishes, queued jobs are rejected.

use std::sync::Arc;
use std::thread::JoinHandle;

use pagewerk_core::config::WorkerConfig;
use pagewerk_core::engine::OcrEngine;
use pagewerk_core::error::{CommandError, Result};
use pagewerk_core::progress::{self, Progress, ProgressMonitor};
use pagewerk_core::types::{InitOptions, ProcessPagesOptions, Rectangle};
use tracing::{debug, info};

use crate::command::{Command, ImageInput};
use crate::job::{Completion, Job};
use crate::queue::JobQueue;
use crate::worker;

/// Handle to a worker thread that owns one OCR engine.
pub struct OcrWorker {
    queue: Arc<JobQueue>,
    config: Arc<WorkerConfig>,
    thread: Option<JoinHandle<()>>,
}

impl OcrWorker {
    /// Start a worker whose engine is built by `factory` on the worker thread.
    pub fn spawn<E, F>(config: WorkerConfig, factory: F) -> Result<Self>
    where
        F: FnOnce() -> E + Send + 'static,
        E: OcrEngine + 'static,
    {
        config.validate()?;
        let config = Arc::new(config);
        let queue = Arc::new(JobQueue::new());
        let thread = worker::spawn(Arc::clone(&config), Arc::clone(&queue), factory)?;
        info!(thread = %config.thread_name, "OCR worker spawned");
        Ok(Self {
            queue,
            config,
            thread: Some(thread),
        })
    }

    /// Start a worker backed by the `ocrs` engine.
    #[cfg(feature = "ocr")]
    pub fn with_ocrs(config: WorkerConfig) -> Result<Self> {
        Self::spawn(config, pagewerk_document::OcrsBackend::new)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Enqueue any command.
    pub fn submit(&self, command: Command) -> Completion {
        let (job, completion) = Job::new(command);
        if let Err(job) = self.queue.push(job) {
            let method = job.method();
            debug!(method, "Refusing job, worker is closing");
            job.reject(CommandError::Closing { method });
        }
        completion
    }

    /// Enqueue a command built around a fresh progress monitor.
    pub fn submit_with_progress(
        &self,
        build: impl FnOnce(ProgressMonitor) -> Command,
    ) -> (Completion, Progress) {
        let (monitor, progress) = progress::channel(self.config.progress_capacity);
        (self.submit(build(monitor)), progress)
    }

    /// Whether `end` was accepted or the worker is stopping.
    pub fn is_closing(&self) -> bool {
        self.queue.is_closing()
    }

    /// Jobs waiting behind the one currently running.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Session commands grouped under one handle.
    pub fn document(&self) -> Document<'_> {
        Document { worker: self }
    }

    // -- Engine lifecycle -----------------------------------------------------

    pub fn version(&self) -> Completion {
        self.submit(Command::Version)
    }

    pub fn is_initialized(&self) -> Completion {
        self.submit(Command::IsInitialized)
    }

    pub fn init(&self, options: InitOptions) -> Completion {
        self.submit(Command::Init(options))
    }

    pub fn init_for_analyse_page(&self) -> Completion {
        self.submit(Command::InitForAnalysePage)
    }

    /// Ends the engine. Terminal: later submissions are refused.
    pub fn end(&self) -> Completion {
        self.submit(Command::End)
    }

    // -- Variables and names --------------------------------------------------

    pub fn set_variable(&self, name: impl Into<String>, value: impl Into<String>) -> Completion {
        self.submit(Command::SetVariable {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn set_debug_variable(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Completion {
        self.submit(Command::SetDebugVariable {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn get_int_variable(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::GetIntVariable { name: name.into() })
    }

    pub fn get_bool_variable(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::GetBoolVariable { name: name.into() })
    }

    pub fn get_double_variable(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::GetDoubleVariable { name: name.into() })
    }

    pub fn get_string_variable(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::GetStringVariable { name: name.into() })
    }

    pub fn set_input_name(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::SetInputName { name: name.into() })
    }

    pub fn get_input_name(&self) -> Completion {
        self.submit(Command::GetInputName)
    }

    pub fn set_output_name(&self, name: impl Into<String>) -> Completion {
        self.submit(Command::SetOutputName { name: name.into() })
    }

    pub fn get_data_path(&self) -> Completion {
        self.submit(Command::GetDataPath)
    }

    // -- Images ---------------------------------------------------------------

    /// Set the input image from an encoded file.
    pub fn set_input_image(&self, data: Vec<u8>) -> Completion {
        self.submit(Command::SetInputImage { data })
    }

    pub fn get_input_image(&self) -> Completion {
        self.submit(Command::GetInputImage)
    }

    pub fn set_page_mode(&self, mode: i32) -> Completion {
        self.submit(Command::SetPageMode { mode })
    }

    pub fn set_rectangle(&self, rect: Rectangle) -> Completion {
        self.submit(Command::SetRectangle(rect))
    }

    pub fn set_source_resolution(&self, ppi: i32) -> Completion {
        self.submit(Command::SetSourceResolution { ppi })
    }

    pub fn get_source_y_resolution(&self) -> Completion {
        self.submit(Command::GetSourceYResolution)
    }

    pub fn set_image(&self, image: ImageInput) -> Completion {
        self.submit(Command::SetImage(image))
    }

    pub fn get_thresholded_image(&self) -> Completion {
        self.submit(Command::GetThresholdedImage)
    }

    pub fn get_thresholded_image_scale_factor(&self) -> Completion {
        self.submit(Command::GetThresholdedImageScaleFactor)
    }

    // -- Recognition ----------------------------------------------------------

    pub fn recognize(&self) -> Completion {
        self.submit(Command::Recognize { monitor: None })
    }

    pub fn recognize_with_progress(&self) -> (Completion, Progress) {
        self.submit_with_progress(|monitor| Command::Recognize {
            monitor: Some(monitor),
        })
    }

    pub fn analyse_layout(&self, merge_similar_words: bool) -> Completion {
        self.submit(Command::AnalyseLayout {
            merge_similar_words,
        })
    }

    pub fn detect_orientation_script(&self) -> Completion {
        self.submit(Command::DetectOrientationScript)
    }

    pub fn mean_text_conf(&self) -> Completion {
        self.submit(Command::MeanTextConf)
    }

    pub fn all_word_confidences(&self) -> Completion {
        self.submit(Command::AllWordConfidences)
    }

    // -- Text output ----------------------------------------------------------

    pub fn get_utf8_text(&self) -> Completion {
        self.submit(Command::GetUtf8Text)
    }

    pub fn get_hocr_text(&self, page: i32) -> Completion {
        self.submit(Command::GetHocrText {
            page,
            monitor: None,
        })
    }

    pub fn get_hocr_text_with_progress(&self, page: i32) -> (Completion, Progress) {
        self.submit_with_progress(|monitor| Command::GetHocrText {
            page,
            monitor: Some(monitor),
        })
    }

    pub fn get_tsv_text(&self, page: i32) -> Completion {
        self.submit(Command::GetTsvText { page })
    }

    pub fn get_unlv_text(&self) -> Completion {
        self.submit(Command::GetUnlvText)
    }

    pub fn get_alto_text(&self, page: i32) -> Completion {
        self.submit(Command::GetAltoText {
            page,
            monitor: None,
        })
    }

    pub fn get_alto_text_with_progress(&self, page: i32) -> (Completion, Progress) {
        self.submit_with_progress(|monitor| Command::GetAltoText {
            page,
            monitor: Some(monitor),
        })
    }

    pub fn get_page_text(&self, page: i32) -> Completion {
        self.submit(Command::GetPageText {
            page,
            monitor: None,
        })
    }

    pub fn get_page_text_with_progress(&self, page: i32) -> (Completion, Progress) {
        self.submit_with_progress(|monitor| Command::GetPageText {
            page,
            monitor: Some(monitor),
        })
    }

    pub fn get_lstm_box_text(&self, page: i32) -> Completion {
        self.submit(Command::GetLstmBoxText { page })
    }

    pub fn get_box_text(&self, page: i32) -> Completion {
        self.submit(Command::GetBoxText { page })
    }

    pub fn get_word_str_box_text(&self, page: i32) -> Completion {
        self.submit(Command::GetWordStrBoxText { page })
    }

    pub fn get_osd_text(&self, page: i32) -> Completion {
        self.submit(Command::GetOsdText { page })
    }

    // -- Process-pages sessions -----------------------------------------------

    pub fn begin_process_pages(&self, options: ProcessPagesOptions) -> Completion {
        self.submit(Command::BeginProcessPages(options))
    }

    pub fn add_process_page(&self, data: Vec<u8>, filename: Option<String>) -> Completion {
        self.submit(Command::AddProcessPage {
            data,
            filename,
            monitor: None,
        })
    }

    pub fn add_process_page_with_progress(
        &self,
        data: Vec<u8>,
        filename: Option<String>,
    ) -> (Completion, Progress) {
        self.submit_with_progress(|monitor| Command::AddProcessPage {
            data,
            filename,
            monitor: Some(monitor),
        })
    }

    pub fn finish_process_pages(&self) -> Completion {
        self.submit(Command::FinishProcessPages)
    }

    pub fn abort_process_pages(&self, reason: Option<String>) -> Completion {
        self.submit(Command::AbortProcessPages { reason })
    }

    pub fn get_process_pages_status(&self) -> Completion {
        self.submit(Command::GetProcessPagesStatus)
    }

    // -- Languages and housekeeping -------------------------------------------

    pub fn get_init_languages(&self) -> Completion {
        self.submit(Command::GetInitLanguages)
    }

    pub fn get_loaded_languages(&self) -> Completion {
        self.submit(Command::GetLoadedLanguages)
    }

    pub fn get_available_languages(&self) -> Completion {
        self.submit(Command::GetAvailableLanguages)
    }

    pub fn clear_persistent_cache(&self) -> Completion {
        self.submit(Command::ClearPersistentCache)
    }

    pub fn clear_adaptive_classifier(&self) -> Completion {
        self.submit(Command::ClearAdaptiveClassifier)
    }

    pub fn clear(&self) -> Completion {
        self.submit(Command::Clear)
    }
}

impl Drop for OcrWorker {
    fn drop(&mut self) {
        self.queue.request_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Worker thread panicked during shutdown");
            }
        }
    }
}

/// Process-pages commands of one worker.
#[derive(Clone, Copy)]
pub struct Document<'w> {
    worker: &'w OcrWorker,
}

impl Document<'_> {
    pub fn begin(&self, options: ProcessPagesOptions) -> Completion {
        self.worker.begin_process_pages(options)
    }

    pub fn add_page(&self, data: Vec<u8>, filename: Option<String>) -> Completion {
        self.worker.add_process_page(data, filename)
    }

    pub fn add_page_with_progress(
        &self,
        data: Vec<u8>,
        filename: Option<String>,
    ) -> (Completion, Progress) {
        self.worker.add_process_page_with_progress(data, filename)
    }

    /// Resolves to the path of the written document.
    pub fn finish(&self) -> Completion {
        self.worker.finish_process_pages()
    }

    pub fn abort(&self, reason: Option<String>) -> Completion {
        self.worker.abort_process_pages(reason)
    }

    pub fn status(&self) -> Completion {
        self.worker.get_process_pages_status()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use pagewerk_core::error::ErrorCode;
    use pagewerk_core::value::{ObjectValue, Value};

    use super::*;
    use crate::testing::{CallLog, FakeEngine, encoded_page};

    fn worker_with_log() -> (OcrWorker, Arc<CallLog>) {
        let log = Arc::new(CallLog::default());
        let engine_log = Arc::clone(&log);
        let worker = OcrWorker::spawn(WorkerConfig::default(), move || {
            FakeEngine::with_log(engine_log)
        })
        .expect("spawn worker");
        (worker, log)
    }

    fn english() -> InitOptions {
        InitOptions {
            langs: vec!["eng".into()],
            ..Default::default()
        }
    }

    #[test]
    fn commands_run_in_order_without_overlap() {
        let (worker, log) = worker_with_log();
        worker.init(english()).wait().expect("init");

        thread::scope(|scope| {
            for n in 0..4 {
                let worker = &worker;
                scope.spawn(move || {
                    let pending: Vec<_> = (0..10)
                        .map(|i| worker.set_input_name(format!("t{n}-{i}")))
                        .collect();
                    for completion in pending {
                        assert_eq!(completion.wait(), Ok(Value::Void));
                    }
                });
            }
        });

        assert_eq!(log.overlaps(), 0);
        let calls = log.calls();
        for n in 0..4 {
            let prefix = format!("set_input_name:t{n}-");
            let seen: Vec<&str> = calls
                .iter()
                .filter_map(|call| call.strip_prefix(&prefix))
                .collect();
            let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
            assert_eq!(seen, expected, "thread {n} calls out of order");
        }
    }

    #[test]
    fn single_submitter_sees_its_own_order() {
        let (worker, _log) = worker_with_log();
        let first = worker.set_input_name("first");
        let read_back = worker.get_input_name();
        let second = worker.set_input_name("second");
        let read_again = worker.get_input_name();

        assert!(first.wait().is_ok());
        assert_eq!(read_back.wait(), Ok(Value::String("first".into())));
        assert!(second.wait().is_ok());
        assert_eq!(read_again.wait(), Ok(Value::String("second".into())));
    }

    #[test]
    fn uninitialized_commands_are_gated() {
        let (worker, log) = worker_with_log();
        let err = worker.get_utf8_text().wait().expect_err("gated");
        assert_eq!(err.to_string(), "getUTF8Text: call init(...) first");
        assert_eq!(err.code(), ErrorCode::NotInitialized);
        assert!(log.calls().is_empty());

        assert_eq!(worker.version().wait(), Ok(Value::String("5.3.0-fake".into())));
        assert_eq!(worker.is_initialized().wait(), Ok(Value::Bool(false)));
    }

    #[test]
    fn failed_init_leaves_worker_uninitialized() {
        let (worker, _log) = worker_with_log();
        let options = InitOptions {
            langs: vec!["missing".into()],
            ..Default::default()
        };
        let err = worker.init(options).wait().expect_err("init fails");
        assert_eq!(err.code(), ErrorCode::EngineRuntime);
        assert_eq!(worker.is_initialized().wait(), Ok(Value::Bool(false)));
    }

    #[test]
    fn variables_round_trip() {
        let (worker, _log) = worker_with_log();
        worker.init(english()).wait().expect("init");

        assert_eq!(
            worker.set_variable("user_defined_dpi", "300").wait(),
            Ok(Value::Bool(true))
        );
        assert_eq!(worker.get_int_variable("user_defined_dpi").wait(), Ok(Value::Int(300)));
        assert_eq!(
            worker.set_variable("no_such_variable", "1").wait(),
            Ok(Value::Bool(false))
        );

        let err = worker
            .get_int_variable("no_such_variable")
            .wait()
            .expect_err("unknown variable");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(
            err.to_string(),
            "getIntVariable: variable 'no_such_variable' was not found"
        );
    }

    #[test]
    fn recognition_reports_progress() {
        let (worker, _log) = worker_with_log();
        worker.init(english()).wait().expect("init");
        worker.set_input_image(encoded_page()).wait().expect("image");

        let (completion, mut progress) = worker.recognize_with_progress();
        assert_eq!(completion.wait(), Ok(Value::Void));

        let mut percents = Vec::new();
        while let Some(info) = progress.blocking_next() {
            percents.push(info.percent);
        }
        assert_eq!(percents, [50, 100]);
        assert_eq!(worker.mean_text_conf().wait(), Ok(Value::Int(87)));
    }

    #[test]
    fn engine_panic_is_contained() {
        let worker = OcrWorker::spawn(WorkerConfig::default(), || {
            FakeEngine::default().panicking_on_recognize()
        })
        .expect("spawn worker");
        worker.init(english()).wait().expect("init");

        let err = worker.recognize().wait().expect_err("panic");
        assert_eq!(err.to_string(), "recognize: Something unexpected happened");
        assert_eq!(err.code(), ErrorCode::Unexpected);

        assert_eq!(worker.is_initialized().wait(), Ok(Value::Bool(true)));
    }

    #[test]
    fn end_closes_the_worker() {
        let (worker, log) = worker_with_log();
        worker.init(english()).wait().expect("init");
        assert_eq!(worker.end().wait(), Ok(Value::Void));
        assert!(worker.is_closing());

        let err = worker.version().wait().expect_err("closing");
        assert_eq!(err, CommandError::Closing { method: "version" });
        assert_eq!(err.code(), ErrorCode::WorkerStopped);

        drop(worker);
        assert_eq!(log.count("end"), 1);
        assert_eq!(log.calls().last().map(String::as_str), Some("end"));
    }

    #[test]
    fn document_session_flow() {
        let (worker, _log) = worker_with_log();
        worker.init(english()).wait().expect("init");
        let document = worker.document();

        let err = document
            .begin(ProcessPagesOptions {
                title: "scan".into(),
                ..Default::default()
            })
            .wait()
            .expect_err("no output base");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        document
            .begin(ProcessPagesOptions {
                output_base: Some("/tmp/pagewerk-scan".into()),
                title: "scan".into(),
                ..Default::default()
            })
            .wait()
            .expect("begin");

        let err = document.add_page(Vec::new(), None).wait().expect_err("empty");
        assert_eq!(err.to_string(), "addProcessPage: buffer is empty");

        assert_eq!(document.add_page(encoded_page(), None).wait(), Ok(Value::Void));
        assert_eq!(
            document.add_page(encoded_page(), Some("p2.png".into())).wait(),
            Ok(Value::Void)
        );

        let status = document.status().wait().expect("status");
        let object = status.as_object().expect("object");
        assert_eq!(object.get("processedPages"), Some(&ObjectValue::Int(2)));
        let keys: Vec<_> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "active",
                "healthy",
                "nextPageIndex",
                "outputBase",
                "processedPages",
                "startedAt",
                "textonly",
                "timeoutMillisec",
            ]
        );

        assert_eq!(
            document.finish().wait(),
            Ok(Value::String("/tmp/pagewerk-scan.pdf".into()))
        );
        assert_eq!(document.abort(None).wait(), Ok(Value::Void));
        let status = document.status().wait().expect("status");
        assert_eq!(
            status.as_object().and_then(|o| o.get("active")),
            Some(&ObjectValue::Bool(false))
        );
    }

    #[test]
    fn drop_rejects_queued_jobs() {
        let log = Arc::new(CallLog::default());
        let engine_log = Arc::clone(&log);
        let worker = OcrWorker::spawn(WorkerConfig::default(), move || {
            FakeEngine::with_log(engine_log).with_delay(std::time::Duration::from_millis(300))
        })
        .expect("spawn worker");
        worker.init(english()).wait().expect("init");
        worker.set_input_image(encoded_page()).wait().expect("image");

        let running = worker.recognize();
        while log.count("recognize") == 0 {
            thread::yield_now();
        }
        let queued: Vec<_> = (0..3).map(|_| worker.version()).collect();
        drop(worker);

        assert_eq!(running.wait(), Ok(Value::Void));
        for completion in queued {
            assert_eq!(
                completion.wait(),
                Err(CommandError::Stopped { method: "version" })
            );
        }
    }
}
