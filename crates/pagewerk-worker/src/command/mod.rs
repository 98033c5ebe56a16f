// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The closed command set executed by the worker thread.
//
// Each `Command` variant owns its payload and carries a host-facing operation
// name. `execute` applies the initialization gate first, then hands the
// command to the handler for its group, which validates the payload before
// touching the engine.

mod config;
mod input;
mod recognition;

use pagewerk_core::error::CommandError;
use pagewerk_core::progress::ProgressMonitor;
use pagewerk_core::types::{InitOptions, ProcessPagesOptions, Rectangle, TextFormat};
use pagewerk_core::value::Value;

use crate::worker::WorkerState;

/// Image payload for `setImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// An encoded file (PNG, JPEG, TIFF, ...) decoded by the image library.
    Encoded(Vec<u8>),
    /// Uncompressed pixels. `bytes_per_pixel` is 0 for packed 1-bit, 1 for
    /// gray, 3 for RGB and 4 for RGBA.
    Raw {
        pixels: Vec<u8>,
        width: i32,
        height: i32,
        bytes_per_pixel: i32,
        bytes_per_line: i32,
    },
}

/// One operation submitted to the worker.
#[derive(Debug)]
pub enum Command {
    Version,
    IsInitialized,
    Init(InitOptions),
    InitForAnalysePage,
    SetVariable { name: String, value: String },
    SetDebugVariable { name: String, value: String },
    GetIntVariable { name: String },
    GetBoolVariable { name: String },
    GetDoubleVariable { name: String },
    GetStringVariable { name: String },
    SetInputName { name: String },
    GetInputName,
    SetOutputName { name: String },
    GetDataPath,
    SetInputImage { data: Vec<u8> },
    GetInputImage,
    SetPageMode { mode: i32 },
    SetRectangle(Rectangle),
    SetSourceResolution { ppi: i32 },
    GetSourceYResolution,
    SetImage(ImageInput),
    GetThresholdedImage,
    GetThresholdedImageScaleFactor,
    Recognize { monitor: Option<ProgressMonitor> },
    AnalyseLayout { merge_similar_words: bool },
    DetectOrientationScript,
    MeanTextConf,
    AllWordConfidences,
    GetUtf8Text,
    GetHocrText { page: i32, monitor: Option<ProgressMonitor> },
    GetTsvText { page: i32 },
    GetUnlvText,
    GetAltoText { page: i32, monitor: Option<ProgressMonitor> },
    GetPageText { page: i32, monitor: Option<ProgressMonitor> },
    GetLstmBoxText { page: i32 },
    GetBoxText { page: i32 },
    GetWordStrBoxText { page: i32 },
    GetOsdText { page: i32 },
    BeginProcessPages(ProcessPagesOptions),
    AddProcessPage {
        data: Vec<u8>,
        filename: Option<String>,
        monitor: Option<ProgressMonitor>,
    },
    FinishProcessPages,
    AbortProcessPages { reason: Option<String> },
    GetProcessPagesStatus,
    GetInitLanguages,
    GetLoadedLanguages,
    GetAvailableLanguages,
    ClearPersistentCache,
    ClearAdaptiveClassifier,
    Clear,
    End,
}

impl Command {
    /// Host-facing operation name, used in every error this command raises.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::IsInitialized => "isInitialized",
            Self::Init(_) => "init",
            Self::InitForAnalysePage => "initForAnalysePage",
            Self::SetVariable { .. } => "setVariable",
            Self::SetDebugVariable { .. } => "setDebugVariable",
            Self::GetIntVariable { .. } => "getIntVariable",
            Self::GetBoolVariable { .. } => "getBoolVariable",
            Self::GetDoubleVariable { .. } => "getDoubleVariable",
            Self::GetStringVariable { .. } => "getStringVariable",
            Self::SetInputName { .. } => "setInputName",
            Self::GetInputName => "getInputName",
            Self::SetOutputName { .. } => "setOutputName",
            Self::GetDataPath => "getDataPath",
            Self::SetInputImage { .. } => "setInputImage",
            Self::GetInputImage => "getInputImage",
            Self::SetPageMode { .. } => "setPageMode",
            Self::SetRectangle(_) => "setRectangle",
            Self::SetSourceResolution { .. } => "setSourceResolution",
            Self::GetSourceYResolution => "getSourceYResolution",
            Self::SetImage(_) => "setImage",
            Self::GetThresholdedImage => "getThresholdedImage",
            Self::GetThresholdedImageScaleFactor => "getThresholdedImageScaleFactor",
            Self::Recognize { .. } => "recognize",
            Self::AnalyseLayout { .. } => "analyseLayout",
            Self::DetectOrientationScript => "detectOrientationScript",
            Self::MeanTextConf => "meanTextConf",
            Self::AllWordConfidences => "allWordConfidences",
            Self::GetUtf8Text => "getUTF8Text",
            Self::GetHocrText { .. } => "getHOCRText",
            Self::GetTsvText { .. } => "getTSVText",
            Self::GetUnlvText => "getUNLVText",
            Self::GetAltoText { .. } => "getALTOText",
            Self::GetPageText { .. } => "getPAGEText",
            Self::GetLstmBoxText { .. } => "getLSTMBoxText",
            Self::GetBoxText { .. } => "getBoxText",
            Self::GetWordStrBoxText { .. } => "getWordStrBoxText",
            Self::GetOsdText { .. } => "getOSDText",
            Self::BeginProcessPages(_) => "beginProcessPages",
            Self::AddProcessPage { .. } => "addProcessPage",
            Self::FinishProcessPages => "finishProcessPages",
            Self::AbortProcessPages { .. } => "abortProcessPages",
            Self::GetProcessPagesStatus => "getProcessPagesStatus",
            Self::GetInitLanguages => "getInitLanguages",
            Self::GetLoadedLanguages => "getLoadedLanguages",
            Self::GetAvailableLanguages => "getAvailableLanguages",
            Self::ClearPersistentCache => "clearPersistentCache",
            Self::ClearAdaptiveClassifier => "clearAdaptiveClassifier",
            Self::Clear => "clear",
            Self::End => "end",
        }
    }

    /// Whether the command fails with a state error before `init` or after
    /// `end`.
    pub fn requires_init(&self) -> bool {
        !matches!(
            self,
            Self::Version
                | Self::IsInitialized
                | Self::Init(_)
                | Self::SetInputName { .. }
                | Self::GetInputName
                | Self::AbortProcessPages { .. }
                | Self::GetProcessPagesStatus
                | Self::GetAvailableLanguages
                | Self::End
        )
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// Run `command` against the worker-owned engine and session.
pub(crate) fn execute(state: &mut WorkerState, command: Command) -> Result<Value, CommandError> {
    let method = command.name();
    if command.requires_init() && !state.initialized {
        return Err(CommandError::NotInitialized { method });
    }

    match command {
        Command::Version => Ok(Value::String(state.engine.version())),
        Command::IsInitialized => Ok(Value::Bool(state.initialized)),
        Command::Init(options) => config::init(state, options),
        Command::InitForAnalysePage => {
            state.engine.init_for_analyse_page();
            Ok(Value::Void)
        }
        Command::SetVariable { name, value } => {
            config::set_variable(state, method, &name, &value, false)
        }
        Command::SetDebugVariable { name, value } => {
            config::set_variable(state, method, &name, &value, true)
        }
        Command::GetIntVariable { name } => {
            config::get_variable(method, &name, |n| state.engine.int_variable(n).map(Value::Int))
        }
        Command::GetBoolVariable { name } => {
            config::get_variable(method, &name, |n| state.engine.bool_variable(n).map(Value::Bool))
        }
        Command::GetDoubleVariable { name } => config::get_variable(method, &name, |n| {
            state.engine.double_variable(n).map(Value::Double)
        }),
        Command::GetStringVariable { name } => config::get_variable(method, &name, |n| {
            state.engine.string_variable(n).map(Value::String)
        }),
        Command::SetInputName { name } => config::set_input_name(state, method, &name),
        Command::GetInputName => Ok(Value::String(state.engine.input_name().unwrap_or_default())),
        Command::SetOutputName { name } => config::set_output_name(state, method, &name),
        Command::GetDataPath => state
            .engine
            .data_path()
            .map(Value::String)
            .ok_or_else(|| CommandError::engine(method, "engine reported no data path")),
        Command::SetInputImage { data } => input::set_input_image(state, method, &data),
        Command::GetInputImage => input::get_input_image(state, method),
        Command::SetPageMode { mode } => input::set_page_mode(state, method, mode),
        Command::SetRectangle(rect) => input::set_rectangle(state, method, rect),
        Command::SetSourceResolution { ppi } => input::set_source_resolution(state, method, ppi),
        Command::GetSourceYResolution => Ok(Value::Int(state.engine.source_y_resolution())),
        Command::SetImage(image) => input::set_image(state, method, image),
        Command::GetThresholdedImage => input::get_thresholded_image(state, method),
        Command::GetThresholdedImageScaleFactor => {
            Ok(Value::Int(state.engine.thresholded_image_scale_factor()))
        }
        Command::Recognize { monitor } => recognition::recognize(state, method, monitor.as_ref()),
        Command::AnalyseLayout {
            merge_similar_words,
        } => recognition::analyse_layout(state, method, merge_similar_words),
        Command::DetectOrientationScript => recognition::detect_orientation_script(state, method),
        Command::MeanTextConf => Ok(Value::Int(state.engine.mean_text_conf())),
        Command::AllWordConfidences => Ok(Value::from(
            state.engine.all_word_confidences().unwrap_or_default(),
        )),
        Command::GetUtf8Text => recognition::text(state, TextRequest::unpaged(TextFormat::Utf8)),
        Command::GetHocrText { page, monitor } => {
            recognition::text(state, TextRequest::paged(TextFormat::Hocr, page, monitor.as_ref()))
        }
        Command::GetTsvText { page } => {
            recognition::text(state, TextRequest::paged(TextFormat::Tsv, page, None))
        }
        Command::GetUnlvText => recognition::text(state, TextRequest::unpaged(TextFormat::Unlv)),
        Command::GetAltoText { page, monitor } => {
            recognition::text(state, TextRequest::paged(TextFormat::Alto, page, monitor.as_ref()))
        }
        Command::GetPageText { page, monitor } => {
            recognition::text(state, TextRequest::paged(TextFormat::Page, page, monitor.as_ref()))
        }
        Command::GetLstmBoxText { page } => {
            recognition::text(state, TextRequest::paged(TextFormat::LstmBox, page, None))
        }
        Command::GetBoxText { page } => {
            recognition::text(state, TextRequest::paged(TextFormat::Box, page, None))
        }
        Command::GetWordStrBoxText { page } => {
            recognition::text(state, TextRequest::paged(TextFormat::WordStrBox, page, None))
        }
        Command::GetOsdText { page } => {
            recognition::text(state, TextRequest::paged(TextFormat::Osd, page, None))
        }
        Command::BeginProcessPages(options) => {
            let WorkerState {
                engine, session, ..
            } = state;
            session.begin(&**engine, options)?;
            Ok(Value::Void)
        }
        Command::AddProcessPage {
            data,
            filename,
            monitor,
        } => {
            let resolution = state.config.default_resolution;
            let WorkerState {
                engine, session, ..
            } = state;
            session.add_page(
                &mut **engine,
                &data,
                filename.as_deref(),
                monitor.as_ref(),
                resolution,
            )?;
            Ok(Value::Void)
        }
        Command::FinishProcessPages => state.session.finish().map(Value::String),
        Command::AbortProcessPages { reason } => {
            state.session.abort(reason.as_deref());
            Ok(Value::Void)
        }
        Command::GetProcessPagesStatus => Ok(Value::Object(state.session.status().to_object())),
        Command::GetInitLanguages => state
            .engine
            .init_languages()
            .map(Value::String)
            .ok_or_else(|| {
                CommandError::engine(
                    method,
                    "no languages were initialized; call init(...) with at least one valid language",
                )
            }),
        Command::GetLoadedLanguages => Ok(Value::from(state.engine.loaded_languages())),
        Command::GetAvailableLanguages => Ok(Value::from(state.engine.available_languages())),
        Command::ClearPersistentCache => {
            state.engine.clear_persistent_cache();
            Ok(Value::Void)
        }
        Command::ClearAdaptiveClassifier => {
            state.engine.clear_adaptive_classifier();
            Ok(Value::Void)
        }
        Command::Clear => {
            state.engine.clear();
            Ok(Value::Void)
        }
        Command::End => {
            state.end();
            Ok(Value::Void)
        }
    }
}

/// Text rendering requested by one of the `get*Text` commands.
pub(crate) struct TextRequest<'a> {
    pub format: TextFormat,
    pub page: i32,
    pub monitor: Option<&'a ProgressMonitor>,
}

impl<'a> TextRequest<'a> {
    fn unpaged(format: TextFormat) -> Self {
        Self {
            format,
            page: 0,
            monitor: None,
        }
    }

    fn paged(format: TextFormat, page: i32, monitor: Option<&'a ProgressMonitor>) -> Self {
        Self {
            format,
            page,
            monitor,
        }
    }
}
