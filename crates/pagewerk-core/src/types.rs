// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared by the worker, the engine boundary and host glue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::{Object, ObjectValue};

/// Unique identifier for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page segmentation modes understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PageSegMode {
    /// Orientation and script detection only.
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    /// Fully automatic segmentation without OSD. The engine default.
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertText = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl PageSegMode {
    /// Number of defined modes; valid raw values are `0..COUNT`.
    pub const COUNT: i32 = 14;
}

impl TryFrom<i32> for PageSegMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::OsdOnly,
            1 => Self::AutoOsd,
            2 => Self::AutoOnly,
            3 => Self::Auto,
            4 => Self::SingleColumn,
            5 => Self::SingleBlockVertText,
            6 => Self::SingleBlock,
            7 => Self::SingleLine,
            8 => Self::SingleWord,
            9 => Self::CircleWord,
            10 => Self::SingleChar,
            11 => Self::SparseText,
            12 => Self::SparseTextOsd,
            13 => Self::RawLine,
            other => return Err(other),
        })
    }
}

/// OCR engine modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i32)]
pub enum EngineMode {
    LegacyOnly = 0,
    LstmOnly = 1,
    LegacyLstmCombined = 2,
    #[default]
    Default = 3,
}

impl EngineMode {
    pub const COUNT: i32 = 4;
}

impl TryFrom<i32> for EngineMode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::LegacyOnly,
            1 => Self::LstmOnly,
            2 => Self::LegacyLstmCombined,
            3 => Self::Default,
            other => return Err(other),
        })
    }
}

/// Options accepted by `init`, as sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitOptions {
    /// Directory holding language/model data. Falls back to the worker config.
    pub data_path: Option<String>,
    /// Languages to load; joined with `+` for the engine.
    pub langs: Vec<String>,
    /// Raw engine mode; validated against [`EngineMode`].
    pub oem: Option<i32>,
    /// Config files applied after loading.
    pub configs: Vec<String>,
    /// Variable names applied at init. Paired with `vars_values`.
    pub vars_vec: Vec<String>,
    pub vars_values: Vec<String>,
    pub set_only_non_debug_params: bool,
}

/// Options accepted by `beginProcessPages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessPagesOptions {
    /// Output path without extension. Defaults to the engine's input name.
    pub output_base: Option<String>,
    pub title: String,
    /// Per-page recognition timeout; 0 disables it.
    pub timeout: u32,
    /// Render recognised text only, without the page image.
    pub textonly: bool,
}

/// Region of interest passed to `setRectangle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Axis-aligned pixel box, edges inclusive of `left`/`top` and exclusive of
/// `right`/`bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// A recognised word with its location on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    pub text: String,
    pub bbox: BoundingBox,
    /// 0..=100.
    pub confidence: f32,
    /// Line the word belongs to, counted from the top of the page.
    pub line: u32,
}

/// Orientation and script detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationScript {
    pub orientation_degrees: i32,
    pub orientation_confidence: f32,
    pub script_name: String,
    pub script_confidence: f32,
}

impl OrientationScript {
    pub fn to_object(&self) -> Object {
        let mut obj = Object::new();
        obj.insert(
            "orientationDegrees".into(),
            ObjectValue::Int(self.orientation_degrees),
        );
        obj.insert(
            "orientationConfidence".into(),
            ObjectValue::Float(self.orientation_confidence),
        );
        obj.insert(
            "scriptName".into(),
            ObjectValue::String(self.script_name.clone()),
        );
        obj.insert(
            "scriptConfidence".into(),
            ObjectValue::Float(self.script_confidence),
        );
        obj
    }
}

/// Snapshot of engine progress during a long-running call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    /// Raw progress counter reported by the engine.
    pub progress: i32,
    /// 0..=100.
    pub percent: i32,
    pub ocr_alive: bool,
    /// Bounding box of the word currently being processed.
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Snapshot returned by `getProcessPagesStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub active: bool,
    pub healthy: bool,
    pub processed_pages: u32,
    pub next_page_index: u32,
    pub output_base: String,
    pub timeout_millisec: u32,
    pub textonly: bool,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionStatus {
    pub fn to_object(&self) -> Object {
        let mut obj = Object::new();
        obj.insert("active".into(), ObjectValue::Bool(self.active));
        obj.insert("healthy".into(), ObjectValue::Bool(self.healthy));
        obj.insert(
            "processedPages".into(),
            ObjectValue::Int(clamp_i32(self.processed_pages)),
        );
        obj.insert(
            "nextPageIndex".into(),
            ObjectValue::Int(clamp_i32(self.next_page_index)),
        );
        obj.insert(
            "outputBase".into(),
            ObjectValue::String(self.output_base.clone()),
        );
        obj.insert(
            "timeoutMillisec".into(),
            ObjectValue::Int(clamp_i32(self.timeout_millisec)),
        );
        obj.insert("textonly".into(), ObjectValue::Bool(self.textonly));
        obj.insert(
            "startedAt".into(),
            ObjectValue::String(
                self.started_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ),
        );
        obj
    }
}

fn clamp_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Text renderings the engine can produce for the last recognised page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextFormat {
    Utf8,
    Hocr,
    Tsv,
    Unlv,
    Alto,
    Page,
    LstmBox,
    Box,
    WordStrBox,
    Osd,
}

impl TextFormat {
    /// Host-facing operation name that produces this format.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Utf8 => "getUTF8Text",
            Self::Hocr => "getHOCRText",
            Self::Tsv => "getTSVText",
            Self::Unlv => "getUNLVText",
            Self::Alto => "getALTOText",
            Self::Page => "getPAGEText",
            Self::LstmBox => "getLSTMBoxText",
            Self::Box => "getBoxText",
            Self::WordStrBox => "getWordStrBoxText",
            Self::Osd => "getOSDText",
        }
    }

    /// Whether the rendering takes a page number.
    pub fn is_paged(&self) -> bool {
        !matches!(self, Self::Utf8 | Self::Unlv)
    }
}
