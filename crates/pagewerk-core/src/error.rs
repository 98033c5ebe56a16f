// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagewerk.
//
// `PagewerkError` covers library-level failures (decoding, rendering, model
// loading, I/O). `CommandError` is what a caller sees when a submitted command
// fails: every variant names the operation it came from and classifies into
// an `ErrorKind` and a stable `ErrorCode`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Pagewerk library operations.
#[derive(Debug, Error)]
pub enum PagewerkError {
    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Worker --
    #[error("worker error: {0}")]
    Worker(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagewerkError>;

/// Failure taxonomy for command outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad input detected before the engine was touched.
    Precondition,
    /// The operation is not valid in the current worker/session state.
    State,
    /// The engine reported failure.
    NativeCall,
    /// A panic or lost completion. The message is deliberately generic.
    Unexpected,
    /// The worker is closing or has stopped.
    Shutdown,
}

/// Machine-readable error codes handed to host glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "ERR_INVALID_ARGUMENT")]
    InvalidArgument,
    #[serde(rename = "ERR_OUT_OF_RANGE")]
    OutOfRange,
    #[serde(rename = "ERR_NOT_INITIALIZED")]
    NotInitialized,
    #[serde(rename = "ERR_INVALID_STATE")]
    InvalidState,
    #[serde(rename = "ERR_NOT_FOUND")]
    NotFound,
    #[serde(rename = "ERR_ENGINE_RUNTIME")]
    EngineRuntime,
    #[serde(rename = "ERR_UNEXPECTED")]
    Unexpected,
    #[serde(rename = "ERR_WORKER_STOPPED")]
    WorkerStopped,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "ERR_INVALID_ARGUMENT",
            Self::OutOfRange => "ERR_OUT_OF_RANGE",
            Self::NotInitialized => "ERR_NOT_INITIALIZED",
            Self::InvalidState => "ERR_INVALID_STATE",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::EngineRuntime => "ERR_ENGINE_RUNTIME",
            Self::Unexpected => "ERR_UNEXPECTED",
            Self::WorkerStopped => "ERR_WORKER_STOPPED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error delivered through a command's completion handle.
///
/// `method` is the host-facing operation name (`"getIntVariable"`,
/// `"addProcessPage"`, ...) so that the message always identifies the failing
/// call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{method}: {reason}")]
    InvalidArgument { method: &'static str, reason: String },

    #[error("{method}: {what} is out of range; received {value}")]
    OutOfRange {
        method: &'static str,
        what: &'static str,
        value: i64,
    },

    #[error("{method}: call init(...) first")]
    NotInitialized { method: &'static str },

    #[error("{method}: {reason}")]
    InvalidState { method: &'static str, reason: String },

    #[error("{method}: variable '{name}' was not found")]
    NotFound { method: &'static str, name: String },

    #[error("{method}: {reason}")]
    Engine {
        method: &'static str,
        reason: String,
        page: Option<u32>,
    },

    #[error("{method}: Something unexpected happened")]
    Unexpected { method: &'static str },

    #[error("{method}: result was dropped before the worker resolved it")]
    Disconnected { method: &'static str },

    #[error("{method}: Worker is closing")]
    Closing { method: &'static str },

    #[error("{method}: Worker stopped accepting new commands")]
    Stopped { method: &'static str },
}

impl CommandError {
    pub fn invalid_argument(method: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            method,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(method: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            method,
            reason: reason.into(),
        }
    }

    pub fn engine(method: &'static str, reason: impl Into<String>) -> Self {
        Self::Engine {
            method,
            reason: reason.into(),
            page: None,
        }
    }

    /// Operation name the error belongs to.
    pub fn method(&self) -> &'static str {
        match self {
            Self::InvalidArgument { method, .. }
            | Self::OutOfRange { method, .. }
            | Self::NotInitialized { method }
            | Self::InvalidState { method, .. }
            | Self::NotFound { method, .. }
            | Self::Engine { method, .. }
            | Self::Unexpected { method }
            | Self::Disconnected { method }
            | Self::Closing { method }
            | Self::Stopped { method } => method,
        }
    }

    /// Classify the error into the failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } | Self::OutOfRange { .. } => ErrorKind::Precondition,
            Self::NotInitialized { .. } | Self::InvalidState { .. } => ErrorKind::State,
            Self::NotFound { .. } | Self::Engine { .. } => ErrorKind::NativeCall,
            Self::Unexpected { .. } | Self::Disconnected { .. } => ErrorKind::Unexpected,
            Self::Closing { .. } | Self::Stopped { .. } => ErrorKind::Shutdown,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::OutOfRange { .. } => ErrorCode::OutOfRange,
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Engine { .. } => ErrorCode::EngineRuntime,
            Self::Unexpected { .. } | Self::Disconnected { .. } => ErrorCode::Unexpected,
            Self::Closing { .. } | Self::Stopped { .. } => ErrorCode::WorkerStopped,
        }
    }

    /// Page index attached to a failed page submission, if any.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Engine { page, .. } => *page,
            _ => None,
        }
    }

    /// Wrap a library error raised while executing `method`.
    pub fn from_library(method: &'static str, err: &PagewerkError) -> Self {
        match err {
            PagewerkError::Config(reason) => Self::invalid_argument(method, reason.clone()),
            other => Self::engine(method, other.to_string()),
        }
    }
}
