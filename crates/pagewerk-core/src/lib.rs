// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk core: types, engine boundary and error definitions shared across
// all crates.

pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod raster;
pub mod types;
pub mod value;

pub use config::WorkerConfig;
pub use engine::{EngineInit, OcrEngine, PageRenderer, PageRequest, RenderedPage};
pub use error::{CommandError, ErrorCode, ErrorKind, PagewerkError};
pub use progress::{Progress, ProgressMonitor};
pub use raster::Raster;
pub use types::*;
pub use value::{ArrayValue, Object, ObjectValue, Value};
