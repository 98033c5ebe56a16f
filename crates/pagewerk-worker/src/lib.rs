// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk Worker: the closed command set, a single-thread OCR worker that
// owns the engine, its FIFO job queue, and process-pages sessions. Callers
// on any thread submit commands and receive a `Completion` per command.

pub mod client;
pub mod command;
pub mod job;
mod queue;
mod session;
mod worker;

#[cfg(test)]
mod testing;

pub use client::{Document, OcrWorker};
pub use command::{Command, ImageInput};
pub use job::{Completion, Outcome};
