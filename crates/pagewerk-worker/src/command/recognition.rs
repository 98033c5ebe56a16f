// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition, layout analysis and text rendering commands.

use pagewerk_core::error::CommandError;
use pagewerk_core::progress::ProgressMonitor;
use pagewerk_core::value::Value;
use tracing::{debug, instrument};

use super::TextRequest;
use crate::worker::WorkerState;

#[instrument(skip_all)]
pub(super) fn recognize(
    state: &mut WorkerState,
    method: &'static str,
    monitor: Option<&ProgressMonitor>,
) -> Result<Value, CommandError> {
    if !state.engine.recognize(monitor) {
        let reason = if monitor.is_some_and(ProgressMonitor::is_cancelled) {
            "recognition was cancelled"
        } else {
            "engine failed to recognize the image"
        };
        return Err(CommandError::engine(method, reason));
    }
    if let Some(monitor) = monitor {
        debug!(dropped = monitor.dropped(), "Progress updates coalesced");
    }
    Ok(Value::Void)
}

pub(super) fn analyse_layout(
    state: &mut WorkerState,
    method: &'static str,
    merge_similar_words: bool,
) -> Result<Value, CommandError> {
    if !state.engine.analyse_layout(merge_similar_words) {
        return Err(CommandError::engine(method, "engine could not analyse the page layout"));
    }
    Ok(Value::Void)
}

pub(super) fn detect_orientation_script(
    state: &mut WorkerState,
    method: &'static str,
) -> Result<Value, CommandError> {
    state
        .engine
        .detect_orientation_script()
        .map(|osd| Value::Object(osd.to_object()))
        .ok_or_else(|| {
            CommandError::engine(method, "engine could not detect orientation and script")
        })
}

pub(super) fn text(
    state: &mut WorkerState,
    request: TextRequest<'_>,
) -> Result<Value, CommandError> {
    let method = request.format.method();
    let page = u32::try_from(request.page).map_err(|_| CommandError::OutOfRange {
        method,
        what: "page number",
        value: request.page.into(),
    })?;

    state
        .engine
        .text(request.format, page, request.monitor)
        .map(Value::String)
        .ok_or_else(|| CommandError::engine(method, "engine produced no text"))
}
