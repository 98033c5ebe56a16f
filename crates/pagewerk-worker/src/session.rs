// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-pages sessions: one multi-page document rendered page by page.
//
// At most one session exists per worker. Pages are numbered from 0 and the
// counter only advances when the engine accepted the page, so a failed page
// can be retried at the same index.

use chrono::{DateTime, Utc};
use pagewerk_core::engine::{OcrEngine, PageRenderer, PageRequest};
use pagewerk_core::error::CommandError;
use pagewerk_core::progress::ProgressMonitor;
use pagewerk_core::types::{ProcessPagesOptions, SessionStatus};
use pagewerk_document::image::{decode, normalize_page};
use tracing::{debug, info, instrument, warn};

const BEGIN: &str = "beginProcessPages";
const ADD: &str = "addProcessPage";
const FINISH: &str = "finishProcessPages";

/// An open document being rendered.
pub struct ProcessPagesSession {
    renderer: Box<dyn PageRenderer>,
    output_base: String,
    timeout_ms: u32,
    textonly: bool,
    next_page_index: u32,
    started_at: DateTime<Utc>,
}

impl ProcessPagesSession {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            active: true,
            healthy: self.renderer.is_healthy(),
            processed_pages: self.next_page_index,
            next_page_index: self.next_page_index,
            output_base: self.output_base.clone(),
            timeout_millisec: self.timeout_ms,
            textonly: self.textonly,
            started_at: Some(self.started_at),
        }
    }
}

/// Whether a process-pages session is open.
#[derive(Default)]
pub enum SessionState {
    #[default]
    Absent,
    Active(ProcessPagesSession),
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    fn active_mut(
        &mut self,
        method: &'static str,
    ) -> Result<&mut ProcessPagesSession, CommandError> {
        match self {
            Self::Active(session) => Ok(session),
            Self::Absent => Err(CommandError::invalid_state(
                method,
                "called without an active session",
            )),
        }
    }

    /// Open a session. An already active session is left untouched.
    #[instrument(skip_all, fields(title = %options.title))]
    pub fn begin(
        &mut self,
        engine: &dyn OcrEngine,
        options: ProcessPagesOptions,
    ) -> Result<(), CommandError> {
        if self.is_active() {
            return Err(CommandError::invalid_state(
                BEGIN,
                "called while a session is already active",
            ));
        }
        if options.title.is_empty() {
            return Err(CommandError::invalid_argument(BEGIN, "title cannot be empty"));
        }

        let output_base = options
            .output_base
            .filter(|base| !base.is_empty())
            .or_else(|| engine.input_name().filter(|name| !name.is_empty()))
            .ok_or_else(|| {
                CommandError::invalid_argument(
                    BEGIN,
                    "output_base is empty and the engine has no input name",
                )
            })?;

        let mut renderer = engine.create_renderer(&output_base, options.textonly);
        if !renderer.is_healthy() {
            return Err(CommandError::engine(BEGIN, "renderer is not healthy"));
        }
        if !renderer.begin_document(&options.title) {
            return Err(CommandError::engine(BEGIN, "could not begin document"));
        }

        info!(
            output_base = %output_base,
            textonly = options.textonly,
            timeout_ms = options.timeout,
            "Process-pages session begun"
        );
        *self = Self::Active(ProcessPagesSession {
            renderer,
            output_base,
            timeout_ms: options.timeout,
            textonly: options.textonly,
            next_page_index: 0,
            started_at: Utc::now(),
        });
        Ok(())
    }

    /// Decode, normalize and render one page. Returns the index it was
    /// rendered at.
    #[instrument(skip_all, fields(bytes = data.len()))]
    pub fn add_page(
        &mut self,
        engine: &mut dyn OcrEngine,
        data: &[u8],
        filename: Option<&str>,
        monitor: Option<&ProgressMonitor>,
        default_resolution: u32,
    ) -> Result<u32, CommandError> {
        if data.is_empty() {
            return Err(CommandError::invalid_argument(ADD, "buffer is empty"));
        }
        let session = self.active_mut(ADD)?;
        if !session.renderer.is_healthy() {
            return Err(CommandError::engine(ADD, "renderer is not healthy"));
        }

        let raster = decode(data)
            .and_then(|raster| normalize_page(raster, default_resolution))
            .map_err(|err| CommandError::from_library(ADD, &err))?;

        let index = session.next_page_index;
        let request = PageRequest {
            image: raster,
            index,
            filename: filename.filter(|name| !name.is_empty()),
            timeout_ms: session.timeout_ms,
            monitor,
        };
        if !engine.process_page(request, session.renderer.as_mut()) {
            warn!(index, "Page was not processed");
            return Err(CommandError::Engine {
                method: ADD,
                reason: format!("ProcessPage failed at page {index}"),
                page: Some(index),
            });
        }

        session.next_page_index += 1;
        debug!(index, "Page added");
        Ok(index)
    }

    /// Finalize the document and return its path. Once finalization has been
    /// attempted the session is closed whether or not it succeeded. An
    /// unhealthy renderer is reported without closing the session.
    #[instrument(skip_all)]
    pub fn finish(&mut self) -> Result<String, CommandError> {
        let session = self.active_mut(FINISH)?;
        if !session.renderer.is_healthy() {
            return Err(CommandError::engine(FINISH, "renderer is not healthy"));
        }

        let finalized = session.renderer.end_document();
        let path = format!("{}.{}", session.output_base, session.renderer.extension());
        let pages = session.next_page_index;
        *self = Self::Absent;

        if !finalized {
            return Err(CommandError::engine(FINISH, "could not finalize document"));
        }
        info!(path = %path, pages, "Process-pages session finished");
        Ok(path)
    }

    /// Drop any open session without finalizing it. Returns whether one was
    /// open.
    pub fn abort(&mut self, reason: Option<&str>) -> bool {
        match std::mem::take(self) {
            Self::Active(session) => {
                warn!(
                    output_base = %session.output_base,
                    pages = session.next_page_index,
                    reason = reason.unwrap_or("none given"),
                    "Process-pages session aborted"
                );
                true
            }
            Self::Absent => {
                debug!("Abort requested without an active session");
                false
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Active(session) => session.status(),
            Self::Absent => SessionStatus::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEngine, encoded_page};

    fn options(title: &str, output_base: Option<&str>) -> ProcessPagesOptions {
        ProcessPagesOptions {
            output_base: output_base.map(String::from),
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn begin_requires_title_and_output_base() {
        let engine = FakeEngine::default();
        let mut state = SessionState::default();

        let err = state.begin(&engine, options("", Some("out"))).expect_err("empty title");
        assert_eq!(err.to_string(), "beginProcessPages: title cannot be empty");

        let err = state.begin(&engine, options("doc", None)).expect_err("no output base");
        assert_eq!(err.method(), "beginProcessPages");
        assert_eq!(err.code(), pagewerk_core::ErrorCode::InvalidArgument);
        assert!(!state.is_active());
    }

    #[test]
    fn begin_falls_back_to_input_name() {
        let mut engine = FakeEngine::default();
        engine.set_input_name("scan-001");
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", None)).expect("begin");
        assert_eq!(state.status().output_base, "scan-001");
    }

    #[test]
    fn second_begin_leaves_session_untouched() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("first"))).expect("begin");
        state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect("page");

        let err = state
            .begin(&engine, options("doc", Some("second")))
            .expect_err("already active");
        assert_eq!(err.kind(), pagewerk_core::ErrorKind::State);

        let status = state.status();
        assert_eq!(status.output_base, "first");
        assert_eq!(status.next_page_index, 1);
    }

    #[test]
    fn page_index_advances_only_on_success() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");

        assert_eq!(state.add_page(&mut engine, &encoded_page(), None, None, 300), Ok(0));
        engine.fail_next_page();
        let err = state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect_err("engine rejects page");
        assert_eq!(err.page(), Some(1));
        assert_eq!(err.to_string(), "addProcessPage: ProcessPage failed at page 1");
        assert_eq!(state.add_page(&mut engine, &encoded_page(), None, None, 300), Ok(1));
        assert_eq!(state.status().processed_pages, 2);
    }

    #[test]
    fn empty_buffer_is_rejected_before_session_check() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        let err = state
            .add_page(&mut engine, &[], None, None, 300)
            .expect_err("empty buffer");
        assert_eq!(err.to_string(), "addProcessPage: buffer is empty");

        let err = state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect_err("no session");
        assert_eq!(err.kind(), pagewerk_core::ErrorKind::State);
    }

    #[test]
    fn undecodable_page_keeps_index() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");
        let err = state
            .add_page(&mut engine, b"not an image", None, None, 300)
            .expect_err("garbage");
        assert!(err.to_string().starts_with("addProcessPage: image processing failed"));
        assert_eq!(err.code(), pagewerk_core::ErrorCode::EngineRuntime);
        assert_eq!(state.status().next_page_index, 0);
    }

    #[test]
    fn pages_are_normalized_before_processing() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");
        state
            .add_page(&mut engine, &encoded_page(), Some("p.png"), None, 240)
            .expect("page");

        let page = engine.last_page().expect("page recorded");
        assert_eq!(page.resolution, (240, 240));
        assert!(!page.has_alpha);
        assert_eq!(page.filename.as_deref(), Some("p.png"));
    }

    #[test]
    fn finish_returns_path_and_closes() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("/tmp/book"))).expect("begin");
        state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect("page");

        assert_eq!(state.finish().as_deref(), Ok("/tmp/book.pdf"));
        assert!(!state.is_active());
        assert_eq!(state.finish().map_err(|e| e.kind()), Err(pagewerk_core::ErrorKind::State));
    }

    #[test]
    fn failed_finalize_still_closes_session() {
        let mut engine = FakeEngine::default();
        engine.fail_end_document();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");
        let err = state.finish().expect_err("finalize fails");
        assert_eq!(err.to_string(), "finishProcessPages: could not finalize document");
        assert!(!state.is_active());
    }

    #[test]
    fn unhealthy_renderer_rejects_pages() {
        let mut engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");
        state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect("page 0");

        engine.break_renderer();
        assert!(!state.status().healthy);
        let err = state
            .add_page(&mut engine, &encoded_page(), None, None, 300)
            .expect_err("renderer is broken");
        assert_eq!(err.to_string(), "addProcessPage: renderer is not healthy");
        assert_eq!(err.code(), pagewerk_core::ErrorCode::EngineRuntime);
        assert_eq!(state.status().next_page_index, 1);
        assert_eq!(engine.pages().len(), 1);
    }

    #[test]
    fn unhealthy_renderer_keeps_session_open_on_finish() {
        let engine = FakeEngine::default();
        let mut state = SessionState::default();
        state.begin(&engine, options("doc", Some("out"))).expect("begin");

        engine.break_renderer();
        let err = state.finish().expect_err("renderer is broken");
        assert_eq!(err.to_string(), "finishProcessPages: renderer is not healthy");
        assert_eq!(err.code(), pagewerk_core::ErrorCode::EngineRuntime);
        assert!(state.is_active());
        assert_eq!(state.status().output_base, "out");

        assert!(state.abort(Some("renderer failed")));
        assert!(!state.is_active());
    }

    #[test]
    fn abort_and_idle_status() {
        let engine = FakeEngine::default();
        let mut state = SessionState::default();
        assert!(!state.abort(None));

        let idle = state.status();
        assert!(!idle.active);
        assert!(!idle.healthy);
        assert_eq!(idle.output_base, "");
        assert!(idle.started_at.is_none());

        state.begin(&engine, options("doc", Some("out"))).expect("begin");
        let active = state.status();
        assert!(active.active && active.healthy);
        assert!(active.started_at.is_some());

        assert!(state.abort(Some("user cancelled")));
        assert!(!state.status().active);
    }
}
