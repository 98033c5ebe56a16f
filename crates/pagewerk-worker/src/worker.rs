// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The worker thread: sole owner of the engine and the process-pages session.
//
// The engine is built on the worker thread from a factory, so it never has to
// cross threads. Jobs run one at a time in submission order; a panic inside a
// command is caught and reported as `CommandError::Unexpected`. After `end`
// or a stop request the remaining jobs are rejected and the engine is ended.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pagewerk_core::config::WorkerConfig;
use pagewerk_core::engine::OcrEngine;
use pagewerk_core::error::{CommandError, PagewerkError, Result};
use tracing::{debug, error, info, instrument, warn};

use crate::command;
use crate::job::Job;
use crate::queue::JobQueue;
use crate::session::SessionState;

/// Everything the worker thread owns.
pub(crate) struct WorkerState {
    pub(crate) engine: Box<dyn OcrEngine>,
    pub(crate) initialized: bool,
    pub(crate) session: SessionState,
    pub(crate) config: Arc<WorkerConfig>,
    ended: bool,
}

impl WorkerState {
    pub(crate) fn new(engine: Box<dyn OcrEngine>, config: Arc<WorkerConfig>) -> Self {
        Self {
            engine,
            initialized: false,
            session: SessionState::Absent,
            config,
            ended: false,
        }
    }

    /// Discard any session, end the engine and leave the initialized state.
    pub(crate) fn end(&mut self) {
        if self.session.is_active() {
            warn!("Discarding active process-pages session at end");
            self.session.abort(Some("worker ended"));
        }
        if !self.ended {
            self.engine.end();
            self.ended = true;
        }
        self.initialized = false;
        info!("Engine ended");
    }
}

/// Start the worker thread.
#[instrument(skip_all, fields(thread = %config.thread_name))]
pub(crate) fn spawn<E, F>(
    config: Arc<WorkerConfig>,
    queue: Arc<JobQueue>,
    factory: F,
) -> Result<JoinHandle<()>>
where
    F: FnOnce() -> E + Send + 'static,
    E: OcrEngine + 'static,
{
    let thread_config = Arc::clone(&config);
    thread::Builder::new()
        .name(config.thread_name.clone())
        .spawn(move || {
            let engine = match panic::catch_unwind(AssertUnwindSafe(factory)) {
                Ok(engine) => engine,
                Err(payload) => {
                    error!(panic = %panic_message(&*payload), "Engine construction panicked");
                    queue.request_stop();
                    reject_remaining(&queue);
                    return;
                }
            };
            let state = WorkerState::new(Box::new(engine), thread_config);
            run(state, &queue);
        })
        .map_err(|err| PagewerkError::Worker(format!("failed to spawn worker thread: {err}")))
}

fn run(mut state: WorkerState, queue: &JobQueue) {
    info!("Worker started");
    while let Some(job) = queue.pop() {
        let is_end = job.command.is_end();
        execute_job(&mut state, job);
        if is_end {
            break;
        }
    }

    reject_remaining(queue);
    if !state.ended {
        state.engine.end();
    }
    info!("Worker stopped");
}

/// Run one job and resolve its handle.
fn execute_job(state: &mut WorkerState, job: Job) {
    let waited = job.submitted_at.elapsed();
    let job_id = job.id;
    let (command, responder) = job.take();
    let method = command.name();
    debug!(%job_id, method, waited_us = waited.as_micros() as u64, "Dispatching job");

    let outcome = match panic::catch_unwind(AssertUnwindSafe(|| command::execute(state, command))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            error!(%job_id, method, panic = %panic_message(&*payload), "Command panicked");
            Err(CommandError::Unexpected { method })
        }
    };

    if let Err(err) = &outcome {
        warn!(%job_id, code = %err.code(), error = %err, "Command failed");
    }
    responder.resolve(outcome);
}

fn reject_remaining(queue: &JobQueue) {
    for job in queue.drain() {
        let method = job.method();
        warn!(job_id = %job.id, method, "Rejecting job after shutdown");
        job.reject(CommandError::Stopped { method });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::testing::{CallLog, FakeEngine};

    fn state_with(log: &Arc<CallLog>) -> WorkerState {
        WorkerState::new(
            Box::new(FakeEngine::with_log(Arc::clone(log))),
            Arc::new(WorkerConfig::default()),
        )
    }

    #[test]
    fn panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }

    #[test]
    fn end_runs_the_engine_end_once() {
        let log = Arc::new(CallLog::default());
        let queue = JobQueue::new();
        let (job, end) = Job::new(Command::End);
        queue.push(job).expect("open queue");

        run(state_with(&log), &queue);
        assert!(end.wait().is_ok());
        assert_eq!(log.count("end"), 1);
    }

    #[test]
    fn stop_without_end_still_ends_engine() {
        let log = Arc::new(CallLog::default());
        let queue = JobQueue::new();
        let (job, pending) = Job::new(Command::Version);
        queue.push(job).expect("open queue");
        queue.request_stop();

        run(state_with(&log), &queue);
        assert_eq!(
            pending.wait(),
            Err(CommandError::Stopped { method: "version" })
        );
        assert_eq!(log.calls(), ["end"]);
    }
}
