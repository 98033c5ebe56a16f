// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Jobs and their completion handles.
//
// A `Job` pairs a command with the sending half of a oneshot channel. Every
// way of finishing a job (`resolve`, `reject`) consumes it, so a handle is
// resolved at most once. A job dropped unresolved closes the channel and the
// caller sees `CommandError::Disconnected` rather than waiting forever.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use pagewerk_core::error::CommandError;
use pagewerk_core::types::JobId;
use pagewerk_core::value::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::command::Command;

/// Outcome delivered to a caller.
pub type Outcome = Result<Value, CommandError>;

/// A command waiting for, or being run by, the worker.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: JobId,
    pub(crate) command: Command,
    pub(crate) submitted_at: Instant,
    reply: oneshot::Sender<Outcome>,
}

impl Job {
    pub(crate) fn new(command: Command) -> (Self, Completion) {
        let (reply, rx) = oneshot::channel();
        let id = JobId::new();
        let completion = Completion {
            id,
            method: command.name(),
            rx,
        };
        let job = Self {
            id,
            command,
            submitted_at: Instant::now(),
            reply,
        };
        (job, completion)
    }

    pub(crate) fn method(&self) -> &'static str {
        self.command.name()
    }

    /// Split off the command for execution, keeping the reply half.
    pub(crate) fn take(self) -> (Command, Responder) {
        (
            self.command,
            Responder {
                id: self.id,
                reply: self.reply,
            },
        )
    }

    /// Finish the job without running it.
    pub(crate) fn reject(self, error: CommandError) {
        let (_, responder) = self.take();
        responder.resolve(Err(error));
    }
}

/// Reply half of a job whose command has been taken for execution.
#[derive(Debug)]
pub(crate) struct Responder {
    id: JobId,
    reply: oneshot::Sender<Outcome>,
}

impl Responder {
    pub(crate) fn resolve(self, outcome: Outcome) {
        if self.reply.send(outcome).is_err() {
            debug!(job_id = %self.id, "Caller dropped the completion handle");
        }
    }
}

/// Caller-side handle for one submitted command.
///
/// Await it from async code, or call [`wait`](Self::wait) from a plain
/// thread. `wait` must not be called from inside an async runtime.
#[derive(Debug)]
#[must_use = "a completion does nothing unless awaited or waited on"]
pub struct Completion {
    id: JobId,
    method: &'static str,
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Operation name of the submitted command.
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Block the current thread until the worker resolves the job.
    pub fn wait(self) -> Outcome {
        let method = self.method;
        self.rx
            .blocking_recv()
            .unwrap_or(Err(CommandError::Disconnected { method }))
    }

    /// Take the outcome if the job has already been resolved.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CommandError::Disconnected {
                method: self.method,
            })),
        }
    }
}

impl Future for Completion {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let method = self.method;
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CommandError::Disconnected { method })))
    }
}
