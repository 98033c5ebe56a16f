// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// FIFO mailbox between submitting threads and the worker thread.
//
// Submitters only hold the mutex long enough to push; the worker parks on the
// condvar while the queue is empty. Once an `end` has been accepted or a stop
// was requested, the queue is closing and further submissions are refused.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::job::Job;

#[derive(Debug, Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    closing: bool,
    stop: bool,
}

/// Thread-safe job FIFO with shutdown semantics.
#[derive(Debug, Default)]
pub(crate) struct JobQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `job`, or hand it back when the queue is closing.
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        let mut state = self.lock();
        if state.closing {
            return Err(job);
        }
        if job.command.is_end() {
            state.closing = true;
        }
        state.jobs.push_back(job);
        debug!(depth = state.jobs.len(), "Job queued");
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Block until a job is available. `None` once a stop was requested.
    pub(crate) fn pop(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if state.stop {
                return None;
            }
            if let Some(job) = state.jobs.pop_front() {
                return Some(job);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Refuse new jobs and wake the worker so it stops after its current job.
    pub(crate) fn request_stop(&self) {
        let mut state = self.lock();
        state.closing = true;
        state.stop = true;
        drop(state);
        self.ready.notify_all();
    }

    /// Close the queue and take every job still waiting.
    pub(crate) fn drain(&self) -> Vec<Job> {
        let mut state = self.lock();
        state.closing = true;
        state.jobs.drain(..).collect()
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.lock().closing
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::command::Command;

    #[test]
    fn fifo_order() {
        let queue = JobQueue::new();
        for name in ["a", "b", "c"] {
            let (job, _completion) = Job::new(Command::SetInputName { name: name.into() });
            queue.push(job).expect("open queue");
        }
        let order: Vec<_> = (0..3)
            .filter_map(|_| queue.pop())
            .map(|job| match job.command {
                Command::SetInputName { name } => name,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn end_closes_the_queue() {
        let queue = JobQueue::new();
        let (end, _c1) = Job::new(Command::End);
        queue.push(end).expect("end accepted");
        assert!(queue.is_closing());

        let (late, _c2) = Job::new(Command::Version);
        let refused = queue.push(late).expect_err("closing");
        assert_eq!(refused.method(), "version");

        let (second_end, _c3) = Job::new(Command::End);
        assert!(queue.push(second_end).is_err());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn stop_wakes_a_waiting_worker() {
        let queue = Arc::new(JobQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop().is_none())
        };
        thread::sleep(Duration::from_millis(20));
        queue.request_stop();
        assert!(waiter.join().expect("worker thread"));
    }

    #[test]
    fn stop_leaves_jobs_for_drain() {
        let queue = JobQueue::new();
        let (job, _completion) = Job::new(Command::Clear);
        queue.push(job).expect("open queue");
        queue.request_stop();
        assert!(queue.pop().is_none());
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].method(), "clear");
        assert_eq!(queue.len(), 0);
    }
}
