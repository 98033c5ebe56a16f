// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting and cooperative cancellation for long-running calls.
//
// The worker side holds a `ProgressMonitor` and never blocks: updates go
// through a bounded channel with `try_send`, so when the caller falls behind
// newer updates are dropped. The caller side holds a `Progress` and may ask
// the engine to stop early.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::types::ProgressInfo;

/// Create a linked monitor/receiver pair holding at most `capacity` pending
/// updates.
pub fn channel(capacity: usize) -> (ProgressMonitor, Progress) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = Arc::new(AtomicBool::new(false));
    (
        ProgressMonitor {
            tx,
            cancel: Arc::clone(&cancel),
            dropped: AtomicU64::new(0),
        },
        Progress { rx, cancel },
    )
}

/// Worker-side half. Passed to the engine for the duration of one call.
#[derive(Debug)]
pub struct ProgressMonitor {
    tx: mpsc::Sender<ProgressInfo>,
    cancel: Arc<AtomicBool>,
    dropped: AtomicU64,
}

impl ProgressMonitor {
    /// Offer an update. Returns `false` when it was coalesced away because the
    /// receiver is full or gone.
    pub fn report(&self, info: ProgressInfo) -> bool {
        match self.tx.try_send(info) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Whether the caller asked the engine to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Updates that were not delivered.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Caller-side half.
#[derive(Debug)]
pub struct Progress {
    rx: mpsc::Receiver<ProgressInfo>,
    cancel: Arc<AtomicBool>,
}

impl Progress {
    /// Wait for the next update. `None` once the call has finished.
    pub async fn next(&mut self) -> Option<ProgressInfo> {
        self.rx.recv().await
    }

    /// Blocking variant for callers outside an async runtime.
    pub fn blocking_next(&mut self) -> Option<ProgressInfo> {
        self.rx.blocking_recv()
    }

    /// Take an update if one is pending.
    pub fn try_next(&mut self) -> Option<ProgressInfo> {
        self.rx.try_recv().ok()
    }

    /// Ask the engine to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(percent: i32) -> ProgressInfo {
        ProgressInfo {
            percent,
            ocr_alive: true,
            ..Default::default()
        }
    }

    #[test]
    fn full_channel_coalesces_without_blocking() {
        let (monitor, mut progress) = channel(1);
        assert!(monitor.report(at(10)));
        assert!(!monitor.report(at(20)));
        assert!(!monitor.report(at(30)));
        assert_eq!(monitor.dropped(), 2);

        assert_eq!(progress.try_next().map(|p| p.percent), Some(10));
        assert!(monitor.report(at(40)));
        assert_eq!(progress.try_next().map(|p| p.percent), Some(40));
        assert!(progress.try_next().is_none());
    }

    #[test]
    fn cancel_is_visible_to_monitor() {
        let (monitor, progress) = channel(1);
        assert!(!monitor.is_cancelled());
        progress.cancel();
        assert!(monitor.is_cancelled());
    }

    #[tokio::test]
    async fn stream_ends_when_monitor_drops() {
        let (monitor, mut progress) = channel(4);
        monitor.report(at(50));
        drop(monitor);
        assert_eq!(progress.next().await.map(|p| p.percent), Some(50));
        assert!(progress.next().await.is_none());
    }
}
