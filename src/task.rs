//! Singleton task lifecycle.
//!
//! The cluster host guarantees at most one live downloader across the fleet;
//! this module only models the host-facing handle: cancellation, completion,
//! and the status snapshot. Cancellation is cooperative and observed between
//! cycles, never mid-stream.

use crate::stats::DownloaderStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

#[derive(Default)]
pub(crate) struct TaskFlags {
    cancelled: AtomicBool,
    completed: AtomicBool,
    pub(crate) wake: Notify,
}

impl TaskFlags {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

/// Handle held by the cluster host that allocated the task.
#[derive(Clone)]
pub struct TaskHandle {
    flags: Arc<TaskFlags>,
    status: watch::Receiver<Option<DownloaderStats>>,
}

impl TaskHandle {
    pub(crate) fn new(
        flags: Arc<TaskFlags>,
        status: watch::Receiver<Option<DownloaderStats>>,
    ) -> Self {
        TaskHandle { flags, status }
    }

    /// Revoke ownership: no further cycles run once the current one
    /// (if any) returns.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
        self.flags.wake.notify_waiters();
    }

    /// Mark the task as finished; terminal, like cancellation.
    pub fn complete(&self) {
        self.flags.completed.store(true, Ordering::SeqCst);
        self.flags.wake.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flags.is_cancelled()
    }

    pub fn is_completed(&self) -> bool {
        self.flags.is_completed()
    }

    /// Current stats snapshot; `None` once the task is terminal.
    pub fn status(&self) -> Option<DownloaderStats> {
        if self.flags.is_cancelled() || self.flags.is_completed() {
            return None;
        }
        *self.status.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_hides_status() {
        let flags = Arc::new(TaskFlags::default());
        let (tx, rx) = watch::channel(Some(DownloaderStats::EMPTY));
        let handle = TaskHandle::new(flags, rx);

        assert_eq!(handle.status(), Some(DownloaderStats::EMPTY));
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.status(), None);
        drop(tx);
    }

    #[test]
    fn test_complete_is_terminal() {
        let flags = Arc::new(TaskFlags::default());
        let (_tx, rx) = watch::channel(Some(DownloaderStats::EMPTY));
        let handle = TaskHandle::new(flags, rx);

        handle.complete();
        assert!(handle.is_completed());
        assert!(!handle.is_cancelled());
        assert_eq!(handle.status(), None);
    }
}
