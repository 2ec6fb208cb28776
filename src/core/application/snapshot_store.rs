//! Latest-snapshot holder for one server.

use crate::core::domain::model::snapshot::Snapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::watch;

/// How current a server's published data is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The last cycle succeeded.
    Fresh,
    /// A snapshot exists but recent cycles failed.
    Stale { failed_cycles: u32 },
    /// No snapshot yet, or too many consecutive failures.
    Unavailable,
}

/// Single-writer, multi-reader holder of the latest [`Snapshot`].
///
/// Publication is one reference swap inside a `watch` channel: readers
/// clone an `Arc` and see either the previous or the new snapshot in full.
/// Subscribers are woken on every publication.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
    failed_cycles: AtomicU32,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(StoreInner {
                tx,
                failed_cycles: AtomicU32::new(0),
            }),
        }
    }

    /// The latest complete snapshot, if any cycle has succeeded yet.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.inner.tx.borrow().clone()
    }

    /// A receiver notified each time a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.tx.subscribe()
    }

    /// Replaces the current snapshot and resets the failure count.
    pub(crate) fn publish(&self, snapshot: Snapshot) {
        self.inner.failed_cycles.store(0, Ordering::Release);
        self.inner.tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Records a failed cycle; the previous snapshot stays published.
    pub(crate) fn record_failure(&self) -> u32 {
        self.inner.failed_cycles.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn failed_cycles(&self) -> u32 {
        self.inner.failed_cycles.load(Ordering::Acquire)
    }

    /// Classifies the store against `threshold` consecutive failed cycles.
    pub fn availability(&self, threshold: u32) -> Availability {
        let failed = self.failed_cycles();
        match self.latest() {
            None => Availability::Unavailable,
            Some(_) if failed == 0 => Availability::Fresh,
            Some(_) if failed < threshold.max(1) => Availability::Stale {
                failed_cycles: failed,
            },
            Some(_) => Availability::Unavailable,
        }
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
