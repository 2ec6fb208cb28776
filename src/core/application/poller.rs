//! Periodic driver: one non-overlapping fetch loop per server.

use crate::core::application::{snapshot_fetcher::SnapshotFetcher, snapshot_store::SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Handle to a running poll loop.
///
/// Cycles run strictly one after another inside a single task, so a cycle
/// that overruns the interval delays the next one instead of overlapping it.
#[derive(Debug)]
pub struct PollerHandle {
    refresh: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Starts polling immediately, then every `interval`.
    pub fn spawn(fetcher: SnapshotFetcher, store: SnapshotStore, interval: Duration) -> Self {
        let refresh = Arc::new(Notify::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(fetcher, store, interval, refresh.clone(), shutdown_rx));
        Self {
            refresh,
            shutdown,
            task,
        }
    }

    /// Requests a cycle as soon as the current one, if any, has finished.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// The notifier behind [`PollerHandle::refresh`], for callers that must
    /// request a cycle without holding on to the handle.
    pub(crate) fn refresh_signal(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop. An in-flight cycle is abandoned and never published.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(error = %e, "poll loop panicked");
            }
        }
    }
}

async fn run(
    fetcher: SnapshotFetcher,
    store: SnapshotStore,
    interval: Duration,
    refresh: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    let server = fetcher.server().clone();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(%server, interval_secs = interval.as_secs_f64(), "poller started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = refresh.notified() => debug!(%server, "refresh requested"),
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!(%server, "cycle abandoned");
                break;
            }
            result = fetcher.fetch() => match result {
                Ok(snapshot) => store.publish(snapshot),
                Err(e) => {
                    let failed = store.record_failure();
                    error!(%server, error = %e, failed_cycles = failed, "cycle failed");
                }
            }
        }
        ticker.reset();
    }

    info!(%server, "poller stopped");
}
