use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use super::git::GitProvider;
use crate::event::Event;

/// Default interval between status polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Background task that periodically takes a repository snapshot and forwards
/// it to the event loop.
///
/// The task never touches the tree; it only produces `Event::Vcs` values. It is
/// aborted when the poller is dropped, which ends the browsing session's
/// status timer.
pub struct VcsPoller {
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl VcsPoller {
    /// Spawn the poll loop. The first poll happens after one `interval`.
    pub fn spawn(
        root: PathBuf,
        provider: GitProvider,
        interval: Duration,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let wake = Arc::new(Notify::new());
        let wake_task = wake.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = wake_task.notified() => {}
                }
                let snapshot = provider.snapshot(&root).await;
                tracing::trace!(
                    statuses = snapshot.statuses.len(),
                    diffs = snapshot.diffs.len(),
                    "status poll finished"
                );
                if event_tx.send(Event::Vcs(snapshot)).is_err() {
                    break;
                }
            }
        });

        Self { wake, handle }
    }

    /// Request a poll now instead of waiting for the interval.
    pub fn poke(&self) {
        self.wake.notify_one();
    }
}

impl Drop for VcsPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
