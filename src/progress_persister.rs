//! The background thread that periodically snapshots `sync_offset` to disk.
//!
//! Runs only on the leader, alongside the Replicator. Wakes on its own interval, or immediately
//! at shutdown via [`Coordinator::wait_for_shutdown`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::coordinator::Coordinator;
use crate::progress_store::ProgressStore;

pub struct ProgressPersister;

impl ProgressPersister {
    pub(crate) fn spawn(
        coordinator: Arc<Coordinator>,
        store: ProgressStore,
        interval: Duration,
    ) -> JoinHandle<()> {
        thread::Builder::new()
            .name("synclogd-progress-persister".into())
            .spawn(move || Self::run(&coordinator, &store, interval))
            .expect("failed to spawn progress persister thread")
    }

    fn run(coordinator: &Coordinator, store: &ProgressStore, interval: Duration) {
        while coordinator.wait_for_shutdown(interval) {
            let offset = coordinator.current_sync_offset();
            if let Err(e) = store.save(offset) {
                tracing::error!(error = %e, offset, "failed to snapshot sync_offset");
            }
        }

        // Final snapshot on the way out so a clean shutdown never leaves stale progress behind.
        let offset = coordinator.current_sync_offset();
        if let Err(e) = store.save(offset) {
            tracing::error!(error = %e, offset, "failed to snapshot sync_offset on shutdown");
        }
    }
}
