//! The facade binding every other module together.
//!
//! `Coordinator` owns the durable log, the progress store, the callback registry, and the two
//! background threads active on the leader. Everything that needs linearizing — `current_offset`,
//! `sync_offset`, `master_only`, and the callback registry — lives in one `parking_lot::Mutex`
//! instead of splitting locks per field.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::callback_registry::{CallbackRegistry, CompletionCallback};
use crate::config::{CoordinatorConfig, Role};
use crate::durable_log::DurableLog;
use crate::error::{Error, Result};
use crate::progress_persister::ProgressPersister;
use crate::progress_store::ProgressStore;
use crate::replicator::Replicator;
use crate::rpc::{AppendLogClient, GrpcAppendLogClient};

type ApplyCallback = Box<dyn Fn(&[u8]) + Send + Sync>;

struct State {
    durable_log: DurableLog,
    current_offset: u64,
    sync_offset: u64,
    master_only: bool,
    callbacks: CallbackRegistry,
    exiting: bool,
}

pub struct Coordinator {
    config: CoordinatorConfig,
    state: Mutex<State>,
    /// Signaled by submit paths after appending; waited on by the Replicator.
    replicator_cv: Condvar,
    /// Signaled by the Replicator when `sync_offset` catches `current_offset`; waited on by the
    /// synchronous submit path.
    completion_cv: Condvar,
    /// Signaled once, at shutdown, to wake the ProgressPersister immediately instead of making
    /// it wait out its full interval.
    shutdown_cv: Condvar,
    /// Lock-free mirror of `state.sync_offset`, read by the ProgressPersister without taking
    /// the mutex.
    sync_offset_atomic: AtomicU64,
    apply_callback: Mutex<Option<ApplyCallback>>,
    replicator_handle: Mutex<Option<JoinHandle<()>>>,
    persister_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Opens the durable log and progress store, validates the startup invariant, and — if
    /// configured as leader — starts the Replicator and ProgressPersister threads.
    pub fn init(config: CoordinatorConfig) -> Result<Arc<Self>> {
        std::fs::create_dir_all(&config.log_dir)?;

        let mut durable_log = DurableLog::open(&config.log_dir.join("sync.log"))?;
        let progress_store = ProgressStore::new(&config.log_dir);
        let sync_offset = progress_store.load()?;
        let current_offset = durable_log.current_offset();

        if current_offset < sync_offset {
            return Err(Error::InvariantViolation(format!(
                "current_offset ({current_offset}) < sync_offset ({sync_offset}) at startup"
            )));
        }
        durable_log.seek_read(sync_offset);

        let state = State {
            durable_log,
            current_offset,
            sync_offset,
            master_only: false,
            callbacks: CallbackRegistry::default(),
            exiting: false,
        };

        let coordinator = Arc::new(Self {
            config: config.clone(),
            state: Mutex::new(state),
            replicator_cv: Condvar::new(),
            completion_cv: Condvar::new(),
            shutdown_cv: Condvar::new(),
            sync_offset_atomic: AtomicU64::new(sync_offset),
            apply_callback: Mutex::new(None),
            replicator_handle: Mutex::new(None),
            persister_handle: Mutex::new(None),
        });

        if let Role::Leader { follower_addr } = &config.role {
            let client = GrpcAppendLogClient::connect(follower_addr.clone())?;
            coordinator.start_leader_workers(Box::new(client));
        }

        tracing::info!(role = ?config.role, log_dir = ?coordinator.config.log_dir, "coordinator initialized");
        Ok(coordinator)
    }

    fn start_leader_workers(self: &Arc<Self>, client: Box<dyn AppendLogClient>) {
        let replicator_handle = Replicator::spawn(self.clone(), client);
        let persister_handle = ProgressPersister::spawn(
            self.clone(),
            ProgressStore::new(&self.config.log_dir),
            self.config.progress_snapshot_interval,
        );
        *self.replicator_handle.lock() = Some(replicator_handle);
        *self.persister_handle.lock() = Some(persister_handle);
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.config.role, Role::Leader { .. })
    }

    /// Sets the follower-side apply hook. Safe to call at any point before traffic starts;
    /// looked up fresh on every incoming `AppendLog` RPC.
    pub fn register_apply_callback<F>(&self, cb: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        *self.apply_callback.lock() = Some(Box::new(cb));
    }

    /// Blocking submit. Always returns `true`: failure is expressed by entering master-only
    /// mode, not by returning `false`.
    pub fn log(&self, entry: &[u8], timeout: Duration) -> bool {
        let entry_start = self.append_local(entry);

        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        if state.master_only && state.sync_offset < entry_start {
            return true;
        }

        loop {
            if state.sync_offset == state.current_offset {
                state.master_only = false;
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                state.master_only = true;
                return true;
            }

            self.completion_cv.wait_for(&mut state, remaining);
            // Re-check on every wake, timed out or not: the catch-up condition is evaluated
            // against the live `current_offset`, not a snapshot taken at call time.
        }
    }

    /// Non-blocking submit: appends locally, registers `cb` against the entry's start offset,
    /// and returns immediately. `cb(true)` fires from the Replicator once acknowledged, or
    /// `cb(false)` fires from `shutdown()` if the entry never gets there.
    pub fn log_async(&self, entry: &[u8], cb: CompletionCallback) {
        let mut state = self.state.lock();
        let len = Self::append_locked(&mut state, entry);
        let entry_start = state.current_offset;
        state.current_offset += len;
        state.callbacks.insert(entry_start, cb);
        drop(state);
        self.replicator_cv.notify_one();
    }

    fn append_local(&self, entry: &[u8]) -> u64 {
        let mut state = self.state.lock();
        let len = Self::append_locked(&mut state, entry);
        let entry_start = state.current_offset;
        state.current_offset += len;
        drop(state);
        self.replicator_cv.notify_one();
        entry_start
    }

    fn append_locked(state: &mut State, entry: &[u8]) -> u64 {
        state
            .durable_log
            .append(entry)
            .expect("fatal: failed to append to durable log")
    }

    /// The follower's `AppendLog` RPC entry point: persists the entry, then invokes the apply
    /// callback synchronously, outside the lock.
    ///
    /// A failed append here is the same fatal `DurableLog` condition `append_locked` panics on
    /// for the leader's local-append path; it is not downgraded to a per-request RPC error, so a
    /// torn/short write aborts the serving thread on the follower exactly as it would on the
    /// leader.
    pub(crate) fn apply_replicated_entry(&self, payload: &[u8]) {
        {
            let mut state = self.state.lock();
            let len = state
                .durable_log
                .append(payload)
                .expect("fatal: failed to append to durable log");
            state.current_offset += len;
        }

        if let Some(cb) = self.apply_callback.lock().as_ref() {
            cb(payload);
        }
    }

    /// Signals `exiting`, wakes both background threads, joins them, and fires any callbacks
    /// still outstanding with `false` (Open Question resolution, see SPEC_FULL.md §10).
    pub fn shutdown(&self) {
        let abandoned = {
            let mut state = self.state.lock();
            state.exiting = true;
            state.callbacks.drain_ascending()
        };

        self.replicator_cv.notify_all();
        self.completion_cv.notify_all();
        self.shutdown_cv.notify_all();

        if let Some(handle) = self.replicator_handle.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.persister_handle.lock().take() {
            let _ = handle.join();
        }

        for cb in abandoned {
            cb(false);
        }

        tracing::info!("coordinator shut down");
    }

    // --- internals used by the background threads (replicator.rs, progress_persister.rs) ---

    /// Waits until there is a record to replicate, then reads and returns it. Returns `None`
    /// once `exiting` is set.
    pub(crate) fn replicator_next(&self) -> Option<Bytes> {
        let mut state = self.state.lock();
        loop {
            if state.exiting {
                return None;
            }
            if state.sync_offset < state.current_offset {
                let record = state
                    .durable_log
                    .read_record()
                    .expect("fatal: torn record in sync log");
                return Some(record);
            }
            self.replicator_cv.wait(&mut state);
        }
    }

    /// Advances `sync_offset` by `record_len` after a successful RPC, takes the matching
    /// callback (if any), and signals `completion_cv` if the log has fully caught up.
    pub(crate) fn replicator_advance(&self, record_len: u64) -> Option<CompletionCallback> {
        let mut state = self.state.lock();
        let offset = state.sync_offset;
        let cb = state.callbacks.take(offset);
        if cb.is_none() && offset != 0 {
            tracing::warn!(
                offset,
                "no completion callback registered for replicated offset"
            );
        }

        state.sync_offset += record_len;
        self.sync_offset_atomic
            .store(state.sync_offset, Ordering::Release);

        if state.sync_offset == state.current_offset {
            self.completion_cv.notify_all();
        }

        cb
    }

    pub(crate) fn is_exiting(&self) -> bool {
        self.state.lock().exiting
    }

    pub(crate) fn rpc_attempt_timeout(&self) -> Duration {
        self.config.rpc_attempt_timeout
    }

    pub(crate) fn retry_backoff(&self) -> Duration {
        self.config.replicator_retry_backoff
    }

    /// Waits up to `interval` for shutdown, returning `false` once it happens. Used by the
    /// ProgressPersister so it wakes immediately on shutdown instead of waiting out the full
    /// snapshot interval.
    pub(crate) fn wait_for_shutdown(&self, interval: Duration) -> bool {
        let mut state = self.state.lock();
        if state.exiting {
            return false;
        }
        self.shutdown_cv.wait_for(&mut state, interval);
        !state.exiting
    }

    pub(crate) fn current_sync_offset(&self) -> u64 {
        self.sync_offset_atomic.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub(crate) fn snapshot_offsets(&self) -> (u64, u64, bool) {
        let state = self.state.lock();
        (state.current_offset, state.sync_offset, state.master_only)
    }
}
