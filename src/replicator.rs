//! The background thread that drains the durable log to the follower.
//!
//! Runs only on the leader. One plain OS thread rather than a tokio task: the blocking RPC call
//! is the point, since it lets the thread simply sleep on a condition variable between records
//! instead of polling.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::coordinator::Coordinator;
use crate::durable_log::LENGTH_PREFIX_SIZE;
use crate::rpc::AppendLogClient;

pub struct Replicator;

impl Replicator {
    pub(crate) fn spawn(coordinator: Arc<Coordinator>, mut client: Box<dyn AppendLogClient>) -> JoinHandle<()> {
        thread::Builder::new()
            .name("synclogd-replicator".into())
            .spawn(move || Self::run(&coordinator, client.as_mut()))
            .expect("failed to spawn replicator thread")
    }

    fn run(coordinator: &Coordinator, client: &mut dyn AppendLogClient) {
        loop {
            let Some(payload) = coordinator.replicator_next() else {
                return;
            };
            let record_len = LENGTH_PREFIX_SIZE + payload.len() as u64;

            loop {
                match client.append_log(payload.clone(), coordinator.rpc_attempt_timeout()) {
                    Ok(true) => break,
                    Ok(false) => {
                        tracing::warn!("follower rejected append, retrying");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "append_log rpc failed, retrying");
                    }
                }
                if coordinator.is_exiting() {
                    return;
                }
                thread::sleep(coordinator.retry_backoff());
            }

            if let Some(cb) = coordinator.replicator_advance(record_len) {
                cb(true);
            }
        }
    }
}
