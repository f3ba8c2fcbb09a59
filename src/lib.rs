//! `synclogd`: a primary/secondary log replication engine fronting a nameserver's write path.
//!
//! A leader process appends every write to a local, append-only [`DurableLog`] and streams each
//! record to a single follower over gRPC. Callers on the leader choose between [`Coordinator::log`],
//! which blocks (up to a caller-supplied timeout) until the follower has acknowledged, and
//! [`Coordinator::log_async`], which returns immediately and reports completion through a callback.
//! When the follower falls behind or becomes unreachable, the leader degrades to master-only mode
//! rather than blocking writers indefinitely; see [`Coordinator::log`] for the exact rule.
//!
//! A follower process runs the same [`Coordinator`] in [`Role::Follower`], serving incoming
//! entries through [`rpc::AppendLogService`] and invoking a registered apply callback for each one.

mod callback_registry;
mod coordinator;
mod durable_log;
mod progress_persister;
mod progress_store;
mod replicator;

pub mod config;
pub mod error;
pub mod rpc;

pub use callback_registry::CompletionCallback;
pub use config::{CoordinatorConfig, Role};
pub use coordinator::Coordinator;
pub use error::{Error, Result};
