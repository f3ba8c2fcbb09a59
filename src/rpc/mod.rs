//! Concrete realization of replication RPC as an external collaborator: a gRPC client the
//! Replicator drives, and a gRPC service the follower serves.

pub mod proto {
    #![allow(clippy::all)]
    tonic::include_proto!("append_log");
}

mod client;
mod service;

pub use client::{AppendLogClient, GrpcAppendLogClient};
pub use service::AppendLogService;

#[cfg(test)]
pub use client::MockAppendLogClient;
