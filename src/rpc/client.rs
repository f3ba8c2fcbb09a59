use std::time::Duration;

use bytes::Bytes;
use tonic::transport::Channel;

use super::proto::append_log_client::AppendLogClient as GeneratedClient;
use super::proto::AppendLogRequest;
use crate::error::Result;

/// What the Replicator needs from the transport. Kept as a trait so the Coordinator's core
/// logic (and its tests) stay decoupled from tonic/gRPC specifics, treating replication RPC as
/// a swappable external collaborator.
pub trait AppendLogClient: Send {
    /// Sends one entry and blocks for at most `timeout` waiting for the follower's ack.
    /// Returns `Ok(success)` on a completed RPC, `Err` on transport failure or timeout.
    fn append_log(&mut self, payload: Bytes, timeout: Duration) -> Result<bool>;
}

/// Bridges the Replicator's blocking OS thread to tonic's async client via a dedicated
/// single-threaded Tokio runtime.
pub struct GrpcAppendLogClient {
    runtime: tokio::runtime::Runtime,
    client: GeneratedClient<Channel>,
}

impl GrpcAppendLogClient {
    pub fn connect(addr: String) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let uri = format!("http://{addr}");
        let client = runtime.block_on(async { GeneratedClient::connect(uri).await })?;
        Ok(Self { runtime, client })
    }
}

impl AppendLogClient for GrpcAppendLogClient {
    fn append_log(&mut self, payload: Bytes, timeout: Duration) -> Result<bool> {
        let mut client = self.client.clone();
        self.runtime.block_on(async move {
            // `Request::set_timeout` only propagates a `grpc-timeout` header for the server's
            // own deadline tracking; it does not cancel the call on this end. Wrap in
            // `tokio::time::timeout` too so a follower that accepts the connection but never
            // replies doesn't hang the Replicator past its configured per-attempt budget.
            let mut request = tonic::Request::new(AppendLogRequest { log_data: payload });
            request.set_timeout(timeout);
            let call = client.append_log(request);
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => Ok(result?.into_inner().success),
                Err(_) => Err(crate::error::Error::Rpc(tonic::Status::deadline_exceeded(
                    "append_log timed out",
                ))),
            }
        })
    }
}

#[cfg(test)]
pub struct MockAppendLogClient {
    pub received: Vec<Bytes>,
    /// Responses handed out in order; once exhausted, further calls fail with a transport-style
    /// timeout, matching a follower that has gone quiet.
    pub responses: std::collections::VecDeque<Result<bool>>,
}

#[cfg(test)]
impl MockAppendLogClient {
    pub fn new(responses: Vec<Result<bool>>) -> Self {
        Self {
            received: Vec::new(),
            responses: responses.into(),
        }
    }
}

#[cfg(test)]
impl AppendLogClient for MockAppendLogClient {
    fn append_log(&mut self, payload: Bytes, _timeout: Duration) -> Result<bool> {
        self.received.push(payload);
        self.responses.pop_front().unwrap_or(Ok(true))
    }
}
