use std::sync::Arc;

use tonic::{Request, Response, Status};

use super::proto::append_log_server::AppendLog;
use super::proto::{AppendLogRequest, AppendLogResponse};
use crate::coordinator::Coordinator;

/// The follower's RPC-server endpoint: writes the incoming entry to its local `DurableLog`,
/// invokes the apply callback, and acks.
pub struct AppendLogService {
    coordinator: Arc<Coordinator>,
}

impl AppendLogService {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

#[tonic::async_trait]
impl AppendLog for AppendLogService {
    async fn append_log(
        &self,
        request: Request<AppendLogRequest>,
    ) -> Result<Response<AppendLogResponse>, Status> {
        let log_data = request.into_inner().log_data;
        self.coordinator.apply_replicated_entry(&log_data);

        Ok(Response::new(AppendLogResponse { success: true }))
    }
}
