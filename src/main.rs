//! Demo binary: runs a single `synclogd` process as either the leader or the follower half of a
//! replicated pair, wiring a [`Coordinator`] to the gRPC transport.

use std::sync::Arc;

use clap::Parser;
use mimalloc::MiMalloc;
use tonic::transport::Server;

use synclogd::config::{Cli, CliRole, CoordinatorConfig};
use synclogd::rpc::proto::append_log_server::AppendLogServer;
use synclogd::rpc::AppendLogService;
use synclogd::{Coordinator, Role};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match cli.role {
        CliRole::Leader => {
            let follower_addr = cli.follower_addr.ok_or_else(|| {
                anyhow::anyhow!("--follower-addr is required when --role leader")
            })?;
            CoordinatorConfig::leader(cli.log_dir, cli.listen_addr, follower_addr)
        }
        CliRole::Follower => CoordinatorConfig::follower(cli.log_dir, cli.listen_addr),
    };

    let listen_addr = config.listen_addr.clone();
    let is_leader = matches!(config.role, Role::Leader { .. });

    let coordinator = tokio::task::spawn_blocking(move || Coordinator::init(config)).await??;

    coordinator.register_apply_callback(|entry| {
        tracing::debug!(bytes = entry.len(), "applied replicated entry");
    });

    tracing::info!(%listen_addr, leader = is_leader, "starting AppendLog service");

    let service = AppendLogService::new(coordinator.clone());
    let addr = listen_addr.parse()?;

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };

    Server::builder()
        .add_service(AppendLogServer::new(service))
        .serve_with_shutdown(addr, shutdown)
        .await?;

    let coordinator = coordinator.clone();
    tokio::task::spawn_blocking(move || coordinator.shutdown()).await?;

    Ok(())
}
