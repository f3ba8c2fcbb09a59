//! Construction parameters for a [`crate::Coordinator`].
//!
//! This is deliberately thin: role selection and "how to find the follower address" are owned
//! by the embedding nameserver, not by this crate. [`Cli`] is the one piece of this module that
//! actually reads the process environment, and it exists only for the demo binary
//! (`src/main.rs`), not for the library.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Fixed for the process lifetime; supplied at construction, never switched at runtime.
#[derive(Debug, Clone)]
pub enum Role {
    Leader { follower_addr: String },
    Follower,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub role: Role,
    /// Directory holding `sync.log`, `prog.log`, `prog.tmp`.
    pub log_dir: PathBuf,
    /// Address this process's `AppendLog` RPC service should bind to (follower only, or a
    /// leader that also wants to expose its own endpoint for symmetry/testing).
    pub listen_addr: String,
    pub progress_snapshot_interval: Duration,
    pub replicator_retry_backoff: Duration,
    pub rpc_attempt_timeout: Duration,
}

impl CoordinatorConfig {
    pub fn leader(log_dir: PathBuf, listen_addr: String, follower_addr: String) -> Self {
        Self {
            role: Role::Leader { follower_addr },
            log_dir,
            listen_addr,
            ..Self::defaults()
        }
    }

    pub fn follower(log_dir: PathBuf, listen_addr: String) -> Self {
        Self {
            role: Role::Follower,
            log_dir,
            listen_addr,
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            role: Role::Follower,
            log_dir: PathBuf::from("."),
            listen_addr: String::new(),
            progress_snapshot_interval: Duration::from_secs(10),
            replicator_retry_backoff: Duration::from_secs(5),
            rpc_attempt_timeout: Duration::from_secs(15),
        }
    }
}

/// CLI surface for the demo binary. Not part of the library's public contract.
#[derive(Debug, Parser)]
#[command(name = "synclogd")]
#[command(about = "primary/secondary log replication daemon", version)]
pub struct Cli {
    #[clap(long, value_enum, env = "SYNCLOGD_ROLE")]
    pub role: CliRole,

    #[clap(long, default_value = "data", env = "SYNCLOGD_LOG_DIR")]
    pub log_dir: PathBuf,

    /// Address this process's AppendLog RPC service listens on.
    #[clap(long, default_value = "127.0.0.1:7000", env = "SYNCLOGD_LISTEN_ADDR")]
    pub listen_addr: String,

    /// Address of the follower to replicate to. Required when `--role leader`.
    #[clap(long, env = "SYNCLOGD_FOLLOWER_ADDR")]
    pub follower_addr: Option<String>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliRole {
    Leader,
    Follower,
}
