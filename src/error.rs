//! Error taxonomy for the replication core.
//!
//! Both `Coordinator::log` and `Coordinator::log_async` always report success to the host:
//! this enum exists for `init`/`shutdown`, for internal plumbing, and for callers who want a
//! typed error channel instead of process-abort-on-corruption.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// `sync.log` or `prog.log` could not be opened for a reason other than absence.
    #[error("configuration failure: {0}")]
    ConfigurationFailure(String),

    /// A startup or runtime invariant was violated: `current_offset < sync_offset` at startup,
    /// or a torn/short record read or write. A missing completion callback at a non-zero
    /// replicated offset is deliberately *not* one of these: `CallbackRegistry` logs and
    /// continues in that case rather than erroring (see `Coordinator::replicator_advance`).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("rpc failure: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("rpc transport failure: {0}")]
    Transport(#[from] tonic::transport::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
