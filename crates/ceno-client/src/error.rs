//! Error types for the client daemon.

use ceno_fcp::FcpError;

use crate::storage::StorageError;

/// Errors that stop the daemon from starting.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("node connection error: {0}")]
    Fcp(#[from] FcpError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
