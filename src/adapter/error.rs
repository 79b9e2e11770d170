//! Adapter error taxonomy (spec §7 `AdapterError`).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AdapterError {
    #[error("connection to host app lost")]
    ConnectionLost,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("runtime threw during evaluation: {0}")]
    ExecutionFault(String),

    #[error("host app is not in debug mode")]
    NotAvailable,

    #[error("discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("malformed reply from host: {0}")]
    MalformedReply(String),
}
