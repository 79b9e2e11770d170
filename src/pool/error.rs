//! WorkerPool error taxonomy (spec §7 `ResourceError`, `StateError`).

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PoolError {
    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("operation not valid on a terminal worker: {0}")]
    TerminalWorker(String),

    #[error("retry exhausted: retryCount would exceed retryMax for worker {0}")]
    RetryExhausted(String),

    #[error("worker spawn failed: {0}")]
    SpawnFailed(String),

    #[error("channel to pool actor closed")]
    ChannelClosed,
}
