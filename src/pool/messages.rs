//! Internal command set for the WorkerPool actor.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::domain::{ResolvedTemplate, Task, Worker};

use super::error::PoolError;

pub type PoolResult<T> = Result<T, PoolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    Archive,
    Delete,
}

pub enum PoolCommand {
    SpawnBatch {
        orchestrator_id: String,
        cwd: String,
        tasks: Vec<Task>,
        template: ResolvedTemplate,
        variables: HashMap<String, Value>,
        reply: oneshot::Sender<PoolResult<()>>,
    },
    PauseWorker {
        worker_id: String,
        reply: oneshot::Sender<PoolResult<()>>,
    },
    ResumeWorker {
        worker_id: String,
        reply: oneshot::Sender<PoolResult<()>>,
    },
    CancelWorker {
        worker_id: String,
        reply: oneshot::Sender<PoolResult<()>>,
    },
    CancelAllForOrchestrator {
        orchestrator_id: String,
        reply: oneshot::Sender<PoolResult<()>>,
    },
    RetryWorker {
        worker_id: String,
        reply: oneshot::Sender<PoolResult<String>>,
    },
    GetWorkers {
        orchestrator_id: String,
        reply: oneshot::Sender<Vec<Worker>>,
    },
    Cleanup {
        orchestrator_id: String,
        mode: CleanupMode,
        reply: oneshot::Sender<PoolResult<()>>,
    },
}
