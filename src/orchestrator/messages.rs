//! Internal command set for the OrchestratorManager actor.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::domain::{Orchestrator, Task};
use crate::pool::CleanupMode;

use super::error::OrchestratorError;

pub type OrchResult<T> = Result<T, OrchestratorError>;

pub struct CreateArgs {
    pub template_id: String,
    pub cwd: String,
    pub message: String,
    pub custom_variables: HashMap<String, Value>,
}

/// A caller-supplied edit to the parsed task list before spawning
/// (spec §4.4 `confirmTasksAndSpawn`).
pub struct TaskModifications {
    pub drop_task_ids: Vec<String>,
    pub edited_tasks: Vec<Task>,
}

impl Default for TaskModifications {
    fn default() -> Self {
        Self { drop_task_ids: Vec::new(), edited_tasks: Vec::new() }
    }
}

#[derive(Debug, Default, Clone)]
pub struct OrchestratorMetrics {
    pub total: usize,
    pub running: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub errored: usize,
}

pub enum OrchestratorCommand {
    Create { args: CreateArgs, reply: oneshot::Sender<OrchResult<Orchestrator>> },
    Start { orchestrator_id: String, reply: oneshot::Sender<OrchResult<()>> },
    ConfirmTasksAndSpawn {
        orchestrator_id: String,
        modifications: TaskModifications,
        reply: oneshot::Sender<OrchResult<()>>,
    },
    Pause { orchestrator_id: String, reply: oneshot::Sender<OrchResult<()>> },
    Resume { orchestrator_id: String, reply: oneshot::Sender<OrchResult<()>> },
    Cancel { orchestrator_id: String, cleanup: CleanupMode, reply: oneshot::Sender<OrchResult<()>> },
    Get { orchestrator_id: String, reply: oneshot::Sender<OrchResult<Orchestrator>> },
    List { reply: oneshot::Sender<Vec<Orchestrator>> },
    Metrics { reply: oneshot::Sender<OrchestratorMetrics> },
    Rehydrate { reply: oneshot::Sender<OrchResult<usize>> },
    Rearm { orchestrator_id: String, reply: oneshot::Sender<OrchResult<()>> },
    /// Internal tick driving the per-orchestrator transcript poll; not part
    /// of the public API.
    PollTick,
}
