//! Domain types shared across the engine.
//!
//! All record types here are plain data with serde derives; component
//! modules own the state machines and persistence that operate on them.

pub mod ids;
mod orchestrator;
mod subsession;
mod task;
mod template;
mod worker;

pub use ids::{generate_id, is_worker_session, worker_session_name, WORKER_SESSION_MARKER};
pub use orchestrator::{
    AggregationResult, AnalysisResult, Orchestrator, OrchestratorStats, OrchestratorStatus, Phase,
};
pub use subsession::{SubSessionRelation, SubSessionStatus};
pub use task::{Task, TaskPriority};
pub use template::{default_phases, ResolvedTemplate, Template, TemplateConfig, TemplateMetadata, TemplatePrompts};
pub use worker::{Worker, WorkerOutput, WorkerStatus};
