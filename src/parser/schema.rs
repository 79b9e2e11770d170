//! Phase-tagged response payloads (spec §4.3 "Phase schemas", §9 "Define
//! tagged variants per phase instead of runtime-typed JSON blobs").

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Task;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisData {
    pub summary: String,
    pub recommended_splits: u32,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default)]
    pub estimated_complexity: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskListData {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub total_tasks: Option<u32>,
    #[serde(default)]
    pub parallelizable_groups: Vec<Vec<String>>,
    #[serde(default)]
    pub execution_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressData {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub current_action: Option<String>,
    #[serde(default)]
    pub files_processed: Option<u32>,
    #[serde(default)]
    pub files_total: Option<u32>,
    #[serde(default)]
    pub output_preview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Success,
    Partial,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionData {
    pub task_id: String,
    pub status: CompletionStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub metrics: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationData {
    pub status: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default)]
    pub merged_output: Option<Value>,
    #[serde(default)]
    pub output_files: Vec<String>,
}

/// The tagged union a validated response block resolves to. Distinct
/// variants so downstream dispatch is a `match`, not a field probe on an
/// untyped `Value` (spec §9).
#[derive(Debug, Clone, PartialEq)]
pub enum PhasePayload {
    Analysis(AnalysisData),
    TaskList(TaskListData),
    Progress(ProgressData),
    Completion(CompletionData),
    Aggregation(AggregationData),
}

impl PhasePayload {
    pub fn phase_name(&self) -> &'static str {
        match self {
            Self::Analysis(_) => "analysis",
            Self::TaskList(_) => "task_list",
            Self::Progress(_) => "progress",
            Self::Completion(_) => "completion",
            Self::Aggregation(_) => "aggregation",
        }
    }
}
