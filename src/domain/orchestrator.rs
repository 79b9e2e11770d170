//! Orchestrator record and phase state machine (spec §3 "Orchestrator",
//! §4.4).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::Task;
use super::template::ResolvedTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorStatus {
    Created,
    Running,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl OrchestratorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Analysis,
    AwaitingConfirmation,
    WorkerExecution,
    Aggregation,
    Done,
}

impl Phase {
    /// Declared forward order (spec §3 invariant: `currentPhase` only
    /// advances forward).
    const ORDER: [Phase; 5] = [
        Phase::Analysis,
        Phase::AwaitingConfirmation,
        Phase::WorkerExecution,
        Phase::Aggregation,
        Phase::Done,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|p| *p == self).expect("Phase::ORDER is exhaustive")
    }

    pub fn can_advance_to(self, next: Phase) -> bool {
        next.index() > self.index()
    }
}

/// Parsed `analysis` phase payload (spec §4.3 schema).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub summary: String,
    pub recommended_splits: u32,
    #[serde(default)]
    pub key_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_complexity: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Aggregate tool-use counters rolled up from every worker (spec §3
/// "stats").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorStats {
    pub tool_counts: HashMap<String, u64>,
}

/// Parsed `aggregation` phase payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregationResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_output: Option<Value>,
    #[serde(default)]
    pub output_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orchestrator {
    pub id: String,
    pub template_id: String,
    pub resolved_template: ResolvedTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_session_id: Option<String>,
    pub cwd: String,
    pub status: OrchestratorStatus,
    pub current_phase: Phase,
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(default)]
    pub workers_by_task_id: HashMap<String, String>,
    #[serde(default)]
    pub stats: OrchestratorStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_processed_transcript_offset: usize,
}

impl Orchestrator {
    pub fn new(
        template_id: impl Into<String>,
        resolved_template: ResolvedTemplate,
        cwd: impl Into<String>,
        variables: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: super::ids::generate_id("orch"),
            template_id: template_id.into(),
            resolved_template,
            main_session_id: None,
            cwd: cwd.into(),
            status: OrchestratorStatus::Created,
            current_phase: Phase::Analysis,
            variables,
            analysis: None,
            tasks: None,
            workers_by_task_id: HashMap::new(),
            stats: OrchestratorStats::default(),
            aggregation: None,
            error_reason: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            last_processed_transcript_offset: 0,
        }
    }

    /// spec §3 invariant: `completedAt` is non-null iff status is terminal.
    pub fn mark_terminal(&mut self, status: OrchestratorStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.current_phase = Phase::Done;
        self.completed_at = Some(Utc::now());
    }

    pub fn advance_phase(&mut self, next: Phase) -> bool {
        if !self.current_phase.can_advance_to(next) {
            return false;
        }
        self.current_phase = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::{ResolvedTemplate, TemplateConfig, TemplatePrompts};

    fn resolved() -> ResolvedTemplate {
        ResolvedTemplate {
            id: "_default".into(),
            name: "Default".into(),
            config: TemplateConfig::default(),
            prompts: TemplatePrompts::default(),
            variables: HashMap::new(),
            phases: crate::domain::template::default_phases(),
        }
    }

    #[test]
    fn phase_only_advances_forward() {
        assert!(Phase::Analysis.can_advance_to(Phase::AwaitingConfirmation));
        assert!(!Phase::AwaitingConfirmation.can_advance_to(Phase::Analysis));
        assert!(!Phase::Analysis.can_advance_to(Phase::Analysis));
    }

    #[test]
    fn advance_phase_rejects_backward_transition() {
        let mut o = Orchestrator::new("_default", resolved(), "/tmp", HashMap::new());
        assert!(o.advance_phase(Phase::AwaitingConfirmation));
        assert!(!o.advance_phase(Phase::Analysis));
        assert_eq!(o.current_phase, Phase::AwaitingConfirmation);
    }

    #[test]
    fn mark_terminal_sets_completed_at() {
        let mut o = Orchestrator::new("_default", resolved(), "/tmp", HashMap::new());
        assert!(o.completed_at.is_none());
        o.mark_terminal(OrchestratorStatus::Completed);
        assert!(o.completed_at.is_some());
        assert_eq!(o.current_phase, Phase::Done);
    }
}
