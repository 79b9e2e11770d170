//! Worker record and status machine (spec §3 "Worker", §4.5).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Queued,
    Spawning,
    Running,
    Completed,
    Failed,
    Timeout,
    Cancelled,
    Paused,
}

impl WorkerStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout | Self::Cancelled)
    }

    /// Validates the single-step transitions allowed by the invariant in
    /// spec §3: no regressions except `running <-> paused`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use WorkerStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Queued, Spawning)
                | (Spawning, Running)
                | (Spawning, Failed)
                | (Spawning, Cancelled)
                | (Running, Paused)
                | (Paused, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Timeout)
                | (Running, Cancelled)
                | (Paused, Cancelled)
                | (Queued, Cancelled)
        )
    }
}

/// Aggregated completion payload attached once a worker finishes (spec §4.3
/// `completion` phase schema).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: String,
    pub orchestrator_id: String,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: WorkerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_pct: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<WorkerOutput>,
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub tool_stats: HashMap<String, u64>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Last transcript entry index this worker's poller has consumed.
    #[serde(default)]
    pub transcript_cursor: usize,
    /// Consecutive poll failures; reset on any successful poll
    /// (SPEC_FULL §F.4).
    #[serde(default)]
    pub consecutive_poll_failures: u32,
}

impl Worker {
    pub fn new(orchestrator_id: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            worker_id: super::ids::generate_id("worker"),
            orchestrator_id: orchestrator_id.into(),
            task_id: task_id.into(),
            session_id: None,
            status: WorkerStatus::Queued,
            progress_pct: None,
            current_action: None,
            output: None,
            output_files: Vec::new(),
            tool_stats: HashMap::new(),
            retry_count: 0,
            started_at: None,
            completed_at: None,
            last_polled_at: None,
            transcript_cursor: 0,
            consecutive_poll_failures: 0,
        }
    }

    pub fn record_tool_use(&mut self, tool_name: &str) {
        *self.tool_stats.entry(tool_name.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_regresses() {
        assert!(WorkerStatus::Queued.can_transition_to(WorkerStatus::Spawning));
        assert!(!WorkerStatus::Completed.can_transition_to(WorkerStatus::Running));
        assert!(!WorkerStatus::Failed.can_transition_to(WorkerStatus::Queued));
    }

    #[test]
    fn running_and_paused_are_bidirectional() {
        assert!(WorkerStatus::Running.can_transition_to(WorkerStatus::Paused));
        assert!(WorkerStatus::Paused.can_transition_to(WorkerStatus::Running));
    }

    #[test]
    fn new_worker_starts_queued_with_zero_cursor() {
        let w = Worker::new("orch-1", "t1");
        assert_eq!(w.status, WorkerStatus::Queued);
        assert_eq!(w.transcript_cursor, 0);
        assert!(w.session_id.is_none());
    }

    #[test]
    fn record_tool_use_accumulates() {
        let mut w = Worker::new("orch-1", "t1");
        w.record_tool_use("edit");
        w.record_tool_use("edit");
        w.record_tool_use("bash");
        assert_eq!(w.tool_stats.get("edit"), Some(&2));
        assert_eq!(w.tool_stats.get("bash"), Some(&1));
    }
}
