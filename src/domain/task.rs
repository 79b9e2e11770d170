//! Task record (spec §3 "Task") — immutable once parsed from a task-planning
//! response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
}

impl Task {
    /// Whether all of this task's declared dependencies are contained in
    /// `completed_ids`. Used by the pool to decide dequeue order; the
    /// engine does not otherwise reorder tasks beyond FIFO (spec §4.5).
    pub fn dependencies_satisfied(&self, completed_ids: &[String]) -> bool {
        self.dependencies.iter().all(|d| completed_ids.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependencies_satisfied_when_empty() {
        let t = Task {
            id: "t1".into(),
            title: "t".into(),
            description: "d".into(),
            scope: None,
            priority: None,
            dependencies: vec![],
            estimated_tokens: None,
        };
        assert!(t.dependencies_satisfied(&[]));
    }

    #[test]
    fn dependencies_satisfied_requires_all_present() {
        let mut t = Task {
            id: "t2".into(),
            title: "t".into(),
            description: "d".into(),
            scope: None,
            priority: None,
            dependencies: vec!["t1".into()],
            estimated_tokens: None,
        };
        assert!(!t.dependencies_satisfied(&[]));
        assert!(t.dependencies_satisfied(&["t1".to_string()]));
        t.dependencies.push("t0".into());
        assert!(!t.dependencies_satisfied(&["t1".to_string()]));
    }
}
