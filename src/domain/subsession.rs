//! Parent/child subsession relation (spec §3 "SubSessionRelation", §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubSessionStatus {
    Active,
    Idle,
    Orphaned,
    Returned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubSessionRelation {
    pub child_session_id: String,
    pub parent_session_id: String,
    pub status: SubSessionStatus,
    pub message_count: u64,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_result: Option<Value>,
}

impl SubSessionRelation {
    pub fn new(child_session_id: impl Into<String>, parent_session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            child_session_id: child_session_id.into(),
            parent_session_id: parent_session_id.into(),
            status: SubSessionStatus::Active,
            message_count: 0,
            last_activity_at: now,
            created_at: now,
            returned_result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_relation_starts_active() {
        let r = SubSessionRelation::new("child-1", "parent-1");
        assert_eq!(r.status, SubSessionStatus::Active);
        assert_eq!(r.message_count, 0);
        assert!(r.returned_result.is_none());
    }
}
