//! ID generation helpers shared across the engine's domain types.
//!
//! Orchestrator, worker, and subsession ids all use the same scheme:
//! a UUIDv7 (time-ordered, so listings sort chronologically without an
//! extra index) rendered as its canonical string form.

use uuid::Uuid;

/// Generate a new id for a domain entity.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}

/// The session-name marker the host app's UI uses to hide worker sessions
/// by default (spec §6.3).
pub const WORKER_SESSION_MARKER: &str = "__orch_";

/// Compose the worker session name `__orch_<orchestratorId>_worker_<taskId>`.
pub fn worker_session_name(orchestrator_id: &str, task_id: &str) -> String {
    format!("{WORKER_SESSION_MARKER}{orchestrator_id}_worker_{task_id}")
}

/// Whether a session id/name carries the worker marker.
pub fn is_worker_session(name: &str) -> bool {
    name.contains(WORKER_SESSION_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_id_carries_prefix() {
        let id = generate_id("orch");
        assert!(id.starts_with("orch-"));
    }

    #[test]
    fn worker_session_name_matches_spec_format() {
        let name = worker_session_name("orch-1", "t1");
        assert_eq!(name, "__orch_orch-1_worker_t1");
        assert!(is_worker_session(&name));
    }

    #[test]
    fn plain_session_name_is_not_a_worker() {
        assert!(!is_worker_session("main-session-abc"));
    }
}
