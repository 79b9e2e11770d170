//! Internal command set for the SubSessionTracker actor.

use tokio::sync::oneshot;

use crate::domain::SubSessionRelation;

use super::error::SubSessionError;

pub type SubSessionResult<T> = Result<T, SubSessionError>;

pub enum SubSessionCommand {
    /// Start watching `parent_session_id` for agent-spawn tool uses.
    WatchParent { parent_session_id: String },
    /// Stop watching a parent; its already-registered children keep polling
    /// until they reach a terminal status on their own.
    UnwatchParent { parent_session_id: String },
    GetRelations { parent_session_id: String, reply: oneshot::Sender<Vec<SubSessionRelation>> },
    ListAll { reply: oneshot::Sender<Vec<SubSessionRelation>> },
    GetRelation { child_session_id: String, reply: oneshot::Sender<SubSessionResult<SubSessionRelation>> },
    /// Internal tick driving the poll loop; not part of the public API.
    PollTick,
}
