//! SubSessionTracker (spec §4.6) — parent/child session relationship
//! tracking for host-driven agent delegation.
//!
//! Same actor shape as the rest of the engine: one task owns
//! `HashMap<String, SubSessionRelation>` keyed by child session id and a
//! small per-parent watch table, and talks to the adapter on the state's
//! behalf. Grounded on the teacher's `watcher` module for the
//! poll-and-diff loop shape (detect new entries against a remembered
//! cursor, react, move the cursor forward).

mod error;
mod messages;

pub use error::SubSessionError;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::adapter::RemoteRuntimeAdapter;
use crate::dispatcher::{Dispatcher, Event};
use crate::domain::{SubSessionRelation, SubSessionStatus};
use crate::parser::{self, PhasePayload};

use error::SubSessionError as Error;
use messages::{SubSessionCommand, SubSessionResult};

/// Tool-use names treated as agent-delegation spawns. The protocol doesn't
/// pin this down; these are the plausible host tool names for "run this as
/// a subordinate session".
const AGENT_SPAWN_TOOL_NAMES: &[&str] = &["Task", "spawn_agent", "delegate_session"];

#[derive(Clone)]
pub struct SubSessionTracker {
    tx: mpsc::Sender<SubSessionCommand>,
}

impl SubSessionTracker {
    pub fn spawn(
        adapter: RemoteRuntimeAdapter,
        dispatcher: Dispatcher,
        poll_interval: Duration,
        idle_threshold: Duration,
        orphan_threshold: Duration,
        forward_results: bool,
    ) -> Self {
        let (tx, rx) = mpsc::channel(128);
        tokio::spawn(actor_loop(
            TrackerState {
                adapter,
                dispatcher,
                watched_parents: HashMap::new(),
                relations: HashMap::new(),
                known_session_ids: HashSet::new(),
                idle_threshold,
                orphan_threshold,
                forward_results,
            },
            poll_interval,
            rx,
        ));
        Self { tx }
    }

    pub async fn watch_parent(&self, parent_session_id: impl Into<String>) {
        let _ = self.tx.send(SubSessionCommand::WatchParent { parent_session_id: parent_session_id.into() }).await;
    }

    pub async fn unwatch_parent(&self, parent_session_id: impl Into<String>) {
        let _ = self.tx.send(SubSessionCommand::UnwatchParent { parent_session_id: parent_session_id.into() }).await;
    }

    pub async fn get_relations(&self, parent_session_id: impl Into<String>) -> Vec<SubSessionRelation> {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(SubSessionCommand::GetRelations { parent_session_id: parent_session_id.into(), reply })
            .await
            .is_err()
        {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn list_all(&self) -> Vec<SubSessionRelation> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(SubSessionCommand::ListAll { reply }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn get_relation(&self, child_session_id: impl Into<String>) -> SubSessionResult<SubSessionRelation> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SubSessionCommand::GetRelation { child_session_id: child_session_id.into(), reply })
            .await
            .map_err(|_| Error::NotFound("tracker actor shut down".into()))?;
        rx.await.map_err(|_| Error::NotFound("tracker actor shut down".into()))?
    }
}

struct WatchedParent {
    transcript_cursor: usize,
    pending_spawns: u32,
    unreachable_since: Option<chrono::DateTime<Utc>>,
}

struct TrackerState {
    adapter: RemoteRuntimeAdapter,
    dispatcher: Dispatcher,
    watched_parents: HashMap<String, WatchedParent>,
    relations: HashMap<String, SubSessionRelation>,
    known_session_ids: HashSet<String>,
    idle_threshold: Duration,
    orphan_threshold: Duration,
    forward_results: bool,
}

async fn actor_loop(mut state: TrackerState, poll_interval: Duration, mut rx: mpsc::Receiver<SubSessionCommand>) {
    let mut tick = tokio::time::interval(poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_command(&mut state, cmd).await;
            }
            _ = tick.tick() => {
                poll_once(&mut state).await;
            }
        }
    }
}

async fn handle_command(state: &mut TrackerState, cmd: SubSessionCommand) {
    match cmd {
        SubSessionCommand::WatchParent { parent_session_id } => {
            state.watched_parents.entry(parent_session_id.clone()).or_insert_with(|| WatchedParent {
                transcript_cursor: 0,
                pending_spawns: 0,
                unreachable_since: None,
            });
            info!(parent_session_id, "watch_parent: now watching for agent-spawn tool uses");
        }
        SubSessionCommand::UnwatchParent { parent_session_id } => {
            state.watched_parents.remove(&parent_session_id);
        }
        SubSessionCommand::GetRelations { parent_session_id, reply } => {
            let relations = state
                .relations
                .values()
                .filter(|r| r.parent_session_id == parent_session_id)
                .cloned()
                .collect();
            let _ = reply.send(relations);
        }
        SubSessionCommand::ListAll { reply } => {
            let _ = reply.send(state.relations.values().cloned().collect());
        }
        SubSessionCommand::GetRelation { child_session_id, reply } => {
            let result = state
                .relations
                .get(&child_session_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(child_session_id.clone()));
            let _ = reply.send(result);
        }
        SubSessionCommand::PollTick => poll_once(state).await,
    }
}

async fn poll_once(state: &mut TrackerState) {
    if state.watched_parents.is_empty() && state.relations.is_empty() {
        return;
    }

    let sessions = match state.adapter.list_sessions(false, true).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "poll_once: list_sessions failed, skipping this tick");
            return;
        }
    };
    let present_ids: HashSet<String> = sessions.iter().map(|s| s.session_id.clone()).collect();
    let by_id: HashMap<&str, &crate::adapter::Session> =
        sessions.iter().map(|s| (s.session_id.as_str(), s)).collect();

    scan_parents_for_spawns(state, &present_ids).await;
    attribute_new_children(&mut state.watched_parents, &mut state.relations, &state.known_session_ids, &present_ids);
    poll_children(state, &by_id).await;
    check_parent_reachability(state, &present_ids).await;

    state.known_session_ids = present_ids;
}

async fn scan_parents_for_spawns(state: &mut TrackerState, present_ids: &HashSet<String>) {
    let parent_ids: Vec<String> = state.watched_parents.keys().cloned().collect();
    for parent_id in parent_ids {
        if !present_ids.contains(&parent_id) {
            continue;
        }
        let transcript = match state.adapter.get_transcript(&parent_id).await {
            Ok(t) => t,
            Err(e) => {
                debug!(parent_id, error = %e, "scan_parents_for_spawns: get_transcript failed");
                continue;
            }
        };
        let watched = state.watched_parents.get_mut(&parent_id).unwrap();
        let new_entries = transcript.get(watched.transcript_cursor..).unwrap_or_default();
        let spawn_count = new_entries
            .iter()
            .flat_map(|e| e.content.tool_uses())
            .filter(|name| AGENT_SPAWN_TOOL_NAMES.contains(&name.as_str()))
            .count() as u32;
        if spawn_count > 0 {
            watched.pending_spawns += spawn_count;
            debug!(parent_id, spawn_count, "scan_parents_for_spawns: agent-spawn tool use observed");
        }
        watched.transcript_cursor = transcript.len();
    }
}

fn attribute_new_children(
    watched_parents: &mut HashMap<String, WatchedParent>,
    relations: &mut HashMap<String, SubSessionRelation>,
    known_session_ids: &HashSet<String>,
    present_ids: &HashSet<String>,
) {
    let newly_seen: Vec<String> = present_ids
        .difference(known_session_ids)
        .filter(|id| !watched_parents.contains_key(id.as_str()))
        .cloned()
        .collect();
    if newly_seen.is_empty() {
        return;
    }

    let mut pending_parents: Vec<String> =
        watched_parents.iter().filter(|(_, w)| w.pending_spawns > 0).map(|(id, _)| id.clone()).collect();
    pending_parents.sort();

    let mut children = newly_seen.into_iter();
    for parent_id in pending_parents.drain(..) {
        let watched = watched_parents.get_mut(&parent_id).unwrap();
        while watched.pending_spawns > 0 {
            let Some(child_id) = children.next() else { return };
            watched.pending_spawns -= 1;
            let relation = SubSessionRelation::new(child_id.clone(), parent_id.clone());
            info!(parent_id, child_id, "attribute_new_children: registered subsession");
            relations.insert(child_id, relation);
        }
    }
}

async fn poll_children(state: &mut TrackerState, by_id: &HashMap<&str, &crate::adapter::Session>) {
    let child_ids: Vec<String> = state
        .relations
        .iter()
        .filter(|(_, r)| r.status != SubSessionStatus::Returned)
        .map(|(id, _)| id.clone())
        .collect();

    for child_id in child_ids {
        let Some(session) = by_id.get(child_id.as_str()) else { continue };
        let is_running = session.is_running;
        let message_count = session.message_count;

        let relation = state.relations.get_mut(&child_id).unwrap();
        let grew = message_count > relation.message_count;
        relation.message_count = message_count;

        if !is_running && (relation.status == SubSessionStatus::Active || relation.status == SubSessionStatus::Idle) {
            mark_returned(state, &child_id).await;
            continue;
        }

        let relation = state.relations.get_mut(&child_id).unwrap();
        if grew {
            relation.status = SubSessionStatus::Active;
            relation.last_activity_at = Utc::now();
        } else if relation.status == SubSessionStatus::Active {
            let idle_for = Utc::now().signed_duration_since(relation.last_activity_at);
            if idle_for.to_std().unwrap_or_default() >= state.idle_threshold {
                relation.status = SubSessionStatus::Idle;
                state
                    .dispatcher
                    .emit(Event::SubsessionStatusChanged { child_session_id: child_id.clone(), status: "idle".into() })
                    .await;
            }
        }
    }
}

async fn mark_returned(state: &mut TrackerState, child_id: &str) {
    let result = state
        .adapter
        .get_transcript(child_id)
        .await
        .ok()
        .and_then(|transcript| {
            transcript.iter().rev().find(|e| e.kind == crate::adapter::TranscriptEntryKind::Assistant).map(|e| {
                let text = e.content.as_text();
                match parser::parse_multiple(&text).results.into_iter().find_map(|r| r.payload) {
                    Some(PhasePayload::Completion(c)) => c.output.unwrap_or(Value::String(text)),
                    Some(PhasePayload::Aggregation(a)) => a.merged_output.unwrap_or(Value::String(text)),
                    _ => Value::String(text),
                }
            })
        });

    let parent_id = {
        let relation = state.relations.get_mut(child_id).unwrap();
        relation.status = SubSessionStatus::Returned;
        relation.returned_result = result.clone();
        relation.parent_session_id.clone()
    };

    info!(child_id, parent_id, "mark_returned: subsession completed");
    state
        .dispatcher
        .emit(Event::SubsessionResultReturned { child_session_id: child_id.to_string() })
        .await;

    if state.forward_results {
        let summary = result.map(|v| v.to_string()).unwrap_or_else(|| "(no result captured)".into());
        let message = format!("[subsession {child_id} returned]\n{summary}");
        if let Err(e) = state.adapter.send_message(&parent_id, &message).await {
            warn!(parent_id, error = %e, "mark_returned: failed to forward result to parent");
        }
    }
}

async fn check_parent_reachability(state: &mut TrackerState, present_ids: &HashSet<String>) {
    let parent_ids: Vec<String> = state.watched_parents.keys().cloned().collect();
    for parent_id in parent_ids {
        let watched = state.watched_parents.get_mut(&parent_id).unwrap();
        if present_ids.contains(&parent_id) {
            watched.unreachable_since = None;
            continue;
        }
        let since = *watched.unreachable_since.get_or_insert_with(Utc::now);
        let elapsed = Utc::now().signed_duration_since(since);
        if elapsed.to_std().unwrap_or_default() < state.orphan_threshold {
            continue;
        }

        let child_ids: Vec<String> = state
            .relations
            .iter()
            .filter(|(_, r)| r.parent_session_id == parent_id && r.status != SubSessionStatus::Returned)
            .map(|(id, _)| id.clone())
            .collect();
        for child_id in child_ids {
            if let Some(relation) = state.relations.get_mut(&child_id) {
                relation.status = SubSessionStatus::Orphaned;
            }
            warn!(parent_id, child_id, "check_parent_reachability: parent unreachable, marking child orphaned");
            state.dispatcher.emit(Event::SubsessionOrphaned { child_session_id: child_id }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_starts_active_and_not_terminal() {
        let r = SubSessionRelation::new("child-1", "parent-1");
        assert_eq!(r.status, SubSessionStatus::Active);
    }

    #[test]
    fn attribute_new_children_consumes_one_pending_spawn_per_child() {
        let mut watched_parents = HashMap::new();
        watched_parents.insert(
            "parent-1".to_string(),
            WatchedParent { transcript_cursor: 0, pending_spawns: 1, unreachable_since: None },
        );
        let mut relations = HashMap::new();
        let known_session_ids: HashSet<String> = ["parent-1".to_string()].into_iter().collect();
        let present_ids: HashSet<String> = ["parent-1".to_string(), "child-new".to_string()].into_iter().collect();

        attribute_new_children(&mut watched_parents, &mut relations, &known_session_ids, &present_ids);

        assert!(relations.contains_key("child-new"));
        assert_eq!(relations["child-new"].parent_session_id, "parent-1");
        assert_eq!(watched_parents["parent-1"].pending_spawns, 0);
    }

    #[test]
    fn attribute_new_children_ignores_extra_children_without_pending_spawns() {
        let mut watched_parents = HashMap::new();
        watched_parents.insert(
            "parent-1".to_string(),
            WatchedParent { transcript_cursor: 0, pending_spawns: 0, unreachable_since: None },
        );
        let mut relations = HashMap::new();
        let known_session_ids: HashSet<String> = ["parent-1".to_string()].into_iter().collect();
        let present_ids: HashSet<String> = ["parent-1".to_string(), "child-new".to_string()].into_iter().collect();

        attribute_new_children(&mut watched_parents, &mut relations, &known_session_ids, &present_ids);

        assert!(relations.is_empty());
    }
}
