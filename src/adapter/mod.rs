//! RemoteRuntimeAdapter (spec §4.1) — the engine's sole channel into the
//! host app's remote-debug runtime.
//!
//! Structured the way the teacher's coordinator owns its socket: one
//! actor task is the single writer onto the wire, callers talk to it
//! through a cloneable handle over an mpsc channel, and each request gets
//! a dedicated oneshot reply slot keyed by a monotonic id.

mod error;
mod protocol;

pub use error::AdapterError;
pub use protocol::{
    ContentBlock, PermissionDecision, PermissionRequest, Question, QuestionOption, QuestionPrompt,
    ReplyFrame, RequestFrame, Session, StartSessionOptions, StartedSession, TranscriptContent,
    TranscriptEntry, TranscriptEntryKind,
};

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const EVALUATE_TIMEOUT: Duration = Duration::from_secs(30);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);
const LIST_SESSIONS_TTL: Duration = Duration::from_secs(2);

type Reply = Result<Value, AdapterError>;

enum AdapterCommand {
    Call {
        method: String,
        params: Value,
        reply: oneshot::Sender<Reply>,
    },
    ListSessions {
        force_refresh: bool,
        include_hidden: bool,
        reply: oneshot::Sender<Result<Vec<Session>, AdapterError>>,
    },
    Disconnect,
}

/// Handle to the adapter actor. Cheap to clone; safe for concurrent
/// callers (spec §4.1 "Concurrency").
#[derive(Clone)]
pub struct RemoteRuntimeAdapter {
    tx: mpsc::Sender<AdapterCommand>,
}

impl RemoteRuntimeAdapter {
    /// Discover a debug target at `discovery_url` (a CDP-style `/json/list`
    /// endpoint) and connect to the first target whose `url` contains
    /// `product_marker`.
    pub async fn connect(discovery_url: &str, product_marker: &str) -> Result<Self, AdapterError> {
        let target_ws_url = discover_target(discovery_url, product_marker).await?;
        Self::connect_ws(&target_ws_url).await
    }

    /// Connect directly to a known websocket debug endpoint.
    pub async fn connect_ws(ws_url: &str) -> Result<Self, AdapterError> {
        info!(%ws_url, "RemoteRuntimeAdapter::connect_ws: called");
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| AdapterError::DiscoveryFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(stream, rx));
        Ok(Self { tx })
    }

    async fn call(&self, method: &str, params: Value) -> Reply {
        debug!(%method, "RemoteRuntimeAdapter::call: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(AdapterCommand::Call {
                method: method.to_string(),
                params,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AdapterError::ConnectionLost)?;

        match tokio::time::timeout(EVALUATE_TIMEOUT, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AdapterError::ConnectionLost),
            Err(_) => Err(AdapterError::Timeout(EVALUATE_TIMEOUT)),
        }
    }

    /// `evaluate(expression) -> value` (spec §4.1).
    pub async fn evaluate(&self, expression: &str, await_promise: bool) -> Result<Value, AdapterError> {
        self.call("evaluate", json!({ "expression": expression, "awaitPromise": await_promise }))
            .await
    }

    /// Cached for 2s unless `force_refresh`; filters `__orch_` sessions
    /// unless `include_hidden` (spec §4.1).
    pub async fn list_sessions(&self, force_refresh: bool, include_hidden: bool) -> Result<Vec<Session>, AdapterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(AdapterCommand::ListSessions {
                force_refresh,
                include_hidden,
                reply: reply_tx,
            })
            .await
            .map_err(|_| AdapterError::ConnectionLost)?;
        reply_rx.await.map_err(|_| AdapterError::ConnectionLost)?
    }

    pub async fn get_transcript(&self, session_id: &str) -> Result<Vec<TranscriptEntry>, AdapterError> {
        let value = self.call("getTranscript", json!({ "sessionId": session_id })).await?;
        serde_json::from_value(value).map_err(|e| AdapterError::MalformedReply(e.to_string()))
    }

    pub async fn send_message(&self, session_id: &str, text: &str) -> Result<(), AdapterError> {
        self.call("sendMessage", json!({ "sessionId": session_id, "text": text, "attachments": [] }))
            .await?;
        Ok(())
    }

    pub async fn start_session_with_message(
        &self,
        cwd: &str,
        text: &str,
        options: StartSessionOptions,
    ) -> Result<StartedSession, AdapterError> {
        let value = self
            .call("startSessionWithMessage", json!({ "cwd": cwd, "text": text, "options": options }))
            .await?;
        serde_json::from_value(value).map_err(|e| AdapterError::MalformedReply(e.to_string()))
    }

    pub async fn switch_session(&self, session_id: &str) -> Result<(), AdapterError> {
        self.call("switchSession", json!({ "sessionId": session_id })).await?;
        Ok(())
    }

    pub async fn archive_session(&self, session_id: &str) -> Result<(), AdapterError> {
        self.call("archiveSession", json!({ "sessionId": session_id })).await?;
        Ok(())
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), AdapterError> {
        self.call("deleteSession", json!({ "sessionId": session_id })).await?;
        Ok(())
    }

    pub async fn respond_to_permission(
        &self,
        request_id: &str,
        decision: PermissionDecision,
    ) -> Result<(), AdapterError> {
        self.call("respondToPermission", json!({ "requestId": request_id, "decision": decision }))
            .await?;
        Ok(())
    }

    pub async fn respond_to_question(&self, question_id: &str, answers: Vec<String>) -> Result<(), AdapterError> {
        self.call("respondToQuestion", json!({ "questionId": question_id, "answers": answers }))
            .await?;
        Ok(())
    }

    pub async fn get_pending_permissions(&self) -> Result<Vec<PermissionRequest>, AdapterError> {
        let value = self.call("getPendingPermissions", json!({})).await?;
        serde_json::from_value(value).map_err(|e| AdapterError::MalformedReply(e.to_string()))
    }

    pub async fn get_pending_questions(&self) -> Result<Vec<Question>, AdapterError> {
        let value = self.call("getPendingQuestions", json!({})).await?;
        serde_json::from_value(value).map_err(|e| AdapterError::MalformedReply(e.to_string()))
    }

    /// Close the connection; in-flight and future calls fail with
    /// `ConnectionLost`. Reconnection is the caller's responsibility
    /// (spec §4.1 "no internal retry").
    pub async fn disconnect(&self) {
        let _ = self.tx.send(AdapterCommand::Disconnect).await;
    }
}

async fn discover_target(discovery_url: &str, product_marker: &str) -> Result<String, AdapterError> {
    debug!(%discovery_url, %product_marker, "discover_target: called");
    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()
        .map_err(|e| AdapterError::DiscoveryFailed(e.to_string()))?;

    let targets: Vec<Value> = client
        .get(discovery_url)
        .send()
        .await
        .map_err(|e| AdapterError::DiscoveryFailed(e.to_string()))?
        .json()
        .await
        .map_err(|e| AdapterError::DiscoveryFailed(e.to_string()))?;

    targets
        .iter()
        .find_map(|t| {
            let url = t.get("url")?.as_str()?;
            let ws_url = t.get("webSocketDebuggerUrl")?.as_str()?;
            if url.contains(product_marker) {
                Some(ws_url.to_string())
            } else {
                None
            }
        })
        .ok_or(AdapterError::NotAvailable)
}

struct SessionsCache {
    fetched_at: Instant,
    sessions: Vec<Session>,
}

async fn actor_loop(
    stream: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    mut rx: mpsc::Receiver<AdapterCommand>,
) {
    let (mut write, mut read) = stream.split();
    let mut pending: HashMap<u64, oneshot::Sender<Reply>> = HashMap::new();
    let mut next_id: u64 = 1;
    let mut cache: Option<SessionsCache> = None;
    let (cache_tx, mut cache_rx) = mpsc::unbounded_channel::<Vec<Session>>();

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("actor_loop: command channel closed, shutting down");
                    break;
                };
                match cmd {
                    AdapterCommand::Disconnect => {
                        info!("actor_loop: disconnect requested");
                        break;
                    }
                    AdapterCommand::Call { method, params, reply } => {
                        if matches!(method.as_str(), "sendMessage" | "startSessionWithMessage") {
                            cache = None;
                        }
                        let id = next_id;
                        next_id += 1;
                        let frame = RequestFrame { id, method, params };
                        let Ok(encoded) = serde_json::to_string(&frame) else {
                            let _ = reply.send(Err(AdapterError::MalformedReply("failed to encode request".into())));
                            continue;
                        };
                        if write.send(Message::Text(encoded)).await.is_err() {
                            let _ = reply.send(Err(AdapterError::ConnectionLost));
                            continue;
                        }
                        pending.insert(id, reply);
                    }
                    AdapterCommand::ListSessions { force_refresh, include_hidden, reply } => {
                        if !force_refresh {
                            if let Some(c) = &cache {
                                if c.fetched_at.elapsed() < LIST_SESSIONS_TTL {
                                    let sessions = filter_hidden(c.sessions.clone(), include_hidden);
                                    let _ = reply.send(Ok(sessions));
                                    continue;
                                }
                            }
                        }
                        let id = next_id;
                        next_id += 1;
                        let frame = RequestFrame { id, method: "getAllSessions".to_string(), params: json!({}) };
                        let Ok(encoded) = serde_json::to_string(&frame) else {
                            let _ = reply.send(Err(AdapterError::MalformedReply("failed to encode request".into())));
                            continue;
                        };
                        if write.send(Message::Text(encoded)).await.is_err() {
                            let _ = reply.send(Err(AdapterError::ConnectionLost));
                            continue;
                        }
                        let (inner_tx, inner_rx) = oneshot::channel();
                        pending.insert(id, inner_tx);
                        tokio::spawn(resolve_list_sessions(inner_rx, include_hidden, reply, cache_tx.clone()));
                    }
                }
            }
            Some(sessions) = cache_rx.recv() => {
                cache = Some(SessionsCache { fetched_at: Instant::now(), sessions });
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ReplyFrame>(&text) {
                            Ok(frame) => {
                                if let Some(sender) = pending.remove(&frame.id) {
                                    let outcome = match (frame.result, frame.error) {
                                        (_, Some(err)) => Err(AdapterError::ExecutionFault(err)),
                                        (Some(result), None) => Ok(result),
                                        (None, None) => Ok(Value::Null),
                                    };
                                    let _ = sender.send(outcome);
                                }
                            }
                            Err(e) => warn!(error = %e, "actor_loop: unparseable reply frame"),
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "actor_loop: websocket error, closing");
                        break;
                    }
                    None => {
                        info!("actor_loop: websocket closed by peer");
                        break;
                    }
                }
            }
        }
    }

    for (_, sender) in pending.into_iter() {
        let _ = sender.send(Err(AdapterError::ConnectionLost));
    }
    let _ = cache.take();
}

async fn resolve_list_sessions(
    inner_rx: oneshot::Receiver<Reply>,
    include_hidden: bool,
    reply: oneshot::Sender<Result<Vec<Session>, AdapterError>>,
    cache_tx: mpsc::UnboundedSender<Vec<Session>>,
) {
    let outcome = match inner_rx.await {
        Ok(Ok(value)) => serde_json::from_value::<Vec<Session>>(value).map_err(|e| AdapterError::MalformedReply(e.to_string())),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AdapterError::ConnectionLost),
    };
    let outcome = match outcome {
        Ok(sessions) => {
            let _ = cache_tx.send(sessions.clone());
            Ok(filter_hidden(sessions, include_hidden))
        }
        Err(e) => Err(e),
    };
    let _ = reply.send(outcome);
}

fn filter_hidden(sessions: Vec<Session>, include_hidden: bool) -> Vec<Session> {
    if include_hidden {
        sessions
    } else {
        sessions
            .into_iter()
            .filter(|s| !crate::domain::is_worker_session(&s.session_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_hidden_drops_worker_sessions() {
        let sessions = vec![
            Session {
                session_id: "main-1".into(),
                title: "Main".into(),
                cwd: "/tmp".into(),
                last_activity_at: "".into(),
                message_count: 0,
                model: None,
                is_running: false,
                is_generating: false,
            },
            Session {
                session_id: "__orch_o1_worker_t1".into(),
                title: "Worker".into(),
                cwd: "/tmp".into(),
                last_activity_at: "".into(),
                message_count: 0,
                model: None,
                is_running: false,
                is_generating: false,
            },
        ];
        let visible = filter_hidden(sessions.clone(), false);
        assert_eq!(visible.len(), 1);
        let all = filter_hidden(sessions, true);
        assert_eq!(all.len(), 2);
    }
}
