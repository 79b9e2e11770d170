//! A minimal fake host runtime for integration tests: a WebSocket server
//! speaking the same request/reply wire shape as `RemoteRuntimeAdapter`
//! expects, backed by an in-memory session table the test can script
//! directly instead of driving a real AI session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use swarmhost::adapter::{ReplyFrame, RequestFrame, Session, TranscriptContent, TranscriptEntry, TranscriptEntryKind};

#[derive(Default)]
struct SessionRecord {
    transcript: Vec<TranscriptEntry>,
    message_count: u64,
    is_running: bool,
}

#[derive(Default)]
struct HostState {
    sessions: HashMap<String, SessionRecord>,
    next_id: u64,
}

/// Handle to a running fake host. Dropping it leaves the server task
/// running until the process exits; tests are short-lived so this is
/// never reclaimed.
pub struct FakeHost {
    pub ws_url: String,
    state: Arc<Mutex<HostState>>,
}

impl FakeHost {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake host listener");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(Mutex::new(HostState::default()));
        let accept_state = state.clone();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let ws = tokio_tungstenite::accept_async(stream).await.expect("websocket handshake");
                handle_connection(ws, accept_state).await;
            }
        });

        Self { ws_url: format!("ws://{addr}"), state }
    }

    /// Append an assistant transcript entry to `session_id`, as if the
    /// session's model had just produced `text`. Appears to a subsequent
    /// `getTranscript` call.
    pub fn push_assistant(&self, session_id: &str, text: &str) {
        let mut state = self.state.lock().unwrap();
        let record = state.sessions.entry(session_id.to_string()).or_default();
        record.transcript.push(TranscriptEntry {
            kind: TranscriptEntryKind::Assistant,
            content: TranscriptContent::Text(text.to_string()),
            uuid: None,
            timestamp: None,
            usage: None,
        });
        record.message_count += 1;
        record.is_running = false;
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().sessions.keys().cloned().collect()
    }

    /// Registers a session directly against host state, as if a different
    /// client had started it — bypasses the adapter under test entirely, so
    /// its `list_sessions` cache has no invalidating call to react to.
    pub fn add_bare_session(&self, session_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.sessions.entry(session_id.to_string()).or_default().is_running = true;
    }
}

async fn handle_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    state: Arc<Mutex<HostState>>,
) {
    let (mut write, mut read) = ws.split();
    while let Some(Ok(msg)) = read.next().await {
        let Message::Text(text) = msg else { continue };
        let Ok(frame) = serde_json::from_str::<RequestFrame>(&text) else { continue };
        let reply = handle_request(&state, &frame.method, frame.params);
        let encoded = serde_json::to_string(&ReplyFrame { id: frame.id, result: reply.ok(), error: reply.err() })
            .expect("encode reply frame");
        if write.send(Message::Text(encoded)).await.is_err() {
            break;
        }
    }
}

fn handle_request(state: &Arc<Mutex<HostState>>, method: &str, params: Value) -> Result<Value, String> {
    let mut state = state.lock().unwrap();
    match method {
        "startSessionWithMessage" => {
            let name = params.get("options").and_then(|o| o.get("name")).and_then(Value::as_str).map(str::to_string);
            let session_id = name.unwrap_or_else(|| {
                state.next_id += 1;
                format!("main-{}", state.next_id)
            });
            state.sessions.entry(session_id.clone()).or_default().is_running = true;
            Ok(json!({ "sessionId": session_id }))
        }
        "sendMessage" => Ok(Value::Null),
        "getTranscript" => {
            let session_id = params.get("sessionId").and_then(Value::as_str).unwrap_or_default();
            let transcript = state.sessions.get(session_id).map(|r| r.transcript.clone()).unwrap_or_default();
            serde_json::to_value(transcript).map_err(|e| e.to_string())
        }
        "getAllSessions" => {
            let sessions: Vec<Session> = state
                .sessions
                .iter()
                .map(|(id, r)| Session {
                    session_id: id.clone(),
                    title: id.clone(),
                    cwd: "/tmp".to_string(),
                    last_activity_at: String::new(),
                    message_count: r.message_count,
                    model: None,
                    is_running: r.is_running,
                    is_generating: false,
                })
                .collect();
            serde_json::to_value(sessions).map_err(|e| e.to_string())
        }
        "archiveSession" | "deleteSession" => {
            let session_id = params.get("sessionId").and_then(Value::as_str).unwrap_or_default();
            state.sessions.remove(session_id);
            Ok(Value::Null)
        }
        other => Err(format!("fake host: method not implemented: {other}")),
    }
}
