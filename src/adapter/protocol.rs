//! Wire types for the host app's remote-debug protocol (spec §6.2).
//!
//! The wire format itself (a JSON-RPC-shaped request/reply pair exchanged
//! over a WebSocket, Chrome-DevTools-Protocol style) is not dictated by the
//! spec — only the capability surface is (§6.2). This module fixes one
//! concrete, idiomatic encoding of that surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A session as reported by `getAllSessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub title: String,
    pub cwd: String,
    #[serde(rename = "lastActivityAt")]
    pub last_activity_at: String,
    #[serde(rename = "messageCount")]
    pub message_count: u64,
    pub model: Option<String>,
    #[serde(rename = "isRunning", default)]
    pub is_running: bool,
    #[serde(default)]
    pub is_generating: bool,
}

/// One entry in a session's transcript (spec §4.1 `getTranscript`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub kind: TranscriptEntryKind,
    pub content: TranscriptContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptEntryKind {
    User,
    Assistant,
}

/// Transcript content is either a plain string or a list of structured
/// blocks (text / tool_use), mirroring the host app's own transcript shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl TranscriptContent {
    /// Flatten to the plain text the response parser scans for sentinel
    /// blocks, ignoring non-text content.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.clone()),
                    ContentBlock::ToolUse { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Tool names used in this entry, for `Worker::tool_stats`.
    pub fn tool_uses(&self) -> Vec<String> {
        match self {
            Self::Text(_) => Vec::new(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { name, .. } => Some(name.clone()),
                    ContentBlock::Text { .. } => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { name: String, #[serde(default)] input: Value },
}

/// Options accepted by `startSessionWithMessage`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartSessionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Once,
    Always,
    Deny,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequest {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "toolName")]
    pub tool_name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    #[serde(rename = "questionId")]
    pub question_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub questions: Vec<QuestionPrompt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPrompt {
    pub question: String,
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionOption {
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Outbound request frame. `id` is assigned by the adapter's caller-facing
/// methods and used to correlate the matching `ReplyFrame`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestFrame {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Inbound reply frame.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyFrame {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}
