//! Core types shared across the orchestration layer.
//!
//! The task envelope and activity event formats defined here are part of the
//! wire contract: every message placed on a queue or published on a channel
//! is the JSON serialization of one of these types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

// ============= Task Envelope =============

/// The serialized record placed on a task queue.
///
/// Wire format: `{"task_id": "<uuid>", "type": "<kind>", "payload": {...}}`.
/// Envelopes that fail to deserialize into this shape are dropped by
/// consumers; the worker loop logs the failure and continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    /// Generated at enqueue time; uniqueness relies on random collision
    /// avoidance only.
    pub task_id: Uuid,
    /// Task type tag plus its payload.
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl TaskEnvelope {
    /// Wrap a task payload in a fresh envelope.
    pub fn new(kind: TaskKind) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            kind,
        }
    }
}

/// Closed set of task types. Dispatch is a compile-time-checked match
/// rather than a string comparison with a silent default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TaskKind {
    /// Run a web search for a query and persist any usable hits.
    SearchAndParse(SearchTask),
    /// A finalized voice transcript awaiting intent routing.
    VoiceInput(VoiceTask),
}

/// Payload of a `search_and_parse` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTask {
    /// The search query string.
    pub query: String,
    /// Session that dispatched this task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Payload of a `voice_input` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceTask {
    /// The finalized transcript.
    pub query: String,
    /// The voice session that produced the utterance.
    pub session_id: String,
    /// Private channel the single response must be published on.
    pub response_channel: String,
}

// ============= Activity Events =============

/// A fire-and-forget status message on the shared activity channel.
///
/// There is no persistence and no delivery guarantee; publishes with zero
/// subscribers are discarded (and counted by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Name of the publishing agent (`coordinator`, `research`, ...).
    pub agent: String,
    /// Outcome tag (`dispatched`, `completed`, `search_failed`, ...).
    pub status: String,
    /// Free-form event fields.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ActivityEvent {
    /// Create an event with no extra fields.
    pub fn new(agent: &str, status: &str) -> Self {
        Self {
            agent: agent.to_string(),
            status: status.to_string(),
            fields: serde_json::Map::new(),
        }
    }

    /// Attach an extra field.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Serialize for publishing. Events are plain JSON objects and cannot
    /// fail to serialize.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============= Voice Round-Trip Messages =============

/// Message published on a per-session reply channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyMessage {
    /// The single response to one voice utterance.
    AgentResponse(AgentResponse),
}

/// Text and/or media response to a voice utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Spoken/displayed response text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Reference to generated media, if the utterance routed to a
    /// media-generation collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Media kind (`image`, `video`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Message sent to the websocket peer by the voice bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Forwarded response text (synthesized audio is sent separately as a
    /// binary frame).
    TextResponse {
        /// The response text.
        text: String,
    },
    /// Forwarded media reference.
    MediaUrl {
        /// Location of the generated media.
        url: String,
        /// Media kind (`image`, `video`).
        media_type: String,
    },
}

// ============= API Request/Response Types =============

/// Body of `POST /api/decompose`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecomposeRequest {
    /// Free-text research query.
    pub query: String,
    /// Optional session to record the dispatched task ids under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response of `POST /api/decompose`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecomposeResponse {
    /// Task ids in dispatch order.
    pub tasks: Vec<Uuid>,
}

/// One stored paper record, as listed by `GET /api/papers`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaperSummary {
    /// Store key of the record (`paper:<id>`).
    pub id: String,
    /// Title reported by the search hit.
    pub title: String,
    /// Source URL.
    pub url: String,
}

/// Response of `GET /api/papers`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PapersResponse {
    /// Most recently stored paper records.
    pub papers: Vec<PaperSummary>,
}

// ============= Error Types =============

/// Crate-wide error type.
///
/// Nothing in the orchestration core is fatal to the process: failures are
/// caught and logged at the task or connection boundary, and surfaced to
/// websocket peers only as `*_failed` activity events.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Backing store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Malformed envelope or record payload.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Search collaborator failure (terminal for the task).
    #[error("Search error: {0}")]
    Search(String),

    /// Text extraction failure (skips the hit, not the task).
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Speech synthesis or transcription failure.
    #[error("Speech error: {0}")]
    Speech(String),

    /// Decomposition collaborator failure (always recoverable via the
    /// heuristic fallback).
    #[error("Decomposition error: {0}")]
    Decomposition(String),

    /// Media generation failure.
    #[error("Media error: {0}")]
    Media(String),

    /// Caller provided invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::Store(msg)
            | AppError::Decode(msg)
            | AppError::Search(msg)
            | AppError::Extraction(msg)
            | AppError::Speech(msg)
            | AppError::Decomposition(msg)
            | AppError::Media(msg)
            | AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_wire_format() {
        let envelope = TaskEnvelope::new(TaskKind::SearchAndParse(SearchTask {
            query: "graph neural networks".to_string(),
            session_id: Some("abc".to_string()),
        }));

        let raw = serde_json::to_string(&envelope).unwrap();
        assert!(raw.contains("\"type\":\"search_and_parse\""));
        assert!(raw.contains("\"payload\""));
        assert!(raw.contains("\"task_id\""));

        let decoded: TaskEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded.task_id, envelope.task_id);
        match decoded.kind {
            TaskKind::SearchAndParse(task) => {
                assert_eq!(task.query, "graph neural networks");
                assert_eq!(task.session_id.as_deref(), Some("abc"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn unknown_task_type_fails_to_decode() {
        let raw = r#"{"task_id":"1f2e9c1a-58e6-4d1c-9a3b-3f6f0a2a9a11","type":"reticulate","payload":{}}"#;
        assert!(serde_json::from_str::<TaskEnvelope>(raw).is_err());
    }

    #[test]
    fn activity_event_carries_extra_fields() {
        let event = ActivityEvent::new("research", "completed")
            .with("found", serde_json::json!(["a", "b"]));
        let raw = event.to_json();

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["agent"], "research");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["found"][1], "b");
    }

    #[test]
    fn reply_message_is_tagged_agent_response() {
        let reply = ReplyMessage::AgentResponse(AgentResponse {
            text: Some("hello".to_string()),
            ..Default::default()
        });
        let raw = serde_json::to_string(&reply).unwrap();

        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "agent_response");
        assert_eq!(value["text"], "hello");
        assert!(value.get("media_url").is_none());
    }
}
