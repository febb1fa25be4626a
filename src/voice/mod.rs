//! Voice round-trip bridge.
//!
//! Two halves built on the same queue/channel primitives as the research
//! pipeline:
//!
//! - [`VoiceSession`] lives on the connection side. It mints an ephemeral
//!   session id per websocket connection and subscribes the private reply
//!   channel *before* any task is enqueued, so the single response cannot
//!   be lost in a race. Finalized transcripts become `voice_input` tasks on
//!   the dedicated voice queue.
//! - [`VoiceTaskConsumer`] is the always-running counterpart: it pops voice
//!   tasks, classifies intent with a keyword heuristic, and publishes
//!   exactly one `agent_response` on the task's reply channel. If handling
//!   fails mid-way the peer waits indefinitely — a known gap, preserved.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::CoordinatorAgent;
use crate::collaborators::MediaGenerator;
use crate::store::{self, Store, Subscription, ACTIVITY_CHANNEL, VOICE_QUEUE};
use crate::types::{
    ActivityEvent, AgentResponse, AppError, ReplyMessage, Result, TaskEnvelope, TaskKind,
    VoiceTask,
};

// ============= Connection Side =============

/// Per-connection voice session state.
///
/// Lifecycle is bound to the websocket connection: created on connect,
/// reply channel subscribed immediately, discarded on disconnect (dropping
/// the returned [`Subscription`] unsubscribes).
pub struct VoiceSession {
    /// Ephemeral identifier for this connection.
    pub session_id: String,
    /// Private reply channel name (`session:<id>:response`).
    pub reply_channel: String,
    store: Arc<dyn Store>,
}

impl VoiceSession {
    /// Mint a session and subscribe its reply channel.
    pub async fn open(store: Arc<dyn Store>) -> Result<(Self, Box<dyn Subscription>)> {
        let session_id = Uuid::new_v4().to_string();
        let reply_channel = store::response_channel(&session_id);
        // Subscribe before anything can publish to the channel.
        let subscription = store.subscribe(&reply_channel).await?;
        tracing::info!(session_id, "voice session opened");
        Ok((
            Self {
                session_id,
                reply_channel,
                store,
            },
            subscription,
        ))
    }

    /// Forward one finalized transcript into the voice task queue.
    ///
    /// Publishes a `transcribed` activity event and enqueues a
    /// `voice_input` envelope carrying this session's reply channel.
    /// Returns the task id.
    pub async fn submit_transcript(&self, transcript: &str) -> Result<Uuid> {
        let event = ActivityEvent::new("voice_handler", "transcribed")
            .with("text", json!(transcript))
            .with("session_id", json!(self.session_id));
        self.store
            .publish(ACTIVITY_CHANNEL, &event.to_json())
            .await?;

        let envelope = TaskEnvelope::new(TaskKind::VoiceInput(VoiceTask {
            query: transcript.to_string(),
            session_id: self.session_id.clone(),
            response_channel: self.reply_channel.clone(),
        }));
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| AppError::Decode(format!("envelope encode failed: {e}")))?;
        self.store.push_task(VOICE_QUEUE, &payload).await?;
        tracing::info!(session_id = %self.session_id, task_id = %envelope.task_id, "voice task enqueued");
        Ok(envelope.task_id)
    }
}

// ============= Consumer Side =============

/// Intent derived from a transcript by keyword heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceIntent {
    Diagram,
    Video,
    Research,
}

fn classify_intent(transcript: &str) -> VoiceIntent {
    let lowered = transcript.to_lowercase();
    if lowered.contains("diagram") {
        VoiceIntent::Diagram
    } else if lowered.contains("video") {
        VoiceIntent::Video
    } else {
        VoiceIntent::Research
    }
}

/// Always-running consumer of the `tasks:coordinator_voice_input` queue.
pub struct VoiceTaskConsumer {
    store: Arc<dyn Store>,
    coordinator: Arc<CoordinatorAgent>,
    media: Arc<dyn MediaGenerator>,
    poll_interval: Duration,
}

impl VoiceTaskConsumer {
    /// Create a consumer with the default 250 ms poll interval.
    pub fn new(
        store: Arc<dyn Store>,
        coordinator: Arc<CoordinatorAgent>,
        media: Arc<dyn MediaGenerator>,
    ) -> Self {
        Self {
            store,
            coordinator,
            media,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Idle-wait duration after an empty poll.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll the voice queue and handle tasks until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(queue = VOICE_QUEUE, "voice consumer started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.store.pop_task(VOICE_QUEUE).await {
                Ok(Some(raw)) => self.handle_raw_task(&raw).await,
                Ok(None) | Err(_) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        tracing::info!(queue = VOICE_QUEUE, "voice consumer stopped");
    }

    async fn handle_raw_task(&self, raw: &str) {
        let envelope: TaskEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed voice envelope");
                return;
            }
        };
        match envelope.kind {
            TaskKind::VoiceInput(task) => {
                if let Err(e) = self.handle_voice_task(&task).await {
                    // The peer on the reply channel now waits forever; this
                    // failure mode has no timeout protocol.
                    tracing::warn!(task_id = %envelope.task_id, error = %e, "voice task failed");
                }
            }
            TaskKind::SearchAndParse(_) => {
                tracing::debug!(task_id = %envelope.task_id, "ignoring search task on voice queue");
            }
        }
    }

    /// Handle one utterance: route by intent and publish exactly one
    /// `agent_response` on the task's reply channel.
    pub async fn handle_voice_task(&self, task: &VoiceTask) -> Result<()> {
        let response = match classify_intent(&task.query) {
            VoiceIntent::Diagram => {
                let media = self.media.generate_diagram(&task.query).await?;
                AgentResponse {
                    text: Some("Here is the architecture diagram you asked for.".to_string()),
                    media_url: Some(media.url),
                    media_type: Some(media.media_type),
                }
            }
            VoiceIntent::Video => {
                let media = self.media.generate_video(&task.query).await?;
                AgentResponse {
                    text: Some("Here is an example video.".to_string()),
                    media_url: Some(media.url),
                    media_type: Some(media.media_type),
                }
            }
            VoiceIntent::Research => {
                let task_ids = self
                    .coordinator
                    .decompose_and_dispatch(&task.query, Some(&task.session_id))
                    .await?;
                AgentResponse {
                    text: Some(format!(
                        "Dispatched {} research tasks for \"{}\".",
                        task_ids.len(),
                        task.query
                    )),
                    media_url: None,
                    media_type: None,
                }
            }
        };

        let reply = ReplyMessage::AgentResponse(response);
        let payload = serde_json::to_string(&reply)
            .map_err(|e| AppError::Decode(format!("reply encode failed: {e}")))?;
        self.store.publish(&task.response_channel, &payload).await?;
        Ok(())
    }
}
