//! Research worker.
//!
//! A long-running consumer on the `tasks:research` queue. Each iteration
//! pops one envelope, decodes it, and dispatches by task kind; an empty
//! poll suspends the loop for a short interval instead of spinning. Decode
//! failures are logged and dropped — there is no dead-letter queue and no
//! retry budget — and every `search_and_parse` task ends in exactly one
//! terminal activity event.

use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{SearchProvider, TextExtractor};
use crate::store::{self, Store, ACTIVITY_CHANNEL, LAST_SEARCH_KEY};
use crate::types::{ActivityEvent, Result, SearchTask, TaskEnvelope, TaskKind};

/// Worker that executes `search_and_parse` tasks.
pub struct ResearchAgent {
    store: Arc<dyn Store>,
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn TextExtractor>,
    max_hits: usize,
    text_cap: usize,
    poll_interval: Duration,
}

impl ResearchAgent {
    /// Create a worker with the default hit cap (5), text cap (4000 chars)
    /// and poll interval (250 ms).
    pub fn new(
        store: Arc<dyn Store>,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            store,
            search,
            extractor,
            max_hits: 5,
            text_cap: 4000,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Bound the number of search hits processed per task.
    pub fn with_max_hits(mut self, max_hits: usize) -> Self {
        self.max_hits = max_hits;
        self
    }

    /// Cap the stored text length per paper record, in characters.
    pub fn with_text_cap(mut self, text_cap: usize) -> Self {
        self.text_cap = text_cap;
        self
    }

    /// Idle-wait duration after an empty poll.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll `queue_name` and process tasks until cancelled.
    ///
    /// Never raises on an empty queue; store errors on the poll path are
    /// logged and treated as an empty poll.
    pub async fn listen_and_process(&self, queue_name: &str, cancel: CancellationToken) {
        tracing::info!(queue = queue_name, "research worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.store.pop_task(queue_name).await {
                Ok(Some(raw)) => self.handle_raw_task(&raw).await,
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(queue = queue_name, error = %e, "poll failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        tracing::info!(queue = queue_name, "research worker stopped");
    }

    /// Decode and dispatch one raw envelope. Malformed envelopes are
    /// dropped; the loop is never interrupted by a bad task.
    async fn handle_raw_task(&self, raw: &str) {
        let envelope: TaskEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed task envelope");
                return;
            }
        };

        match envelope.kind {
            TaskKind::SearchAndParse(task) => {
                if let Err(e) = self.search_and_parse(&task).await {
                    tracing::warn!(task_id = %envelope.task_id, error = %e, "task failed");
                }
            }
            // Voice input belongs to the voice consumer's queue; a stray
            // envelope here is ignored.
            TaskKind::VoiceInput(_) => {
                tracing::debug!(task_id = %envelope.task_id, "ignoring voice_input task");
            }
        }
    }

    /// Execute one `search_and_parse` task.
    ///
    /// Terminal outcomes, each published exactly once on the activity
    /// channel: `completed` with the found-id list, `no_pdfs_found` when
    /// nothing usable was extracted, or `search_failed` when the search
    /// call itself failed.
    async fn search_and_parse(&self, task: &SearchTask) -> Result<()> {
        let hits = match self.search.search(&task.query).await {
            Ok(hits) => hits,
            Err(e) => {
                let event = ActivityEvent::new("research", "search_failed")
                    .with("meta", json!(e.to_string()));
                self.store.publish(ACTIVITY_CHANNEL, &event.to_json()).await?;
                return Ok(());
            }
        };

        let mut found = Vec::new();
        for hit in hits.into_iter().take(self.max_hits) {
            let Some(url) = hit.url else { continue };
            let Some(text) = self.extractor.extract(&url).await else {
                continue;
            };
            if text.is_empty() {
                continue;
            }

            let paper_id = make_paper_id(&task.query);
            let key = store::paper_key(&paper_id);
            let title = hit.title.unwrap_or_default();
            self.store.set_hash_field(&key, "title", &title).await?;
            self.store.set_hash_field(&key, "url", &url).await?;
            self.store
                .set_hash_field(&key, "text", truncate_chars(&text, self.text_cap))
                .await?;
            found.push(paper_id);
        }

        if found.is_empty() {
            let event = ActivityEvent::new("research", "no_pdfs_found")
                .with("query", json!(task.query));
            self.store.publish(ACTIVITY_CHANNEL, &event.to_json()).await?;
        } else {
            let id_list = serde_json::to_string(&found).unwrap_or_default();
            self.store
                .set_hash_field(LAST_SEARCH_KEY, &task.query, &id_list)
                .await?;
            let event =
                ActivityEvent::new("research", "completed").with("found", json!(found));
            self.store.publish(ACTIVITY_CHANNEL, &event.to_json()).await?;
        }
        Ok(())
    }
}

/// Compose a paper id from a truncated query prefix and a coarse timestamp.
///
/// The prefix+timestamp shape is collision-prone under burst load, so a
/// short random suffix is appended to keep ids unique within one second.
fn make_paper_id(query: &str) -> String {
    let prefix: String = query.chars().take(32).collect();
    let timestamp = chrono::Utc::now().timestamp();
    let suffix: u16 = rand::rng().random();
    format!("{prefix}:{timestamp}:{suffix:04x}")
}

/// Truncate on a character boundary without allocating when possible.
fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
