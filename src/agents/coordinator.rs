//! Coordinator agent.
//!
//! Decomposes an incoming research request into a set of search tasks,
//! pushes them onto the `tasks:research` queue, records the session to
//! task-id mapping, and emits one dispatch event for the batch.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::store::{self, Store, ACTIVITY_CHANNEL, RESEARCH_QUEUE};
use crate::types::{ActivityEvent, AppError, Result, SearchTask, TaskEnvelope, TaskKind};

// ============= Decomposition Strategies =============

/// Pluggable query decomposition.
///
/// Implementations may call out to an LLM; failure is always recoverable
/// because the coordinator falls back to [`heuristic_tasks`].
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Break a query into simple, actionable search tasks.
    async fn decompose(&self, query: &str) -> Result<Vec<String>>;
}

/// Deterministic fallback decomposition: the original query plus fixed
/// query-mutation variants. Always succeeds, always five tasks.
pub fn heuristic_tasks(query: &str) -> Vec<String> {
    vec![
        query.to_string(),
        format!("{query} arXiv pdf"),
        format!("{query} review article"),
        format!("{query} survey"),
        format!("{query} site:arxiv.org"),
    ]
}

/// Decomposer that always uses the heuristic variants.
pub struct HeuristicDecomposer;

#[async_trait]
impl Decomposer for HeuristicDecomposer {
    async fn decompose(&self, query: &str) -> Result<Vec<String>> {
        Ok(heuristic_tasks(query))
    }
}

/// LLM-backed decomposer talking to an Ollama-compatible generate endpoint.
pub struct HttpDecomposer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpDecomposer {
    /// Create a decomposer against `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }

    fn prompt(query: &str) -> String {
        format!(
            "Decompose the following research query into a short list of simple, \
             actionable search tasks. Return only a JSON array of strings.\n\nQuery: {query}"
        )
    }

    /// Parse the model output: a JSON string array, or one task per
    /// non-empty line when the model ignores the format instruction.
    fn parse_tasks(output: &str) -> Vec<String> {
        if let Ok(tasks) = serde_json::from_str::<Vec<String>>(output.trim()) {
            return tasks;
        }
        output
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', ' ']).to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

#[async_trait]
impl Decomposer for HttpDecomposer {
    async fn decompose(&self, query: &str) -> Result<Vec<String>> {
        let body = json!({
            "model": self.model,
            "prompt": Self::prompt(query),
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Decomposition(format!("generate request failed: {e}")))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Decomposition(format!("generate response unreadable: {e}")))?;

        let output = value
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Decomposition("generate response missing text".to_string()))?;

        Ok(Self::parse_tasks(output))
    }
}

// ============= Coordinator =============

/// Coordinator for the research pipeline.
pub struct CoordinatorAgent {
    store: Arc<dyn Store>,
    decomposer: Arc<dyn Decomposer>,
}

impl CoordinatorAgent {
    /// Create a coordinator with the given decomposition strategy.
    pub fn new(store: Arc<dyn Store>, decomposer: Arc<dyn Decomposer>) -> Self {
        Self { store, decomposer }
    }

    /// Decompose a high-level request into search tasks and dispatch them.
    ///
    /// A failing (or empty-handed) decomposition strategy never prevents
    /// dispatch: the heuristic fallback kicks in unconditionally. When a
    /// session id is given, the session record's `tasks` field is
    /// overwritten with the full id list; concurrent dispatches for the
    /// same session therefore race and the loser's list is lost.
    ///
    /// Returns the generated task ids in dispatch order.
    pub async fn decompose_and_dispatch(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<Vec<Uuid>> {
        let tasks = match self.decomposer.decompose(query).await {
            Ok(tasks) if !tasks.is_empty() => tasks,
            Ok(_) => {
                tracing::warn!(query, "decomposer returned no tasks, using heuristic");
                heuristic_tasks(query)
            }
            Err(e) => {
                tracing::warn!(query, error = %e, "decomposition failed, using heuristic");
                heuristic_tasks(query)
            }
        };

        let mut pushed_task_ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            let envelope = TaskEnvelope::new(TaskKind::SearchAndParse(SearchTask {
                query: task,
                session_id: session_id.map(str::to_string),
            }));
            let payload = serde_json::to_string(&envelope)
                .map_err(|e| AppError::Decode(format!("envelope encode failed: {e}")))?;
            self.store.push_task(RESEARCH_QUEUE, &payload).await?;
            pushed_task_ids.push(envelope.task_id);
        }

        if let Some(session_id) = session_id {
            let id_list = serde_json::to_string(&pushed_task_ids)
                .map_err(|e| AppError::Decode(format!("task id encode failed: {e}")))?;
            self.store
                .set_hash_field(&store::session_key(session_id), "tasks", &id_list)
                .await?;
        }

        let event = ActivityEvent::new("coordinator", "dispatched")
            .with("tasks", json!(pushed_task_ids));
        self.store
            .publish(ACTIVITY_CHANNEL, &event.to_json())
            .await?;

        tracing::info!(
            query,
            count = pushed_task_ids.len(),
            "dispatched research tasks"
        );
        Ok(pushed_task_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::TaskEnvelope;

    struct FailingDecomposer;

    #[async_trait]
    impl Decomposer for FailingDecomposer {
        async fn decompose(&self, _query: &str) -> Result<Vec<String>> {
            Err(AppError::Decomposition("model unavailable".to_string()))
        }
    }

    struct EmptyDecomposer;

    #[async_trait]
    impl Decomposer for EmptyDecomposer {
        async fn decompose(&self, _query: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn coordinator(store: Arc<MemoryStore>, decomposer: Arc<dyn Decomposer>) -> CoordinatorAgent {
        CoordinatorAgent::new(store, decomposer)
    }

    #[tokio::test]
    async fn heuristic_dispatch_pushes_five_envelopes() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(HeuristicDecomposer));

        let ids = agent
            .decompose_and_dispatch("graph neural networks", None)
            .await
            .unwrap();

        assert_eq!(ids.len(), 5);
        assert_eq!(store.queue_len(RESEARCH_QUEUE), 5);
    }

    #[tokio::test]
    async fn envelopes_preserve_dispatch_order_and_query_variants() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(HeuristicDecomposer));

        let ids = agent.decompose_and_dispatch("qnc", None).await.unwrap();

        let expected_queries = heuristic_tasks("qnc");
        for (i, expected) in expected_queries.iter().enumerate() {
            let raw = store.pop_task(RESEARCH_QUEUE).await.unwrap().unwrap();
            let envelope: TaskEnvelope = serde_json::from_str(&raw).unwrap();
            assert_eq!(envelope.task_id, ids[i]);
            match envelope.kind {
                TaskKind::SearchAndParse(task) => assert_eq!(&task.query, expected),
                other => panic!("unexpected kind: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn session_record_equals_returned_id_list() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(HeuristicDecomposer));

        let ids = agent
            .decompose_and_dispatch("spiking networks", Some("sess-1"))
            .await
            .unwrap();

        let raw = store
            .get_hash_field(&store::session_key("sess-1"), "tasks")
            .await
            .unwrap()
            .unwrap();
        let recorded: Vec<Uuid> = serde_json::from_str(&raw).unwrap();
        assert_eq!(recorded, ids);
    }

    #[tokio::test]
    async fn failing_decomposer_falls_back_to_heuristic() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(FailingDecomposer));

        let ids = agent.decompose_and_dispatch("anything", None).await.unwrap();
        assert_eq!(ids.len(), 5);
        assert_eq!(store.queue_len(RESEARCH_QUEUE), 5);
    }

    #[tokio::test]
    async fn empty_decomposition_falls_back_to_heuristic() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(EmptyDecomposer));

        let ids = agent.decompose_and_dispatch("anything", None).await.unwrap();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn dispatch_publishes_one_dispatched_event() {
        let store = MemoryStore::shared();
        let agent = coordinator(store.clone(), Arc::new(HeuristicDecomposer));
        let mut sub = store.subscribe(ACTIVITY_CHANNEL).await.unwrap();

        let ids = agent.decompose_and_dispatch("q", None).await.unwrap();

        let raw = sub.next_message().await.unwrap();
        let event: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(event["agent"], "coordinator");
        assert_eq!(event["status"], "dispatched");
        assert_eq!(event["tasks"].as_array().unwrap().len(), ids.len());
        // Exactly one event for the batch.
        assert_eq!(sub.try_next(), None);
    }

    #[test]
    fn parse_tasks_accepts_json_array_or_lines() {
        let tasks = HttpDecomposer::parse_tasks(r#"["a", "b"]"#);
        assert_eq!(tasks, vec!["a".to_string(), "b".to_string()]);

        let tasks = HttpDecomposer::parse_tasks("- first task\n\n- second task\n");
        assert_eq!(tasks, vec!["first task".to_string(), "second task".to_string()]);
    }
}
