//! End-to-end orchestration tests.
//!
//! Exercise the full pipeline against the in-memory store: HTTP dispatch,
//! worker processing, activity relay and the voice round trip, with fixture
//! collaborators standing in for the network-facing seams.

use axum_test::TestServer;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use minerva::{
    agents::{CoordinatorAgent, HeuristicDecomposer, ResearchAgent},
    api::routes::create_router,
    collaborators::{
        FixtureSearchProvider, FixtureTextExtractor, NullTranscriber, PcmToneSynthesizer,
        PlaceholderMediaGenerator, SearchHit, SearchProvider,
    },
    store::{self, MemoryStore, Store, ACTIVITY_CHANNEL, RESEARCH_QUEUE},
    types::{AppError, DecomposeResponse, ReplyMessage, Result},
    utils::config::{Config, DecomposerConfig, ServerConfig, WorkerConfig},
    voice::{VoiceSession, VoiceTaskConsumer},
    AppState,
};

// ============= Fixtures =============

struct FailingSearch;

#[async_trait::async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
        Err(AppError::Search("backend down".to_string()))
    }
}

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        worker: WorkerConfig {
            workers: 1,
            poll_interval_ms: 5,
            max_hits: 5,
            text_cap: 4000,
        },
        decomposer: DecomposerConfig {
            base_url: None,
            model: "test".to_string(),
        },
    })
}

fn app_state(store: Arc<MemoryStore>) -> AppState {
    let coordinator = Arc::new(CoordinatorAgent::new(
        store.clone(),
        Arc::new(HeuristicDecomposer),
    ));
    AppState {
        config: test_config(),
        store,
        coordinator,
        synthesizer: Arc::new(PcmToneSynthesizer),
        transcriber: Arc::new(NullTranscriber),
    }
}

fn test_server(store: Arc<MemoryStore>) -> TestServer {
    let app = create_router().with_state(app_state(store));
    TestServer::new(app).expect("test server should start")
}

fn research_worker(store: Arc<MemoryStore>, pages: Vec<(String, String)>) -> ResearchAgent {
    let hits = pages
        .iter()
        .map(|(url, _)| SearchHit {
            title: Some("Fixture Paper".to_string()),
            url: Some(url.clone()),
        })
        .collect();
    ResearchAgent::new(
        store,
        Arc::new(FixtureSearchProvider::new(hits)),
        Arc::new(FixtureTextExtractor::new(pages)),
    )
    .with_poll_interval(Duration::from_millis(5))
}

async fn wait_for_event(
    sub: &mut Box<dyn store::Subscription>,
    status: &str,
) -> serde_json::Value {
    loop {
        let raw = tokio::time::timeout(Duration::from_secs(2), sub.next_message())
            .await
            .expect("expected an activity event in time")
            .expect("activity channel closed unexpectedly");
        let event: serde_json::Value = serde_json::from_str(&raw).unwrap();
        if event["status"] == status {
            return event;
        }
    }
}

// ============= Scenario: dispatch through HTTP, process, list =============

#[tokio::test]
async fn decompose_request_flows_through_worker_to_paper_records() {
    let store = MemoryStore::shared();
    let server = test_server(store.clone());
    let mut sub = store.subscribe(ACTIVITY_CHANNEL).await.unwrap();

    let response = server
        .post("/api/decompose")
        .json(&serde_json::json!({"query": "graph neural networks"}))
        .await;
    response.assert_status_ok();
    let body: DecomposeResponse = response.json();
    assert_eq!(body.tasks.len(), 5);
    assert_eq!(store.queue_len(RESEARCH_QUEUE), 5);

    let dispatched = wait_for_event(&mut sub, "dispatched").await;
    assert_eq!(dispatched["agent"], "coordinator");

    // Drain the queue with a worker that extracts text from every hit.
    let worker = research_worker(
        store.clone(),
        vec![("https://papers.example/a".to_string(), "full text".to_string())],
    );
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.listen_and_process(RESEARCH_QUEUE, cancel).await })
    };

    // One completed event per task.
    for _ in 0..5 {
        let event = wait_for_event(&mut sub, "completed").await;
        assert_eq!(event["agent"], "research");
    }
    cancel.cancel();
    handle.await.unwrap();

    let papers = server.get("/api/papers").await;
    papers.assert_status_ok();
    let listed: serde_json::Value = papers.json();
    assert_eq!(listed["papers"].as_array().unwrap().len(), 5);
    assert_eq!(listed["papers"][0]["title"], "Fixture Paper");
}

#[tokio::test]
async fn empty_query_is_rejected_before_dispatch() {
    let store = MemoryStore::shared();
    let server = test_server(store.clone());

    let response = server
        .post("/api/decompose")
        .json(&serde_json::json!({"query": "   "}))
        .await;
    response.assert_status_bad_request();
    assert_eq!(store.queue_len(RESEARCH_QUEUE), 0);
}

#[tokio::test]
async fn status_reports_queue_depths() {
    let store = MemoryStore::shared();
    let server = test_server(store.clone());

    store.push_task(RESEARCH_QUEUE, "{}").await.unwrap();
    store.push_task(RESEARCH_QUEUE, "{}").await.unwrap();

    let response = server.get("/status").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["research_queue_depth"], 2);
    assert_eq!(body["voice_queue_depth"], 0);
}

// ============= Scenario: search failure surfaces as an event =============

#[tokio::test]
async fn failed_search_ends_in_exactly_one_search_failed_event() {
    let store = MemoryStore::shared();
    let coordinator = CoordinatorAgent::new(store.clone(), Arc::new(HeuristicDecomposer));
    let mut sub = store.subscribe(ACTIVITY_CHANNEL).await.unwrap();

    coordinator
        .decompose_and_dispatch("doomed query", None)
        .await
        .unwrap();

    let worker = ResearchAgent::new(
        store.clone(),
        Arc::new(FailingSearch),
        Arc::new(FixtureTextExtractor::default()),
    )
    .with_poll_interval(Duration::from_millis(5));
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.listen_and_process(RESEARCH_QUEUE, cancel).await })
    };

    // One terminal event per task, no paper records, no last_search entry.
    for _ in 0..5 {
        let event = wait_for_event(&mut sub, "search_failed").await;
        assert!(event["meta"].as_str().unwrap().contains("backend down"));
    }
    cancel.cancel();
    handle.await.unwrap();

    assert!(store.keys_with_prefix("paper:").await.unwrap().is_empty());
}

// ============= Scenario: voice round trip =============

#[tokio::test]
async fn voice_utterance_gets_exactly_one_response() {
    let store = MemoryStore::shared();
    let coordinator = Arc::new(CoordinatorAgent::new(
        store.clone(),
        Arc::new(HeuristicDecomposer),
    ));
    let consumer = Arc::new(
        VoiceTaskConsumer::new(
            store.clone(),
            coordinator,
            Arc::new(PlaceholderMediaGenerator::default()),
        )
        .with_poll_interval(Duration::from_millis(5)),
    );

    let cancel = CancellationToken::new();
    let handle = {
        let consumer = consumer.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { consumer.run(cancel).await })
    };

    let (session, mut sub) = VoiceSession::open(store.clone()).await.unwrap();
    session
        .submit_transcript("find recent work on photonic computing")
        .await
        .unwrap();

    let raw = tokio::time::timeout(Duration::from_secs(2), sub.next_message())
        .await
        .expect("voice consumer should reply")
        .unwrap();
    let ReplyMessage::AgentResponse(response) = serde_json::from_str(&raw).unwrap();
    assert!(response.text.unwrap().contains("Dispatched 5 research tasks"));
    assert!(sub.try_next().is_none());

    // The research tasks it spawned are really on the queue.
    assert_eq!(store.queue_len(RESEARCH_QUEUE), 5);

    cancel.cancel();
    handle.await.unwrap();
}

// ============= Ordering and race properties =============

#[tokio::test]
async fn queue_preserves_order_across_batches() {
    let store = MemoryStore::shared();
    let coordinator = CoordinatorAgent::new(store.clone(), Arc::new(HeuristicDecomposer));

    let first = coordinator.decompose_and_dispatch("alpha", None).await.unwrap();
    let second = coordinator.decompose_and_dispatch("beta", None).await.unwrap();

    let mut popped = Vec::new();
    while let Some(raw) = store.pop_task(RESEARCH_QUEUE).await.unwrap() {
        let envelope: minerva::TaskEnvelope = serde_json::from_str(&raw).unwrap();
        popped.push(envelope.task_id);
    }

    let expected: Vec<_> = first.into_iter().chain(second).collect();
    assert_eq!(popped, expected);
}

#[tokio::test]
async fn concurrent_session_dispatches_leave_one_winner() {
    let store = MemoryStore::shared();
    let coordinator = Arc::new(CoordinatorAgent::new(
        store.clone(),
        Arc::new(HeuristicDecomposer),
    ));

    let a = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .decompose_and_dispatch("first request", Some("shared"))
                .await
                .unwrap()
        })
    };
    let b = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            coordinator
                .decompose_and_dispatch("second request", Some("shared"))
                .await
                .unwrap()
        })
    };
    let (ids_a, ids_b) = (a.await.unwrap(), b.await.unwrap());

    // Last writer wins: the session record matches exactly one batch; the
    // other batch's ids survive only in the queue.
    let raw = store
        .get_hash_field(&store::session_key("shared"), "tasks")
        .await
        .unwrap()
        .unwrap();
    let recorded: Vec<uuid::Uuid> = serde_json::from_str(&raw).unwrap();
    assert!(recorded == ids_a || recorded == ids_b);
    assert_eq!(store.queue_len(RESEARCH_QUEUE), 10);
}

// ============= Degraded store =============

#[tokio::test]
async fn offline_store_loses_tasks_without_crashing_agents() {
    let store = MemoryStore::shared();
    let coordinator = CoordinatorAgent::new(store.clone(), Arc::new(HeuristicDecomposer));

    store.set_offline(true);
    let ids = coordinator
        .decompose_and_dispatch("lost to the void", Some("s"))
        .await
        .unwrap();
    assert_eq!(ids.len(), 5);

    store.set_offline(false);
    // Nothing was actually enqueued or recorded, and the dispatch event
    // was counted as dropped.
    assert_eq!(store.queue_len(RESEARCH_QUEUE), 0);
    assert_eq!(
        store
            .get_hash_field(&store::session_key("s"), "tasks")
            .await
            .unwrap(),
        None
    );
    assert!(store.dropped_event_count() >= 1);
}
