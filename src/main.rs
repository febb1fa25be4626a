//! Minerva server binary.

use clap::Parser;
use minerva::{
    agents::{CoordinatorAgent, Decomposer, HeuristicDecomposer, HttpDecomposer, ResearchAgent},
    api::routes::create_router,
    collaborators::{
        DaedraSearchProvider, NullTranscriber, PageTextExtractor, PcmToneSynthesizer,
        PlaceholderMediaGenerator,
    },
    store::{MemoryStore, RESEARCH_QUEUE},
    voice::VoiceTaskConsumer,
    AppState, Config,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

/// Minerva - Multi-Agent Research Orchestration Server
#[derive(Parser, Debug)]
#[command(
    name = "minerva-server",
    version,
    about = "Minerva - Multi-Agent Research Orchestration Server",
    long_about = "A task-orchestration and event-relay server for research automation:\n\
                  query decomposition, search-and-parse workers, a shared activity\n\
                  event stream, and a voice round-trip bridge."
)]
struct Cli {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("minerva=info,tower_http=info"));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = Config::from_env().map_err(|e| anyhow::anyhow!("config error: {e}"))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = Arc::new(config);

    // Shared store; every agent and handler gets the same instance.
    let store = MemoryStore::shared();

    let decomposer: Arc<dyn Decomposer> = match &config.decomposer.base_url {
        Some(base_url) => {
            tracing::info!(base_url, model = %config.decomposer.model, "using LLM decomposer");
            Arc::new(HttpDecomposer::new(
                base_url.clone(),
                config.decomposer.model.clone(),
            ))
        }
        None => {
            tracing::info!("using heuristic decomposer");
            Arc::new(HeuristicDecomposer)
        }
    };
    let coordinator = Arc::new(CoordinatorAgent::new(store.clone(), decomposer));

    let cancel = CancellationToken::new();
    let mut workers = Vec::new();

    // Research worker pool.
    let poll_interval = Duration::from_millis(config.worker.poll_interval_ms);
    for _ in 0..config.worker.workers.max(1) {
        let agent = ResearchAgent::new(
            store.clone(),
            Arc::new(DaedraSearchProvider::new(config.worker.max_hits)),
            Arc::new(PageTextExtractor::new()),
        )
        .with_max_hits(config.worker.max_hits)
        .with_text_cap(config.worker.text_cap)
        .with_poll_interval(poll_interval);
        let cancel = cancel.clone();
        workers.push(tokio::spawn(async move {
            agent.listen_and_process(RESEARCH_QUEUE, cancel).await;
        }));
    }

    // Voice task consumer.
    let consumer = VoiceTaskConsumer::new(
        store.clone(),
        coordinator.clone(),
        Arc::new(PlaceholderMediaGenerator::default()),
    )
    .with_poll_interval(poll_interval);
    {
        let cancel = cancel.clone();
        workers.push(tokio::spawn(async move {
            consumer.run(cancel).await;
        }));
    }

    let state = AppState {
        config: config.clone(),
        store,
        coordinator,
        synthesizer: Arc::new(PcmToneSynthesizer::default()),
        transcriber: Arc::new(NullTranscriber),
    };

    let app = create_router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "minerva server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    // The shutdown signal already cancelled the workers; wait them out.
    for worker in workers {
        let _ = worker.await;
    }
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    cancel.cancel();
}
