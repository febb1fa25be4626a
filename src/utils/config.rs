use serde::Deserialize;
use std::env;

/// Full server configuration, loaded from the environment (with `.env`
/// support). Every knob has a default; the server starts with no
/// environment at all.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP/WebSocket listener settings.
    pub server: ServerConfig,
    /// Research worker pool settings.
    pub worker: WorkerConfig,
    /// Optional LLM-backed query decomposition.
    pub decomposer: DecomposerConfig,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Research worker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of research workers draining the queue concurrently.
    pub workers: usize,
    /// Idle-poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Search hits processed per task.
    pub max_hits: usize,
    /// Characters of extracted text persisted per paper.
    pub text_cap: usize,
}

/// LLM decomposition settings. When `base_url` is unset the heuristic
/// decomposer is used exclusively.
#[derive(Debug, Clone, Deserialize)]
pub struct DecomposerConfig {
    /// Ollama-compatible generate endpoint base URL.
    pub base_url: Option<String>,
    /// Model name passed to the generate endpoint.
    pub model: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
            worker: WorkerConfig {
                workers: env::var("RESEARCH_WORKERS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
                poll_interval_ms: env::var("WORKER_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "250".to_string())
                    .parse()?,
                max_hits: env::var("SEARCH_MAX_HITS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                text_cap: env::var("PAPER_TEXT_CAP")
                    .unwrap_or_else(|_| "4000".to_string())
                    .parse()?,
            },
            decomposer: DecomposerConfig {
                base_url: env::var("DECOMPOSER_URL").ok(),
                model: env::var("DECOMPOSER_MODEL")
                    .unwrap_or_else(|_| "llama3.2:3b".to_string()),
            },
        })
    }
}
