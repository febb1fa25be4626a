//! # Minerva - Multi-Agent Research Orchestration Server
//!
//! A task-orchestration and event-relay layer for research automation:
//! a coordinator decomposes free-text research requests into search tasks,
//! worker loops drain the task queues, and every agent narrates its
//! progress on a shared activity channel that websocket observers can tap.
//! A voice bridge runs the same pipeline from spoken requests, answering
//! each utterance with exactly one agent response.
//!
//! ## Overview
//!
//! Minerva can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `minerva-server` binary
//! 2. **As a library** - Embed the agents and store in your own runtime
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use minerva::agents::{CoordinatorAgent, HeuristicDecomposer};
//! use minerva::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::shared();
//!     let coordinator = CoordinatorAgent::new(store.clone(), Arc::new(HeuristicDecomposer));
//!
//!     // Five search tasks land on the research queue.
//!     let task_ids = coordinator
//!         .decompose_and_dispatch("photonic neural networks", None)
//!         .await?;
//!     println!("dispatched {} tasks", task_ids.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Coordinator, research worker, planning and analysis agents
//! - [`api`] - REST API handlers and routes
//! - [`collaborators`] - Search, extraction, speech and media seams
//! - [`store`] - Shared queue/record/pub-sub store abstraction
//! - [`voice`] - Voice session and voice task consumer
//! - [`ws`] - WebSocket relay and voice bridge endpoints
//! - [`types`] - Wire-format types and error handling
//!
//! ## Architecture
//!
//! Components share nothing but the [`store::Store`]: queues carry task
//! envelopes, hashes hold session and paper records, TTL'd strings cache
//! synthesis results, and pub/sub channels carry fire-and-forget events.
//! Any component can be run against [`store::MemoryStore`] in isolation.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Agent implementations (coordinator, research, planning, analysis).
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// External collaborator seams (search, extraction, speech, media).
pub mod collaborators;
/// Shared store abstraction and in-memory backend.
pub mod store;
/// Core wire-format types and error handling.
pub mod types;
/// Configuration utilities.
pub mod utils;
/// Voice session and queue consumer.
pub mod voice;
/// WebSocket endpoints.
pub mod ws;

// Re-export commonly used types
pub use agents::{AnalysisAgent, CoordinatorAgent, PlanningAgent, ResearchAgent};
pub use store::{MemoryStore, Store};
pub use types::{AppError, Result, TaskEnvelope, TaskKind};
pub use utils::Config;

use crate::collaborators::{SpeechSynthesizer, Transcriber};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Shared store backing queues, records and pub/sub.
    pub store: Arc<dyn Store>,
    /// Coordinator used by the decompose endpoint and the voice consumer.
    pub coordinator: Arc<CoordinatorAgent>,
    /// Text-to-speech for the voice bridge.
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Streaming speech-to-text for the voice bridge.
    pub transcriber: Arc<dyn Transcriber>,
}
