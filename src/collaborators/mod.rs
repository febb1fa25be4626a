//! External collaborator interfaces.
//!
//! The orchestration core treats search, page-text extraction, speech and
//! media generation as external collaborators, modeled only through the
//! traits they expose. Production implementations live in the submodules;
//! tests inject hand-rolled mocks.

use async_trait::async_trait;

use crate::types::Result;

/// Text extraction from fetched pages.
pub mod extract;
/// Placeholder-backed media generation.
pub mod media;
/// Web search providers.
pub mod search;
/// Speech synthesis and transcription seams.
pub mod speech;

pub use extract::{FixtureTextExtractor, PageTextExtractor};
pub use media::PlaceholderMediaGenerator;
pub use search::{DaedraSearchProvider, FixtureSearchProvider};
pub use speech::{NullTranscriber, PcmToneSynthesizer};

/// One search result hit. Hits without a URL are skipped by consumers.
#[derive(Debug, Clone, Default)]
pub struct SearchHit {
    /// Page title, when the provider reports one.
    pub title: Option<String>,
    /// Page URL.
    pub url: Option<String>,
}

/// Web search. A failed call is a terminal per-task failure; the worker
/// surfaces it as a `search_failed` event and does not retry.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a search and return the raw hit list.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Page-text extraction. Empty or failed extraction means "skip this hit",
/// never a task failure, so the interface has no error channel.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Fetch a URL and return its plain text, or `None` when nothing
    /// usable could be extracted.
    async fn extract(&self, url: &str) -> Option<String>;
}

/// Text-to-speech synthesis for the voice round trip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize audio bytes for a response text.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Streaming speech-to-text seam. Audio chunks go in; finalized transcripts
/// come out, and only finalized transcripts are forwarded into the voice
/// task queue.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Feed one audio chunk; returns a transcript once an utterance is
    /// finalized, `None` while still listening.
    async fn accept_chunk(&self, chunk: &[u8]) -> Result<Option<String>>;
}

/// A generated media artifact.
#[derive(Debug, Clone)]
pub struct MediaReference {
    /// Where the artifact can be fetched.
    pub url: String,
    /// Media kind (`image`, `video`).
    pub media_type: String,
}

/// Diagram and video generation for voice requests.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Generate an architecture diagram for a description.
    async fn generate_diagram(&self, description: &str) -> Result<MediaReference>;
    /// Generate a short example video for a description.
    async fn generate_video(&self, description: &str) -> Result<MediaReference>;
}
