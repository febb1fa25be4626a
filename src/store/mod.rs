//! Shared store abstraction.
//!
//! Every component in the orchestration layer shares nothing but a [`Store`]:
//! list push/pop as task queues, hash fields as structured records, TTL'd
//! strings as ephemeral caches, and channel publish/subscribe as the event
//! bus. The store is always an injected capability object, never a global,
//! so components stay testable in isolation against [`MemoryStore`].
//!
//! Contract notes:
//! - Each operation is independently retryable and must not assume the
//!   others succeed.
//! - When the backing connection is absent, every operation degrades to a
//!   well-defined no-op / empty result instead of an error propagating
//!   through agent logic.
//! - `publish` is fire-and-forget: with zero subscribers the message is
//!   discarded, and the loss is surfaced through an observability counter
//!   rather than being invisible.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::types::Result;

/// In-memory store backend.
pub mod memory;

pub use memory::MemoryStore;

// ============= Key and Channel Names =============
//
// These names are part of the wire contract and must remain stable.

/// Queue of `search_and_parse` tasks.
pub const RESEARCH_QUEUE: &str = "tasks:research";
/// Queue of `voice_input` tasks.
pub const VOICE_QUEUE: &str = "tasks:coordinator_voice_input";
/// Shared broadcast topic for agent status events.
pub const ACTIVITY_CHANNEL: &str = "agent:activity";
/// Hash indexing the most recent found-id list per literal query string.
pub const LAST_SEARCH_KEY: &str = "last_search";
/// Prefix of paper record hashes.
pub const PAPER_PREFIX: &str = "paper:";

/// Hash holding per-session state (`session:<id>`).
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Private reply channel for one voice session (`session:<id>:response`).
pub fn response_channel(session_id: &str) -> String {
    format!("session:{session_id}:response")
}

/// Hash holding one extracted paper (`paper:<id>`).
pub fn paper_key(paper_id: &str) -> String {
    format!("{PAPER_PREFIX}{paper_id}")
}

/// TTL'd synthesis record for a set of papers (`synthesis:<ids>`).
pub fn synthesis_key(paper_ids: &[String]) -> String {
    format!("synthesis:{}", paper_ids.join(","))
}

/// TTL'd analysis record keyed by a coarse timestamp (`analysis:<unix-ts>`).
pub fn analysis_key(timestamp: i64) -> String {
    format!("analysis:{timestamp}")
}

// ============= Store Trait =============

/// Uniform operations over the shared key-value/list/hash/pub-sub store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a serialized envelope to the tail of a queue. Queues are
    /// created implicitly on first push.
    async fn push_task(&self, queue: &str, payload: &str) -> Result<()>;

    /// Non-blocking pop from the head of a queue; `None` when empty or when
    /// the connection is down. Never raises on empty.
    async fn pop_task(&self, queue: &str) -> Result<Option<String>>;

    /// Set one field of a hash, creating the hash if needed. Last writer
    /// wins; there are no transactions anywhere in this layer.
    async fn set_hash_field(&self, hash: &str, field: &str, value: &str) -> Result<()>;

    /// Read one field of a hash.
    async fn get_hash_field(&self, hash: &str, field: &str) -> Result<Option<String>>;

    /// Read all fields of a hash; empty map when absent.
    async fn get_all_hash_fields(&self, hash: &str) -> Result<HashMap<String, String>>;

    /// Set a string value that expires unconditionally after `ttl`,
    /// whether or not it was ever read.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read a string value; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Fire-and-forget broadcast. Returns the number of subscribers the
    /// message reached; zero means it was discarded.
    async fn publish(&self, channel: &str, message: &str) -> Result<usize>;

    /// Subscribe to a channel. Dropping the subscription unsubscribes.
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>>;

    /// List record keys with a given prefix (hashes and strings). Used by
    /// the read-side API, not by the hot paths.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Number of entries currently waiting on a queue. Zero when the
    /// connection is down, like every other degraded read.
    async fn queue_depth(&self, queue: &str) -> Result<usize>;
}

/// A live subscription handle on one channel.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message; `None` once the channel is closed.
    /// Messages missed while lagging are skipped, never redelivered.
    async fn next_message(&mut self) -> Option<String>;

    /// Non-blocking check for a pending message.
    fn try_next(&mut self) -> Option<String>;

    /// Channel this subscription is bound to.
    fn channel(&self) -> &str;
}
