//! Embedded store implementation.
//!
//! Backs the [`Store`](super::Store) trait with process-local data
//! structures: `parking_lot` maps for queues, hashes and TTL'd strings, and
//! one tokio broadcast channel per pub/sub topic. All operations are safe
//! under concurrent access from any number of worker loops.
//!
//! The store also models the degraded mode of a remote backend: flipping
//! [`MemoryStore::set_offline`] makes every operation a silent no-op, which
//! is exactly how agent logic must behave when the real connection is down
//! (tasks vanish, nothing crashes).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::{Store, Subscription};
use crate::types::Result;

/// Capacity of each broadcast channel; subscribers that lag further than
/// this lose messages, consistent with the accepted-loss broadcast design.
const CHANNEL_BUFFER_SIZE: usize = 256;

#[derive(Debug)]
struct ExpiringValue {
    value: String,
    expires_at: Option<Instant>,
}

impl ExpiringValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// Process-local [`Store`] backend.
#[derive(Default)]
pub struct MemoryStore {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    strings: Mutex<HashMap<String, ExpiringValue>>,
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    dropped_events: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`, ready for injection.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate the backing connection going away (or coming back). While
    /// offline every operation is a no-op returning the empty result.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of published messages that reached zero subscribers and were
    /// discarded. Accepted loss, but observable.
    pub fn dropped_event_count(&self) -> u64 {
        self.dropped_events.load(Ordering::SeqCst)
    }

    /// Current number of subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of entries currently waiting on a queue.
    pub fn queue_len(&self, queue: &str) -> usize {
        self.queues.lock().get(queue).map(|q| q.len()).unwrap_or(0)
    }

    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn push_task(&self, queue: &str, payload: &str) -> Result<()> {
        if self.is_offline() {
            return Ok(());
        }
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(payload.to_string());
        Ok(())
    }

    async fn pop_task(&self, queue: &str) -> Result<Option<String>> {
        if self.is_offline() {
            return Ok(None);
        }
        Ok(self
            .queues
            .lock()
            .get_mut(queue)
            .and_then(|q| q.pop_front()))
    }

    async fn set_hash_field(&self, hash: &str, field: &str, value: &str) -> Result<()> {
        if self.is_offline() {
            return Ok(());
        }
        self.hashes
            .lock()
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_hash_field(&self, hash: &str, field: &str) -> Result<Option<String>> {
        if self.is_offline() {
            return Ok(None);
        }
        Ok(self
            .hashes
            .lock()
            .get(hash)
            .and_then(|fields| fields.get(field).cloned()))
    }

    async fn get_all_hash_fields(&self, hash: &str) -> Result<HashMap<String, String>> {
        if self.is_offline() {
            return Ok(HashMap::new());
        }
        Ok(self.hashes.lock().get(hash).cloned().unwrap_or_default())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if self.is_offline() {
            return Ok(());
        }
        self.strings.lock().insert(
            key.to_string(),
            ExpiringValue {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.is_offline() {
            return Ok(None);
        }
        let now = Instant::now();
        let mut strings = self.strings.lock();
        match strings.get(key) {
            Some(entry) if entry.is_expired(now) => {
                // Lazy expiry: reap on read.
                strings.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize> {
        if self.is_offline() {
            self.dropped_events.fetch_add(1, Ordering::SeqCst);
            return Ok(0);
        }
        let delivered = self
            .channels
            .lock()
            .get(channel)
            .map(|tx| tx.send(message.to_string()).unwrap_or(0))
            .unwrap_or(0);
        if delivered == 0 {
            self.dropped_events.fetch_add(1, Ordering::SeqCst);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn Subscription>> {
        if self.is_offline() {
            // A subscription on a dead channel: immediately closed.
            let (_tx, rx) = broadcast::channel(1);
            return Ok(Box::new(MemorySubscription {
                channel: channel.to_string(),
                rx,
            }));
        }
        let rx = self
            .channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_BUFFER_SIZE).0)
            .subscribe();
        Ok(Box::new(MemorySubscription {
            channel: channel.to_string(),
            rx,
        }))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        if self.is_offline() {
            return Ok(Vec::new());
        }
        let mut keys: Vec<String> = self
            .hashes
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.extend(
            self.strings
                .lock()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned(),
        );
        keys.sort();
        Ok(keys)
    }

    async fn queue_depth(&self, queue: &str) -> Result<usize> {
        if self.is_offline() {
            return Ok(0);
        }
        Ok(self.queue_len(queue))
    }
}

struct MemorySubscription {
    channel: String,
    rx: broadcast::Receiver<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next_message(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                // Lagged receivers skip lost messages and keep going.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        channel = %self.channel,
                        skipped,
                        "subscription lagged, messages lost"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn try_next(&mut self) -> Option<String> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_is_fifo() {
        let store = MemoryStore::new();
        store.push_task("q", "t1").await.unwrap();
        store.push_task("q", "t2").await.unwrap();
        store.push_task("q", "t3").await.unwrap();

        assert_eq!(store.pop_task("q").await.unwrap().as_deref(), Some("t1"));
        assert_eq!(store.pop_task("q").await.unwrap().as_deref(), Some("t2"));
        assert_eq!(store.pop_task("q").await.unwrap().as_deref(), Some("t3"));
        assert_eq!(store.pop_task("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn pop_from_unknown_queue_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.pop_task("never-pushed").await.unwrap(), None);
    }

    #[tokio::test]
    async fn hash_fields_are_last_writer_wins() {
        let store = MemoryStore::new();
        store.set_hash_field("session:1", "tasks", "[1]").await.unwrap();
        store.set_hash_field("session:1", "tasks", "[2]").await.unwrap();

        assert_eq!(
            store.get_hash_field("session:1", "tasks").await.unwrap().as_deref(),
            Some("[2]")
        );
        let all = store.get_all_hash_fields("session:1").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_values_expire_unconditionally() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("synthesis:a", "{}", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(store.get("synthesis:a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(3601)).await;
        assert_eq!(store.get("synthesis:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_counted_loss() {
        let store = MemoryStore::new();
        assert_eq!(store.publish("agent:activity", "{}").await.unwrap(), 0);
        assert_eq!(store.dropped_event_count(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_live_subscription() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("agent:activity").await.unwrap();

        let delivered = store.publish("agent:activity", "hello").await.unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(sub.next_message().await.as_deref(), Some("hello"));
        assert_eq!(store.dropped_event_count(), 0);
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let store = MemoryStore::new();
        let sub = store.subscribe("agent:activity").await.unwrap();
        assert_eq!(store.subscriber_count("agent:activity"), 1);

        drop(sub);
        assert_eq!(store.subscriber_count("agent:activity"), 0);
        // Subsequent publishes are discarded again.
        assert_eq!(store.publish("agent:activity", "{}").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn try_next_is_non_blocking() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("c").await.unwrap();

        assert_eq!(sub.try_next(), None);
        store.publish("c", "m").await.unwrap();
        assert_eq!(sub.try_next().as_deref(), Some("m"));
        assert_eq!(sub.try_next(), None);
    }

    #[tokio::test]
    async fn offline_store_degrades_to_noops() {
        let store = MemoryStore::new();
        store.set_offline(true);

        store.push_task("q", "t").await.unwrap();
        assert_eq!(store.pop_task("q").await.unwrap(), None);
        store.set_hash_field("h", "f", "v").await.unwrap();
        assert_eq!(store.get_hash_field("h", "f").await.unwrap(), None);
        assert!(store.get_all_hash_fields("h").await.unwrap().is_empty());
        store.set_with_ttl("k", "v", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.publish("c", "m").await.unwrap(), 0);
        assert!(store.keys_with_prefix("").await.unwrap().is_empty());

        // Nothing leaked into the maps while offline.
        store.set_offline(false);
        assert_eq!(store.pop_task("q").await.unwrap(), None);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_with_prefix_lists_paper_records() {
        let store = MemoryStore::new();
        store.set_hash_field("paper:a", "title", "A").await.unwrap();
        store.set_hash_field("paper:b", "title", "B").await.unwrap();
        store.set_hash_field("session:1", "tasks", "[]").await.unwrap();

        let keys = store.keys_with_prefix("paper:").await.unwrap();
        assert_eq!(keys, vec!["paper:a".to_string(), "paper:b".to_string()]);
    }
}
