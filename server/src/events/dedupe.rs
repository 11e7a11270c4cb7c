//! Delivery Deduplication
//!
//! Slack delivers events at least once. A short-lived marker per dedupe key
//! turns that into effectively-once replies within the marker TTL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fred::prelude::*;
use thiserror::Error;

/// Dedupe store errors.
#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),
}

/// Key/value store of recently seen deliveries.
#[async_trait]
pub trait DedupeStore: Send + Sync {
    /// Returns `true` if `key` was already recorded (the caller must skip the
    /// delivery). Otherwise records `key -> event_id` with the store TTL and
    /// returns `false`.
    async fn seen_or_record(&self, key: &str, event_id: &str) -> Result<bool, DedupeError>;

    /// Backend name reported by the health check.
    fn backend(&self) -> &'static str;
}

/// Redis-backed store using `SET NX EX`, so concurrent duplicates race on a
/// single atomic command and exactly one of them records the key.
#[derive(Clone)]
pub struct RedisDedupeStore {
    redis: Client,
    prefix: String,
    ttl_secs: u64,
}

impl RedisDedupeStore {
    pub fn new(redis: Client, prefix: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
            ttl_secs,
        }
    }

    fn build_key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

#[async_trait]
impl DedupeStore for RedisDedupeStore {
    async fn seen_or_record(&self, key: &str, event_id: &str) -> Result<bool, DedupeError> {
        let key = self.build_key(key);
        let recorded: Option<String> = self
            .redis
            .set(
                key.as_str(),
                event_id,
                Some(Expiration::EX(self.ttl_secs as i64)),
                Some(SetOptions::NX),
                false,
            )
            .await?;

        Ok(recorded.is_none())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Purge expired markers once the map grows past this many entries.
const PURGE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct Marker {
    event_id: String,
    expires_at: Instant,
}

/// In-process store for single-instance deployments and tests.
pub struct MemoryDedupeStore {
    entries: DashMap<String, Marker>,
    ttl: Duration,
}

impl MemoryDedupeStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of markers currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Event ID stored for a live marker.
    pub fn recorded_event(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|marker| marker.expires_at > Instant::now())
            .map(|marker| marker.event_id.clone())
    }

    fn purge_expired(&self, now: Instant) {
        self.entries.retain(|_, marker| marker.expires_at > now);
    }
}

#[async_trait]
impl DedupeStore for MemoryDedupeStore {
    async fn seen_or_record(&self, key: &str, event_id: &str) -> Result<bool, DedupeError> {
        let now = Instant::now();
        if self.entries.len() >= PURGE_THRESHOLD {
            self.purge_expired(now);
        }

        let marker = Marker {
            event_id: event_id.to_string(),
            expires_at: now + self.ttl,
        };

        // The entry guard holds the shard lock, so check and insert are atomic.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut existing) => {
                if existing.get().expires_at > now {
                    return Ok(true);
                }
                existing.insert(marker);
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(marker);
                Ok(false)
            }
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn second_delivery_is_seen() {
        let store = MemoryDedupeStore::new(Duration::from_secs(60));
        assert!(!store.seen_or_record("C1-1.0-2.0", "Ev1").await.unwrap());
        assert!(store.seen_or_record("C1-1.0-2.0", "Ev9").await.unwrap());
        assert!(!store.seen_or_record("C1-1.0-3.0", "Ev2").await.unwrap());
        assert_eq!(store.recorded_event("C1-1.0-2.0").as_deref(), Some("Ev1"));
    }

    #[tokio::test]
    async fn marker_expires_after_ttl() {
        let store = MemoryDedupeStore::new(Duration::from_millis(50));
        assert!(!store.seen_or_record("k", "Ev1").await.unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!store.seen_or_record("k", "Ev1").await.unwrap());
        assert!(store.seen_or_record("k", "Ev1").await.unwrap());
    }

    #[tokio::test]
    async fn expired_markers_are_purged() {
        let store = MemoryDedupeStore::new(Duration::from_millis(10));
        for i in 0..PURGE_THRESHOLD {
            store.seen_or_record(&format!("k{i}"), "Ev").await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.seen_or_record("fresh", "Ev").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_record_once() {
        let store = Arc::new(MemoryDedupeStore::new(Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.seen_or_record("same", "Ev1").await.unwrap()
            }));
        }

        let mut first = 0;
        for handle in handles {
            if !handle.await.unwrap() {
                first += 1;
            }
        }
        assert_eq!(first, 1);
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn redis_store_sets_once() {
        let redis = crate::db::create_redis_client("redis://localhost:6380")
            .await
            .expect("Failed to connect to Redis");
        let prefix = format!(
            "test:dedupe:{}",
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let store = RedisDedupeStore::new(redis.clone(), prefix.clone(), 2);

        assert!(!store.seen_or_record("C1-1.0-2.0", "Ev1").await.unwrap());
        assert!(store.seen_or_record("C1-1.0-2.0", "Ev1").await.unwrap());

        let ttl: i64 = redis.ttl(format!("{prefix}:C1-1.0-2.0")).await.unwrap();
        assert!(ttl > 0 && ttl <= 2);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!store.seen_or_record("C1-1.0-2.0", "Ev1").await.unwrap());
    }
}
