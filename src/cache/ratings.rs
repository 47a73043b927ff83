//! Expiring item-id → rating cache
//!
//! The whole map is serialized as one JSON object under a versioned key in
//! the backing store, pruned of expired entries before every write.

use super::store::KeyValueStore;
use crate::error::{OverlayError, OverlayResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Backing store key; bump the suffix when the entry layout changes
pub const CACHE_KEY: &str = "ageRatingOverlayCache-v1";

/// One cached rating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Rating code as reported by the server
    pub rating: String,

    /// When the rating was resolved (epoch milliseconds on disk)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(rating: impl Into<String>) -> Self {
        Self {
            rating: rating.into(),
            timestamp: Utc::now(),
        }
    }

    /// Check whether the entry has outlived `ttl` at `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.timestamp > ttl
    }
}

/// Rating cache with age-based expiry
pub struct RatingCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// Held from snapshot to store write so persists land in order
    persist: tokio::sync::Mutex<()>,
}

impl RatingCache {
    /// Load the cache from `store`
    ///
    /// A missing, unreadable or corrupt payload yields an empty cache.
    pub async fn load(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        let entries = match store.get(CACHE_KEY).await {
            Ok(Some(payload)) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&payload)
            {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding unparsable rating cache: {}", e);
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Failed to read rating cache: {}", e);
                HashMap::new()
            }
        };

        debug!("Loaded {} cached rating(s)", entries.len());

        Self {
            store,
            ttl,
            entries: Mutex::new(entries),
            persist: tokio::sync::Mutex::new(()),
        }
    }

    /// Get a fresh entry for `id`
    pub fn get(&self, id: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock();
        entries
            .get(id)
            .filter(|entry| !entry.is_expired(self.ttl, Utc::now()))
            .cloned()
    }

    /// Get the fresh rating for `id`
    pub fn rating(&self, id: &str) -> Option<String> {
        self.get(id).map(|entry| entry.rating)
    }

    /// Store a freshly resolved rating and persist the cache
    pub async fn put(&self, id: &str, rating: &str) {
        self.entries
            .lock()
            .insert(id.to_string(), CacheEntry::new(rating));
        self.flush().await;
    }

    /// Drop expired entries, then write the remaining map to the store
    ///
    /// Returns the number of entries pruned.
    pub async fn prune_and_persist(&self) -> OverlayResult<usize> {
        let _persist = self.persist.lock().await;
        let (pruned, payload) = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            let now = Utc::now();
            entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
            (before - entries.len(), serde_json::to_string(&*entries)?)
        };

        self.store
            .set(CACHE_KEY, &payload)
            .await
            .map_err(|e| OverlayError::CachePersist(e.to_string()))?;

        if pruned > 0 {
            debug!("Pruned {} expired rating(s)", pruned);
        }
        Ok(pruned)
    }

    /// Prune and persist, logging instead of failing
    pub async fn flush(&self) {
        if let Err(e) = self.prune_and_persist().await {
            warn!("{}", e);
        }
    }

    /// Remove every entry and the persisted payload
    pub async fn clear(&self) -> OverlayResult<usize> {
        let _persist = self.persist.lock().await;
        let removed = {
            let mut entries = self.entries.lock();
            let count = entries.len();
            entries.clear();
            count
        };
        self.store.remove(CACHE_KEY).await?;
        info!("Cleared {} cached rating(s)", removed);
        Ok(removed)
    }

    /// All entries, sorted by item id
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
