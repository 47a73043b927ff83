//! Process-wide overlay state
//!
//! One [`OverlayContext`] owns the rating cache, the backoff controller and
//! the per-view seen/pending sets. Components receive it explicitly; its
//! lifecycle is `init` (load the cache, start periodic persistence) and
//! `teardown` (stop persistence, flush the cache).

use crate::backoff::Backoff;
use crate::cache::{KeyValueStore, RatingCache};
use crate::config::Config;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Item ids already scheduled in the current view
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: Mutex<HashSet<String>>,
}

impl SeenSet {
    /// Mark `id` as seen; false if it already was
    pub fn insert(&self, id: &str) -> bool {
        self.ids.lock().insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    /// Forget everything, starting a new view
    pub fn clear(&self) {
        self.ids.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Item ids with a resolution in flight
#[derive(Debug, Default)]
pub struct PendingSet {
    ids: Mutex<HashSet<String>>,
}

impl PendingSet {
    /// Claim `id` for resolution
    ///
    /// Returns `None` if another resolution already holds it. The id is
    /// released when the returned guard drops.
    pub fn claim(&self, id: &str) -> Option<PendingClaim<'_>> {
        if self.ids.lock().insert(id.to_string()) {
            Some(PendingClaim {
                set: self,
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive claim on a pending id
#[derive(Debug)]
pub struct PendingClaim<'a> {
    set: &'a PendingSet,
    id: String,
}

impl Drop for PendingClaim<'_> {
    fn drop(&mut self) {
        self.set.ids.lock().remove(&self.id);
    }
}

/// Shared state for one running overlay
pub struct OverlayContext {
    config: Config,
    cache: RatingCache,
    backoff: Backoff,
    seen: SeenSet,
    pending: PendingSet,
    persist_task: Mutex<Option<JoinHandle<()>>>,
}

impl OverlayContext {
    /// Load the cache from `store` and start periodic persistence
    pub async fn init(config: Config, store: Arc<dyn KeyValueStore>) -> Arc<Self> {
        let ctx = Arc::new(Self::new(config, store).await);

        let interval = ctx.config.cache.persist_interval();
        let task = tokio::spawn(persist_periodically(Arc::downgrade(&ctx), interval));
        *ctx.persist_task.lock() = Some(task);

        info!("Overlay context ready ({} cached rating(s))", ctx.cache.len());
        ctx
    }

    /// Build a context without background persistence
    pub async fn new(config: Config, store: Arc<dyn KeyValueStore>) -> Self {
        let cache = RatingCache::load(store, config.cache.ttl()).await;
        let backoff = Backoff::new(config.scheduler.base_delay(), config.scheduler.max_delay());
        Self::with_parts(config, cache, backoff)
    }

    pub fn with_parts(config: Config, cache: RatingCache, backoff: Backoff) -> Self {
        Self {
            config,
            cache,
            backoff,
            seen: SeenSet::default(),
            pending: PendingSet::default(),
            persist_task: Mutex::new(None),
        }
    }

    /// Stop periodic persistence and flush the cache
    pub async fn teardown(&self) {
        let task = self.persist_task.lock().take();
        if let Some(task) = task {
            task.abort();
        }
        self.cache.flush().await;
        info!("Overlay context torn down");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &RatingCache {
        &self.cache
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }
}

async fn persist_periodically(ctx: Weak<OverlayContext>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; the cache was just loaded.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(ctx) = ctx.upgrade() else {
            break;
        };
        debug!("Periodic cache persist");
        ctx.cache.flush().await;
    }
}
