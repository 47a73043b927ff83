//! Rating resolution for a single item
//!
//! Items without their own rating borrow one from a relative:
//! episodes and seasons from their series, series from their earliest
//! episode. Failures are swallowed after feeding the backoff controller,
//! so a failed lookup only means a missing badge. A failed episode listing
//! is the exception: it falls back to the series' own rating without
//! touching the backoff.

use crate::context::OverlayContext;
use crate::error::OverlayResult;
use crate::metadata::{with_deadline, ChildQuery, ItemKind, MediaItem, MetadataService};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Resolves ratings through a [`MetadataService`]
pub struct RatingResolver {
    ctx: Arc<OverlayContext>,
    service: Arc<dyn MetadataService>,
    request_timeout: Duration,
}

impl RatingResolver {
    pub fn new(ctx: Arc<OverlayContext>, service: Arc<dyn MetadataService>) -> Self {
        let request_timeout = ctx.config().scheduler.request_timeout();
        Self {
            ctx,
            service,
            request_timeout,
        }
    }

    /// Resolve the rating for `item_id`
    ///
    /// Returns `None` immediately if a resolution for the same id is
    /// already in flight. A resolved rating is written to the cache.
    pub async fn resolve(&self, user_id: &str, item_id: &str) -> Option<String> {
        let Some(_claim) = self.ctx.pending().claim(item_id) else {
            debug!("Resolution for {} already in flight", item_id);
            return None;
        };

        match self.lookup(user_id, item_id).await {
            Ok(Some(rating)) => {
                debug!("Resolved {} -> {}", item_id, rating);
                self.ctx.cache().put(item_id, &rating).await;
                Some(rating)
            }
            Ok(None) => {
                debug!("No rating for {}", item_id);
                None
            }
            Err(e) => {
                let delay = self.ctx.backoff().on_error();
                debug!(
                    "Lookup for {} failed (retryable: {}): {}; backing off {}ms",
                    item_id,
                    e.is_retryable(),
                    e,
                    delay.as_millis()
                );
                None
            }
        }
    }

    async fn lookup(&self, user_id: &str, item_id: &str) -> OverlayResult<Option<String>> {
        let item = self.fetch_item(user_id, item_id).await?;

        if !item.kind.is_supported() {
            return Ok(None);
        }

        if let Some(rating) = item.rating() {
            return Ok(Some(rating.to_string()));
        }

        match item.kind {
            ItemKind::Episode | ItemKind::Season => match item.series_id.as_deref() {
                Some(series_id) => {
                    let series = self.service.item(user_id, series_id).await?;
                    Ok(series.rating().map(str::to_string))
                }
                None => Ok(None),
            },
            ItemKind::Series => self.first_episode_rating(user_id, &item).await,
            ItemKind::Movie | ItemKind::Other => Ok(None),
        }
    }

    /// Primary path, then the direct path raced against the request timeout
    async fn fetch_item(&self, user_id: &str, item_id: &str) -> OverlayResult<MediaItem> {
        match self.service.item(user_id, item_id).await {
            Ok(item) => Ok(item),
            Err(e) => {
                debug!("Primary fetch for {} failed ({}), trying direct", item_id, e);
                with_deadline(
                    self.request_timeout,
                    self.service.item_direct(user_id, item_id),
                )
                .await
                .into_result()
            }
        }
    }

    async fn first_episode_rating(
        &self,
        user_id: &str,
        series: &MediaItem,
    ) -> OverlayResult<Option<String>> {
        let episodes = match self
            .service
            .children(user_id, &ChildQuery::first_episode(&series.id))
            .await
        {
            Ok(episodes) => episodes,
            Err(e) => {
                debug!("Listing episodes of {} failed: {}", series.id, e);
                Vec::new()
            }
        };

        let Some(first) = episodes.into_iter().next() else {
            return Ok(series.rating().map(str::to_string));
        };

        // Listing results are partial records; the rating needs the full item.
        let episode = self.service.item(user_id, &first.id).await?;
        Ok(episode
            .rating()
            .or_else(|| series.rating())
            .map(str::to_string))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backoff::Backoff;
    use crate::cache::{MemoryStore, RatingCache};
    use crate::config::Config;
    use crate::error::OverlayError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory metadata service with call accounting
    #[derive(Default)]
    pub(crate) struct FakeService {
        items: Mutex<HashMap<String, MediaItem>>,
        children: Mutex<HashMap<String, Vec<MediaItem>>>,
        failing: Mutex<Vec<String>>,
        failing_listings: Mutex<Vec<String>>,
        direct_fails: bool,
        latency: Duration,
        pub primary_calls: AtomicUsize,
        pub direct_calls: AtomicUsize,
        pub child_calls: AtomicUsize,
    }

    impl FakeService {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_latency(latency: Duration) -> Self {
            Self {
                latency,
                ..Self::default()
            }
        }

        pub(crate) fn with_failing_direct_path() -> Self {
            Self {
                direct_fails: true,
                ..Self::default()
            }
        }

        pub(crate) fn add(&self, id: &str, kind: ItemKind, rating: Option<&str>, series: Option<&str>) {
            self.items.lock().insert(
                id.to_string(),
                MediaItem {
                    id: id.to_string(),
                    kind,
                    name: None,
                    official_rating: rating.map(str::to_string),
                    series_id: series.map(str::to_string),
                },
            );
        }

        pub(crate) fn add_child(&self, parent: &str, child: &str) {
            let listing = MediaItem {
                id: child.to_string(),
                kind: ItemKind::Episode,
                name: None,
                official_rating: None,
                series_id: Some(parent.to_string()),
            };
            self.children
                .lock()
                .entry(parent.to_string())
                .or_default()
                .push(listing);
        }

        /// Make the primary path fail for `id`
        pub(crate) fn fail(&self, id: &str) {
            self.failing.lock().push(id.to_string());
        }

        /// Make child listings under `parent` fail
        pub(crate) fn fail_listing(&self, parent: &str) {
            self.failing_listings.lock().push(parent.to_string());
        }

        pub(crate) fn total_calls(&self) -> usize {
            self.primary_calls.load(Ordering::SeqCst)
                + self.direct_calls.load(Ordering::SeqCst)
                + self.child_calls.load(Ordering::SeqCst)
        }

        fn lookup(&self, item_id: &str) -> OverlayResult<MediaItem> {
            self.items
                .lock()
                .get(item_id)
                .cloned()
                .ok_or_else(|| OverlayError::ItemNotFound(item_id.to_string()))
        }
    }

    #[async_trait]
    impl MetadataService for FakeService {
        async fn item(&self, _user_id: &str, item_id: &str) -> OverlayResult<MediaItem> {
            self.primary_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if self.failing.lock().iter().any(|id| id == item_id) {
                return Err(OverlayError::HttpStatus {
                    url: format!("/Users/u/Items/{}", item_id),
                    status: 503,
                });
            }
            self.lookup(item_id)
        }

        async fn item_direct(&self, _user_id: &str, item_id: &str) -> OverlayResult<MediaItem> {
            self.direct_calls.fetch_add(1, Ordering::SeqCst);
            if self.direct_fails {
                // Never answers; only the deadline ends this.
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.lookup(item_id)
        }

        async fn children(&self, _user_id: &str, query: &ChildQuery) -> OverlayResult<Vec<MediaItem>> {
            self.child_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if self.failing_listings.lock().contains(&query.parent_id) {
                return Err(OverlayError::HttpStatus {
                    url: format!("/Items?ParentId={}", query.parent_id),
                    status: 500,
                });
            }
            let mut children = self
                .children
                .lock()
                .get(&query.parent_id)
                .cloned()
                .unwrap_or_default();
            children.truncate(query.limit as usize);
            Ok(children)
        }
    }

    fn unit_jitter() -> f64 {
        1.0
    }

    pub(crate) async fn test_context(config: Config) -> Arc<OverlayContext> {
        let cache = RatingCache::load(Arc::new(MemoryStore::new()), config.cache.ttl()).await;
        let backoff = Backoff::with_jitter(
            config.scheduler.base_delay(),
            config.scheduler.max_delay(),
            unit_jitter,
        );
        Arc::new(OverlayContext::with_parts(config, cache, backoff))
    }

    async fn resolver(service: Arc<FakeService>) -> (RatingResolver, Arc<OverlayContext>) {
        let ctx = test_context(Config::default()).await;
        (RatingResolver::new(ctx.clone(), service), ctx)
    }

    #[tokio::test]
    async fn own_rating_is_cached() {
        let service = Arc::new(FakeService::new());
        service.add("movie", ItemKind::Movie, Some("PG-13"), None);
        let (resolver, ctx) = resolver(service.clone()).await;

        assert_eq!(resolver.resolve("u", "movie").await.as_deref(), Some("PG-13"));
        assert_eq!(ctx.cache().rating("movie").as_deref(), Some("PG-13"));
        assert!(ctx.pending().is_empty());
    }

    #[tokio::test]
    async fn episode_falls_back_to_series() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, Some("15"), None);
        service.add("episode", ItemKind::Episode, None, Some("series"));
        let (resolver, _ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "episode").await.as_deref(), Some("15"));
    }

    #[tokio::test]
    async fn season_falls_back_to_series() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, Some("TV-14"), None);
        service.add("season", ItemKind::Season, Some(""), Some("series"));
        let (resolver, _ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "season").await.as_deref(), Some("TV-14"));
    }

    #[tokio::test]
    async fn series_uses_first_episode_rating() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, None, None);
        service.add("ep1", ItemKind::Episode, Some("12A"), Some("series"));
        service.add_child("series", "ep1");
        let (resolver, _ctx) = resolver(service.clone()).await;

        assert_eq!(resolver.resolve("u", "series").await.as_deref(), Some("12A"));
        // series, listing, full episode
        assert_eq!(service.total_calls(), 3);
    }

    #[tokio::test]
    async fn series_without_episodes_has_no_rating() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, None, None);
        let (resolver, ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "series").await, None);
        assert!(ctx.cache().is_empty());
        assert_eq!(ctx.backoff().state().error_count, 0);
    }

    #[tokio::test]
    async fn failed_episode_listing_does_not_back_off() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, None, None);
        service.add("ep1", ItemKind::Episode, Some("18"), Some("series"));
        service.add_child("series", "ep1");
        service.fail_listing("series");
        let (resolver, ctx) = resolver(service.clone()).await;

        assert_eq!(resolver.resolve("u", "series").await, None);
        assert_eq!(service.child_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.backoff().state().error_count, 0);
        assert!(ctx.pending().is_empty());
    }

    #[tokio::test]
    async fn failed_episode_fetch_feeds_backoff() {
        let service = Arc::new(FakeService::new());
        service.add("series", ItemKind::Series, None, None);
        service.add_child("series", "ep-missing");
        let (resolver, ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "series").await, None);
        assert_eq!(ctx.backoff().state().error_count, 1);
    }

    #[tokio::test]
    async fn movie_without_rating_is_absent() {
        let service = Arc::new(FakeService::new());
        service.add("movie", ItemKind::Movie, None, None);
        let (resolver, ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "movie").await, None);
        assert!(ctx.cache().is_empty());
    }

    #[tokio::test]
    async fn unsupported_types_are_skipped() {
        let service = Arc::new(FakeService::new());
        service.add("album", ItemKind::Other, Some("PG"), None);
        let (resolver, _ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "album").await, None);
    }

    #[tokio::test]
    async fn primary_failure_uses_direct_path() {
        let service = Arc::new(FakeService::new());
        service.add("movie", ItemKind::Movie, Some("R"), None);
        service.fail("movie");
        let (resolver, ctx) = resolver(service.clone()).await;

        assert_eq!(resolver.resolve("u", "movie").await.as_deref(), Some("R"));
        assert_eq!(service.direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.backoff().state().error_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_timeout_feeds_backoff() {
        let service = Arc::new(FakeService::with_failing_direct_path());
        service.add("movie", ItemKind::Movie, Some("R"), None);
        service.fail("movie");
        let (resolver, ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "movie").await, None);
        assert_eq!(ctx.backoff().state().error_count, 1);
        assert_eq!(ctx.backoff().current_delay(), Duration::from_millis(2000));
        assert!(ctx.pending().is_empty());
    }

    #[tokio::test]
    async fn series_fetch_failure_feeds_backoff() {
        let service = Arc::new(FakeService::new());
        service.add("episode", ItemKind::Episode, None, Some("missing-series"));
        let (resolver, ctx) = resolver(service).await;

        assert_eq!(resolver.resolve("u", "episode").await, None);
        assert_eq!(ctx.backoff().state().error_count, 1);
        assert!(ctx.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_resolves_share_one_fetch() {
        let service = Arc::new(FakeService::with_latency(Duration::from_millis(100)));
        service.add("movie", ItemKind::Movie, Some("PG"), None);
        let (resolver, _ctx) = resolver(service.clone()).await;

        let (first, second) = tokio::join!(resolver.resolve("u", "movie"), resolver.resolve("u", "movie"));

        assert_eq!(first.as_deref(), Some("PG"));
        assert_eq!(second, None);
        assert_eq!(service.primary_calls.load(Ordering::SeqCst), 1);
    }
}
