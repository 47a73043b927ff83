//! Visibility-driven fetch scheduling
//!
//! A rescan walks every card on the page. Cached ratings are applied on the
//! spot; cards in or near the viewport are processed right away at priority,
//! and the rest wait in the [`VisibilityObserver`] until they scroll in.
//!
//! Processing an element sleeps for the shared backoff delay before issuing
//! a lookup. Priority elements cap that sleep at the visible-priority delay,
//! so on-screen cards stay responsive without defeating the backoff.

mod observer;

pub use observer::{intersection_ratio, is_near_viewport, VisibilityObserver};

use crate::context::OverlayContext;
use crate::error::OverlayResult;
use crate::host::{self, ElementHandle, HostPage, Selector, CARD_SELECTORS, IGNORE_SELECTORS};
use crate::overlay;
use crate::resolver::RatingResolver;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// What happened to one processed element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Matched an ignore rule
    Ignored,
    /// No item id could be extracted
    NoItemId,
    /// Already processed in this view
    AlreadySeen,
    /// Served from the cache
    Cached(String),
    /// The page has no user session
    NoSession,
    /// Looked up and applied
    Resolved(String),
    /// Lookup yielded nothing (no rating, failure, or already in flight)
    Unresolved,
}

/// Whether the current view accepts new discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Active,
    /// Between a navigation and its settle rescan
    Transitioning,
}

/// Per-page fetch scheduler
pub struct Scheduler {
    ctx: Arc<OverlayContext>,
    resolver: Arc<RatingResolver>,
    host: Arc<dyn HostPage>,
    observer: VisibilityObserver,
    admission: Semaphore,
    card_selectors: Vec<Selector>,
    ignore_rules: Vec<Selector>,
    phase: Mutex<ViewPhase>,
}

impl Scheduler {
    pub fn new(
        ctx: Arc<OverlayContext>,
        resolver: Arc<RatingResolver>,
        host: Arc<dyn HostPage>,
    ) -> OverlayResult<Self> {
        let settings = &ctx.config().scheduler;
        let observer =
            VisibilityObserver::new(settings.viewport_margin, settings.intersection_threshold);
        let admission = Semaphore::new(settings.max_concurrent_requests.max(1));

        Ok(Self {
            observer,
            admission,
            card_selectors: Selector::parse_all(CARD_SELECTORS)?,
            ignore_rules: Selector::parse_all(IGNORE_SELECTORS)?,
            phase: Mutex::new(ViewPhase::Active),
            ctx,
            resolver,
            host,
        })
    }

    /// Re-enumerate the page's cards and schedule the ones needing work
    ///
    /// Returns the spawned priority tasks.
    pub fn rescan(self: &Arc<Self>) -> Vec<JoinHandle<ProcessOutcome>> {
        let cards = self.host.query_cards(&self.card_selectors);
        let viewport = self.host.viewport();
        let margin = self.ctx.config().scheduler.viewport_margin;

        let mut tasks = Vec::new();
        let mut deferred = 0usize;
        let mut cached = 0usize;

        for element in cards {
            if self.is_ignored(&element) {
                continue;
            }
            let Some(item_id) = host::item_id(element.as_ref()) else {
                continue;
            };

            if let Some(entry) = self.ctx.cache().get(&item_id) {
                overlay::apply(element.as_ref(), &entry.rating);
                cached += 1;
                continue;
            }

            if is_near_viewport(&element.bounding_rect(), &viewport, margin) {
                self.observer.unobserve(&element);
                tasks.push(self.spawn_process(element, true));
            } else {
                self.observer.observe(element);
                deferred += 1;
            }
        }

        debug!(
            "Rescan: {} cached, {} scheduled, {} deferred",
            cached,
            tasks.len(),
            deferred
        );
        tasks
    }

    /// Schedule observed elements that have scrolled into view
    pub fn on_viewport_changed(self: &Arc<Self>) -> Vec<JoinHandle<ProcessOutcome>> {
        let viewport = self.host.viewport();
        self.observer
            .take_intersecting(&viewport)
            .into_iter()
            .map(|element| self.spawn_process(element, true))
            .collect()
    }

    fn spawn_process(self: &Arc<Self>, element: ElementHandle, priority: bool) -> JoinHandle<ProcessOutcome> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.process_element(element, priority).await })
    }

    /// Process one element: dedup, cache, throttle, resolve, apply
    pub async fn process_element(&self, element: ElementHandle, priority: bool) -> ProcessOutcome {
        if self.is_ignored(&element) {
            return ProcessOutcome::Ignored;
        }
        let Some(item_id) = host::item_id(element.as_ref()) else {
            return ProcessOutcome::NoItemId;
        };
        if !self.ctx.seen().insert(&item_id) {
            return ProcessOutcome::AlreadySeen;
        }

        if let Some(rating) = self.ctx.cache().rating(&item_id) {
            overlay::apply(element.as_ref(), &rating);
            return ProcessOutcome::Cached(rating);
        }

        let Some(user_id) = self.host.user_id() else {
            return ProcessOutcome::NoSession;
        };

        let settings = &self.ctx.config().scheduler;
        let backoff_delay = self.ctx.backoff().current_delay();
        let delay = if priority {
            settings.visible_priority_delay().min(backoff_delay)
        } else {
            backoff_delay
        };
        trace!("Waiting {}ms before looking up {}", delay.as_millis(), item_id);
        tokio::time::sleep(delay).await;

        // A concurrent resolution may have landed while we slept.
        if let Some(rating) = self.ctx.cache().rating(&item_id) {
            overlay::apply(element.as_ref(), &rating);
            return ProcessOutcome::Cached(rating);
        }

        let Ok(_permit) = self.admission.acquire().await else {
            return ProcessOutcome::Unresolved;
        };

        match self.resolver.resolve(&user_id, &item_id).await {
            Some(rating) => {
                overlay::apply(element.as_ref(), &rating);
                ProcessOutcome::Resolved(rating)
            }
            None => ProcessOutcome::Unresolved,
        }
    }

    fn is_ignored(&self, element: &ElementHandle) -> bool {
        let path = element.path();
        self.ignore_rules.iter().any(|rule| rule.matches_closest(&path))
    }

    /// Enter the transitioning phase and drop all lazy observations
    pub fn begin_transition(&self) {
        *self.phase.lock() = ViewPhase::Transitioning;
        self.observer.disconnect();
    }

    /// Return to the active phase
    pub fn activate(&self) {
        *self.phase.lock() = ViewPhase::Active;
    }

    pub fn phase(&self) -> ViewPhase {
        *self.phase.lock()
    }

    pub fn observer(&self) -> &VisibilityObserver {
        &self.observer
    }

    pub fn context(&self) -> &Arc<OverlayContext> {
        &self.ctx
    }

    /// Lookups currently admitted past the concurrency cap
    pub fn in_flight(&self) -> usize {
        self.ctx
            .config()
            .scheduler
            .max_concurrent_requests
            .max(1)
            .saturating_sub(self.admission.available_permits())
    }
}
