//! Host event handling
//!
//! The watcher turns [`HostEvent`]s into scheduler work: navigations reset the
//! view and rescan once the new page settles, DOM mutations rescan at most
//! once per debounce window, and viewport changes re-evaluate lazy
//! observations.

mod debounce;

pub use debounce::Debouncer;

use crate::config::WatcherConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::host::HostEvent;
use crate::scheduler::{ProcessOutcome, Scheduler, ViewPhase};
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const IDLE_POLL: Duration = Duration::from_millis(25);

type Spawned = Arc<Mutex<Vec<JoinHandle<ProcessOutcome>>>>;

/// Drives a [`Scheduler`] from a stream of host events
pub struct Watcher {
    scheduler: Arc<Scheduler>,
    settings: WatcherConfig,
    settle: Debouncer,
    back: Debouncer,
    mutations: Debouncer,
    spawned: Spawned,
}

impl Watcher {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        let settings = scheduler.context().config().watcher.clone();
        Self {
            settle: Debouncer::new(settings.navigation_settle()),
            back: Debouncer::new(settings.back_settle()),
            mutations: Debouncer::throttled(settings.mutation_debounce()),
            spawned: Arc::default(),
            settings,
            scheduler,
        }
    }

    /// Process events until teardown or until the sender goes away
    ///
    /// The first rescan runs after the startup delay. On exit the cache is
    /// flushed.
    pub async fn run(self, mut events: mpsc::Receiver<HostEvent>) {
        let startup = tokio::time::sleep(self.settings.startup_delay());
        tokio::pin!(startup);
        let mut started = false;

        loop {
            tokio::select! {
                () = &mut startup, if !started => {
                    started = true;
                    info!("Initial scan");
                    track(&self.spawned, self.scheduler.rescan());
                }
                event = events.recv() => match event {
                    Some(HostEvent::Teardown) | None => break,
                    Some(event) => {
                        self.spawned.lock().retain(|task| !task.is_finished());
                        self.handle(event);
                    }
                },
            }
        }

        self.cancel_pending();
        self.scheduler.context().teardown().await;
    }

    /// React to a single host event
    pub fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::Navigated { url } => {
                debug!("Navigated to {}", url);
                self.scheduler.context().seen().clear();
                self.scheduler.begin_transition();
                self.mutations.cancel();
                self.back.cancel();

                let scheduler = Arc::clone(&self.scheduler);
                let spawned = Arc::clone(&self.spawned);
                self.settle.trigger(move || async move {
                    scheduler.activate();
                    track(&spawned, scheduler.rescan());
                });
            }
            HostEvent::BackGesture => {
                debug!("Back gesture");
                self.scheduler.context().seen().clear();

                let scheduler = Arc::clone(&self.scheduler);
                let spawned = Arc::clone(&self.spawned);
                self.back.trigger(move || async move {
                    track(&spawned, scheduler.rescan());
                });
            }
            HostEvent::NodesAdded(0) => {}
            HostEvent::NodesAdded(count) => {
                debug!("{} node(s) added", count);
                let scheduler = Arc::clone(&self.scheduler);
                let spawned = Arc::clone(&self.spawned);
                self.mutations.trigger(move || async move {
                    if scheduler.phase() == ViewPhase::Active {
                        track(&spawned, scheduler.rescan());
                    } else {
                        debug!("View transitioning; dropping mutation rescan");
                    }
                });
            }
            HostEvent::ViewportChanged => {
                track(&self.spawned, self.scheduler.on_viewport_changed());
            }
            HostEvent::Teardown => {}
        }
    }

    /// Wait until no settle or debounce work is pending and every lookup the
    /// watcher started has finished
    ///
    /// Returns the outcomes of those lookups.
    pub async fn settled(&self) -> OverlayResult<Vec<ProcessOutcome>> {
        let mut outcomes = Vec::new();
        loop {
            while self.settle.is_pending() || self.back.is_pending() || self.mutations.is_pending() {
                tokio::time::sleep(IDLE_POLL).await;
            }

            let tasks = std::mem::take(&mut *self.spawned.lock());
            if tasks.is_empty() {
                return Ok(outcomes);
            }
            for joined in join_all(tasks).await {
                outcomes.push(
                    joined.map_err(|e| OverlayError::Internal(format!("lookup task failed: {}", e)))?,
                );
            }
        }
    }

    fn cancel_pending(&self) {
        self.settle.cancel();
        self.back.cancel();
        self.mutations.cancel();
    }
}

fn track(spawned: &Spawned, tasks: Vec<JoinHandle<ProcessOutcome>>) {
    spawned.lock().extend(tasks);
}
