//! Static page snapshots
//!
//! A snapshot is a JSON capture of a library page: viewport, session, and
//! every card with its ancestor chain and document-relative geometry. It
//! lets the scheduler run outside a browser, e.g. from `rating-overlay scan`.
//! A snapshot may also script what happens after load (navigations, late
//! renders, back gestures, scrolling) as a list of events.

use super::{
    CardElement, ElementHandle, HostEvent, HostPage, NodeDescriptor, Positioning, Rect, Selector,
    Viewport,
};
use crate::error::{OverlayError, OverlayResult};
use crate::overlay::Badge;
use parking_lot::Mutex;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// On-disk snapshot layout
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub user_id: Option<String>,

    pub viewport: Viewport,

    #[serde(default)]
    pub cards: Vec<CapturedCard>,

    /// Vertical scroll offsets to replay after the first scan
    #[serde(default)]
    pub scroll: Vec<f64>,

    /// Page changes to replay after the scroll offsets
    #[serde(default)]
    pub events: Vec<SnapshotEvent>,
}

/// A scripted change to a snapshot page
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SnapshotEvent {
    /// Client-side navigation to a page holding `cards`
    Navigate {
        url: String,
        #[serde(default)]
        cards: Vec<CapturedCard>,
    },
    /// Cards rendered into the current page
    AddCards { cards: Vec<CapturedCard> },
    /// Header back button
    Back,
    /// Scroll so `top` is at the top of the viewport
    Scroll { top: f64 },
}

/// One card in a snapshot file
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedCard {
    pub node: NodeDescriptor,

    #[serde(default)]
    pub ancestors: Vec<NodeDescriptor>,

    #[serde(default)]
    pub href: Option<String>,

    #[serde(default)]
    pub background_image: Option<String>,

    /// Box relative to the top of the document
    pub rect: Rect,

    #[serde(default)]
    pub position: Positioning,
}

/// Scroll position shared between a page and its cards
#[derive(Debug, Default)]
struct ScrollState {
    top: Mutex<f64>,
}

/// A card captured in a snapshot
#[derive(Debug)]
pub struct SnapshotCard {
    path: Vec<NodeDescriptor>,
    href: Option<String>,
    background_image: Option<String>,
    rect: Rect,
    scroll: Arc<ScrollState>,
    position: Mutex<Positioning>,
    badges: Mutex<Vec<Badge>>,
    connected: AtomicBool,
}

impl SnapshotCard {
    fn new(captured: CapturedCard, scroll: Arc<ScrollState>) -> Self {
        let mut path = captured.ancestors;
        path.push(captured.node);
        Self {
            path,
            href: captured.href,
            background_image: captured.background_image,
            rect: captured.rect,
            scroll,
            position: Mutex::new(captured.position),
            badges: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Badges attached so far
    pub fn badges(&self) -> Vec<Badge> {
        self.badges.lock().clone()
    }

    /// Detach the card from the page
    pub fn detach(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl CardElement for SnapshotCard {
    fn path(&self) -> Vec<NodeDescriptor> {
        self.path.clone()
    }

    fn href(&self) -> Option<String> {
        self.href.clone()
    }

    fn background_image(&self) -> Option<String> {
        self.background_image.clone()
    }

    fn bounding_rect(&self) -> Rect {
        self.rect.translate(0.0, -*self.scroll.top.lock())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn has_overlay(&self, class: &str) -> bool {
        self.badges.lock().iter().any(|badge| badge.class() == class)
    }

    fn positioning(&self) -> Positioning {
        *self.position.lock()
    }

    fn set_positioning(&self, positioning: Positioning) {
        *self.position.lock() = positioning;
    }

    fn attach_badge(&self, badge: Badge) {
        self.badges.lock().push(badge);
    }
}

/// A page built from a [`SnapshotFile`]
#[derive(Debug)]
pub struct SnapshotPage {
    url: Mutex<String>,
    user_id: Option<String>,
    viewport: Viewport,
    scroll: Arc<ScrollState>,
    scroll_steps: Vec<f64>,
    events: Vec<SnapshotEvent>,
    cards: Mutex<Vec<Arc<SnapshotCard>>>,
}

impl SnapshotPage {
    /// Load a snapshot from a JSON file
    pub async fn load(path: &Path) -> OverlayResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            OverlayError::io(format!("reading snapshot {}", path.display()), e)
        })?;

        let file: SnapshotFile =
            serde_json::from_str(&content).map_err(|e| OverlayError::SnapshotInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self::from_file(file))
    }

    pub fn from_file(file: SnapshotFile) -> Self {
        let scroll = Arc::new(ScrollState::default());
        let cards = file
            .cards
            .into_iter()
            .map(|captured| Arc::new(SnapshotCard::new(captured, scroll.clone())))
            .collect();

        Self {
            url: Mutex::new(file.url),
            user_id: file.user_id,
            viewport: file.viewport,
            scroll,
            scroll_steps: file.scroll,
            events: file.events,
            cards: Mutex::new(cards),
        }
    }

    pub fn url(&self) -> String {
        self.url.lock().clone()
    }

    /// Scroll offsets listed in the snapshot
    pub fn scroll_steps(&self) -> &[f64] {
        &self.scroll_steps
    }

    /// Scripted events listed in the snapshot
    pub fn events(&self) -> &[SnapshotEvent] {
        &self.events
    }

    /// Apply a scripted event to the page
    ///
    /// Returns the notification a live host would push for the change.
    pub fn replay(&self, event: &SnapshotEvent) -> HostEvent {
        match event {
            SnapshotEvent::Navigate { url, cards } => {
                self.navigate(url, cards.clone());
                HostEvent::Navigated { url: url.clone() }
            }
            SnapshotEvent::AddCards { cards } => HostEvent::NodesAdded(self.add_cards(cards.clone())),
            SnapshotEvent::Back => HostEvent::BackGesture,
            SnapshotEvent::Scroll { top } => {
                self.scroll_to(*top);
                HostEvent::ViewportChanged
            }
        }
    }

    /// Scroll the document so `top` is at the top of the viewport
    pub fn scroll_to(&self, top: f64) {
        *self.scroll.top.lock() = top;
    }

    /// Add cards, as a host render would
    pub fn add_cards(&self, captured: Vec<CapturedCard>) -> usize {
        let added: Vec<_> = captured
            .into_iter()
            .map(|captured| Arc::new(SnapshotCard::new(captured, self.scroll.clone())))
            .collect();
        let count = added.len();
        self.cards.lock().extend(added);
        count
    }

    /// Replace the whole page, as a client-side navigation would
    pub fn navigate(&self, url: &str, captured: Vec<CapturedCard>) {
        for card in self.cards.lock().drain(..) {
            card.detach();
        }
        *self.url.lock() = url.to_string();
        self.scroll_to(0.0);
        self.add_cards(captured);
    }

    pub fn cards(&self) -> Vec<Arc<SnapshotCard>> {
        self.cards.lock().clone()
    }
}

impl HostPage for SnapshotPage {
    fn query_cards(&self, selectors: &[Selector]) -> Vec<ElementHandle> {
        self.cards
            .lock()
            .iter()
            .filter(|card| card.is_connected())
            .filter(|card| selectors.iter().any(|s| s.matches(&card.path)))
            .map(|card| card.clone() as ElementHandle)
            .collect()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone().filter(|id| !id.is_empty())
    }
}
