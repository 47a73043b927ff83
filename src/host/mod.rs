//! Host page abstraction
//!
//! The overlay never owns the page. It sees cards through [`CardElement`]
//! handles, asks the page for its viewport and user session through
//! [`HostPage`], and learns about navigation and mutation through
//! [`HostEvent`]s the host pushes into a channel.

pub mod extract;
pub mod selector;
pub mod snapshot;

pub use extract::item_id;
pub use selector::{NodeDescriptor, Selector, CARD_SELECTORS, IGNORE_SELECTORS};
pub use snapshot::{CapturedCard, SnapshotCard, SnapshotEvent, SnapshotFile, SnapshotPage};

use crate::overlay::Badge;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Axis-aligned box in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow by `margin` on every side
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            top: self.top - margin,
            left: self.left - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            top: self.top + dy,
            left: self.left + dx,
            ..*self
        }
    }

    /// Whether the boxes touch or overlap (edges inclusive)
    pub fn touches(&self, other: &Rect) -> bool {
        self.top <= other.bottom()
            && self.bottom() >= other.top
            && self.left <= other.right()
            && self.right() >= other.left
    }

    /// Overlapping area of the two boxes
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let width = self.right().min(other.right()) - self.left.max(other.left);
        let height = self.bottom().min(other.bottom()) - self.top.max(other.top);
        width.max(0.0) * height.max(0.0)
    }
}

/// Visible area of the host window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn as_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// CSS `position` of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Positioning {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// A rendered card owned by the host
pub trait CardElement: Send + Sync + fmt::Debug {
    /// Ancestor chain from the root down to and including this element
    fn path(&self) -> Vec<NodeDescriptor>;

    /// Link target, if the card is a link
    fn href(&self) -> Option<String>;

    /// Inline `background-image` value
    fn background_image(&self) -> Option<String>;

    /// Current box relative to the viewport
    fn bounding_rect(&self) -> Rect;

    /// Whether the element is still attached to the page
    fn is_connected(&self) -> bool;

    /// Whether a child carries `class`
    fn has_overlay(&self, class: &str) -> bool;

    fn positioning(&self) -> Positioning;

    fn set_positioning(&self, positioning: Positioning);

    /// Append a badge as the last child
    fn attach_badge(&self, badge: Badge);
}

/// Shared handle to a host card
pub type ElementHandle = Arc<dyn CardElement>;

/// The page the overlay runs inside
pub trait HostPage: Send + Sync {
    /// Every element currently matching one of `selectors`
    fn query_cards(&self, selectors: &[Selector]) -> Vec<ElementHandle>;

    fn viewport(&self) -> Viewport;

    /// User id of the session the page already holds
    fn user_id(&self) -> Option<String>;
}

/// Notifications pushed by the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// History push/replace or popstate
    Navigated { url: String },
    /// The header back button was pressed
    BackGesture,
    /// Nodes were added somewhere under the body
    NodesAdded(usize),
    /// Scroll or resize changed what is on screen
    ViewportChanged,
    /// The page is going away
    Teardown,
}
