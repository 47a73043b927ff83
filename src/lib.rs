//! rating-overlay - age-rating badges for media-server library cards
//!
//! Discovers library cards on a page, resolves each item's official rating
//! through the media server's metadata API (falling back to related items),
//! caches ratings with an expiry, and attaches a badge to every card. Fetches
//! are driven by visibility and throttled by a shared backoff controller.

pub mod backoff;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod metadata;
pub mod overlay;
pub mod resolver;
pub mod scheduler;
pub mod ui;
pub mod watcher;

pub use error::{OverlayError, OverlayResult};
