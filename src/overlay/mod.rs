//! Badge attachment

mod badge;

pub use badge::{icon_name, Badge, FALLBACK_ICON, ICON_BASE, OVERLAY_CLASS};

use crate::host::{CardElement, Positioning};
use tracing::trace;

/// Attach a badge for `rating` to `element`
///
/// No-op when the element already carries a badge or has been detached.
/// Returns whether a badge was attached.
pub fn apply(element: &dyn CardElement, rating: &str) -> bool {
    if !element.is_connected() || element.has_overlay(OVERLAY_CLASS) {
        return false;
    }

    // The badge is absolutely positioned against the card.
    if element.positioning() == Positioning::Static {
        element.set_positioning(Positioning::Relative);
    }

    element.attach_badge(Badge::for_rating(rating));
    trace!("Attached {} badge", rating);
    true
}
