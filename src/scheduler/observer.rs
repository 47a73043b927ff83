//! Lazy viewport-intersection observation
//!
//! Mirrors an `IntersectionObserver` with a root margin and a threshold:
//! registered elements are checked whenever the host reports a viewport
//! change, and each fires at most once.

use crate::host::{ElementHandle, Rect, Viewport};
use parking_lot::Mutex;
use std::sync::Arc;

/// Whether `rect` lies within the viewport grown by `margin` (edges inclusive)
pub fn is_near_viewport(rect: &Rect, viewport: &Viewport, margin: f64) -> bool {
    rect.touches(&viewport.as_rect().expand(margin))
}

/// Fraction of `rect` inside the viewport grown by `margin`
pub fn intersection_ratio(rect: &Rect, viewport: &Viewport, margin: f64) -> f64 {
    let root = viewport.as_rect().expand(margin);
    let area = rect.area();
    if area <= 0.0 {
        // Zero-area targets count as fully visible when they touch the root.
        return if rect.touches(&root) { 1.0 } else { 0.0 };
    }
    rect.intersection_area(&root) / area
}

/// Elements waiting to come into view
pub struct VisibilityObserver {
    margin: f64,
    threshold: f64,
    observed: Mutex<Vec<ElementHandle>>,
}

impl VisibilityObserver {
    pub fn new(margin: f64, threshold: f64) -> Self {
        Self {
            margin,
            threshold,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Start observing `element`; observing twice is a no-op
    pub fn observe(&self, element: ElementHandle) {
        let mut observed = self.observed.lock();
        if !observed.iter().any(|e| Arc::ptr_eq(e, &element)) {
            observed.push(element);
        }
    }

    pub fn unobserve(&self, element: &ElementHandle) {
        self.observed.lock().retain(|e| !Arc::ptr_eq(e, element));
    }

    /// Stop observing everything
    pub fn disconnect(&self) {
        self.observed.lock().clear();
    }

    /// Unobserve and return every element now intersecting the viewport
    pub fn take_intersecting(&self, viewport: &Viewport) -> Vec<ElementHandle> {
        let mut observed = self.observed.lock();
        let (hits, rest): (Vec<_>, Vec<_>) = observed.drain(..).partition(|element| {
            element.is_connected() && self.is_intersecting(&element.bounding_rect(), viewport)
        });
        *observed = rest;
        hits
    }

    fn is_intersecting(&self, rect: &Rect, viewport: &Viewport) -> bool {
        is_near_viewport(rect, viewport, self.margin)
            && intersection_ratio(rect, viewport, self.margin) >= self.threshold
    }

    pub fn len(&self) -> usize {
        self.observed.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
