//! Adaptive delay shared by every scheduling decision
//!
//! Each metadata failure doubles the delay (up to 2^5 times the base),
//! randomized by ±20% and capped at the configured ceiling. The error
//! count never decays; see DESIGN.md.

use parking_lot::Mutex;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Exponent cap for the doubling
const MAX_EXPONENT: u32 = 5;

/// Source of the jitter factor, expected in `[0.8, 1.2)`
pub type JitterFn = fn() -> f64;

/// Snapshot of the backoff counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffState {
    pub error_count: u32,
    pub current_delay: Duration,
}

/// Backoff controller
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    jitter: JitterFn,
    state: Mutex<BackoffState>,
}

impl Backoff {
    /// Create a controller with random jitter
    pub fn new(base: Duration, max: Duration) -> Self {
        Self::with_jitter(base, max, random_jitter)
    }

    /// Create a controller with a custom jitter source
    pub fn with_jitter(base: Duration, max: Duration, jitter: JitterFn) -> Self {
        Self {
            base,
            max,
            jitter,
            state: Mutex::new(BackoffState {
                error_count: 0,
                current_delay: base,
            }),
        }
    }

    /// Record a failure and return the recomputed delay
    pub fn on_error(&self) -> Duration {
        let mut state = self.state.lock();
        state.error_count = state.error_count.saturating_add(1);
        state.current_delay = delay_for(self.base, self.max, state.error_count, (self.jitter)());
        debug!(
            "Backoff: {} error(s), delay now {}ms",
            state.error_count,
            state.current_delay.as_millis()
        );
        state.current_delay
    }

    /// Delay to apply before issuing the next lookup
    pub fn current_delay(&self) -> Duration {
        self.state.lock().current_delay
    }

    pub fn state(&self) -> BackoffState {
        *self.state.lock()
    }
}

/// `min(max, base * 2^min(errors, 5) * jitter)`
pub fn delay_for(base: Duration, max: Duration, error_count: u32, jitter: f64) -> Duration {
    let factor = f64::from(1u32 << error_count.min(MAX_EXPONENT)) * jitter;
    base.mul_f64(factor.max(0.0)).min(max)
}

fn random_jitter() -> f64 {
    rand::rng().random_range(0.8..1.2)
}
