//! Configuration schema for rating-overlay
//!
//! Configuration is stored at `~/.config/rating-overlay/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Media server connection
    pub server: ServerConfig,

    /// Fetch scheduling and backoff
    pub scheduler: SchedulerConfig,

    /// Rating cache settings
    pub cache: CacheConfig,

    /// Navigation and mutation settle delays
    pub watcher: WatcherConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Media server connection settings
///
/// The overlay never authenticates on its own; `api_key` and `user_id`
/// describe a session that already exists on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `http://localhost:8096`
    pub url: Option<String>,

    /// Access token sent as `X-Emby-Token`
    pub api_key: Option<String>,

    /// User the ratings are looked up for
    pub user_id: Option<String>,
}

/// Fetch scheduler settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum resolutions in flight at once
    pub max_concurrent_requests: usize,

    /// Backoff base delay in milliseconds
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,

    /// Delay cap for elements in or near the viewport
    pub visible_priority_delay_ms: u64,

    /// Deadline for the direct metadata fetch
    pub request_timeout_ms: u64,

    /// Viewport expansion on every side, in pixels
    pub viewport_margin: f64,

    /// Minimum visible fraction for a lazily observed element
    pub intersection_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 9,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            visible_priority_delay_ms: 200,
            request_timeout_ms: 5000,
            viewport_margin: 300.0,
            intersection_threshold: 0.01,
        }
    }
}

impl SchedulerConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn visible_priority_delay(&self) -> Duration {
        Duration::from_millis(self.visible_priority_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Rating cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (default: 7 days)
    pub ttl_secs: u64,

    /// Periodic prune-and-persist interval in seconds
    pub persist_interval_secs: u64,

    /// Backing store file (defaults to the state directory)
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 7 * 24 * 60 * 60,
            persist_interval_secs: 60,
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.persist_interval_secs.max(1))
    }
}

/// Navigation and mutation watcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Delay before the first scan after startup
    pub startup_delay_ms: u64,

    /// Settle delay after a URL change
    pub navigation_settle_ms: u64,

    /// Settle delay after a back gesture
    pub back_settle_ms: u64,

    /// Debounce window for added nodes
    pub mutation_debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 1500,
            navigation_settle_ms: 300,
            back_settle_ms: 500,
            mutation_debounce_ms: 1000,
        }
    }
}

impl WatcherConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn navigation_settle(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms)
    }

    pub fn back_settle(&self) -> Duration {
        Duration::from_millis(self.back_settle_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }
}
