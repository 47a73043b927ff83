//! Media server metadata access
//!
//! The resolver talks to the server through [`MetadataService`], so tests
//! and other hosts can supply their own implementation:
//! - `JellyfinClient`: HTTP client for Jellyfin/Emby style servers
//! - `OfflineService`: no server; every lookup fails, so only cached ratings show

mod deadline;
mod jellyfin;

pub use deadline::{with_deadline, FetchOutcome};
pub use jellyfin::JellyfinClient;

use crate::error::{OverlayError, OverlayResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Item type as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Movie,
    Episode,
    Series,
    Season,
    /// Any type the overlay does not handle (music, folders, people, ...)
    #[serde(other)]
    Other,
}

impl ItemKind {
    /// Types that can carry a rating badge
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Episode => "Episode",
            Self::Series => "Series",
            Self::Season => "Season",
            Self::Other => "Other",
        }
    }
}

/// Item record returned by the metadata service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaItem {
    pub id: String,

    #[serde(rename = "Type")]
    pub kind: ItemKind,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub official_rating: Option<String>,

    #[serde(default)]
    pub series_id: Option<String>,
}

impl MediaItem {
    /// The item's own rating, ignoring empty strings
    pub fn rating(&self) -> Option<&str> {
        self.official_rating
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// Page of items returned by a children query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsPage {
    #[serde(default)]
    pub items: Vec<MediaItem>,
}

/// Query for the children of a parent item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildQuery {
    pub parent_id: String,
    pub include_type: ItemKind,
    pub recursive: bool,
    pub sort_by: &'static str,
    pub ascending: bool,
    pub limit: u32,
}

impl ChildQuery {
    /// Earliest-premiering episode of a series
    pub fn first_episode(series_id: &str) -> Self {
        Self {
            parent_id: series_id.to_string(),
            include_type: ItemKind::Episode,
            recursive: true,
            sort_by: "PremiereDate",
            ascending: true,
            limit: 1,
        }
    }
}

/// Metadata service interface
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Fetch one item through the primary (session) path
    async fn item(&self, user_id: &str, item_id: &str) -> OverlayResult<MediaItem>;

    /// Fetch one item through the direct HTTP path
    ///
    /// Used only after the primary path has failed; callers race it
    /// against a deadline.
    async fn item_direct(&self, user_id: &str, item_id: &str) -> OverlayResult<MediaItem>;

    /// Fetch children of a parent item
    async fn children(&self, user_id: &str, query: &ChildQuery) -> OverlayResult<Vec<MediaItem>>;
}

/// Service used when no server is configured
#[derive(Debug, Default)]
pub struct OfflineService;

#[async_trait]
impl MetadataService for OfflineService {
    async fn item(&self, _user_id: &str, _item_id: &str) -> OverlayResult<MediaItem> {
        Err(OverlayError::ServerNotConfigured)
    }

    async fn item_direct(&self, _user_id: &str, _item_id: &str) -> OverlayResult<MediaItem> {
        Err(OverlayError::ServerNotConfigured)
    }

    async fn children(&self, _user_id: &str, _query: &ChildQuery) -> OverlayResult<Vec<MediaItem>> {
        Err(OverlayError::ServerNotConfigured)
    }
}
