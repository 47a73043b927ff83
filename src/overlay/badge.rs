//! Rating code → badge icon mapping
//!
//! Icons follow the UK classification set. US film and TV codes are mapped
//! onto their nearest UK equivalent; anything unknown gets the "not rated"
//! icon.

use serde::Serialize;

/// Marker class carried by every badge
pub const OVERLAY_CLASS: &str = "age-rating-overlay";

/// Path the icon set is served from
pub const ICON_BASE: &str = "/web/agerating";

/// Icon used when a rating cannot be mapped
pub const FALLBACK_ICON: &str = "nr.png";

const BADGE_STYLE: &str = "position: absolute; bottom: 3px; left: 3px; width: 1.8vw; \
                           height: auto; z-index: 110; pointer-events: none; user-select: none;";

/// A rendered rating badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Rating code the badge was rendered for
    pub rating: String,

    /// Icon file name, e.g. `15.png`
    pub icon: String,
}

impl Badge {
    pub fn for_rating(rating: &str) -> Self {
        Self {
            rating: rating.to_string(),
            icon: icon_name(rating),
        }
    }

    /// Image source URL
    pub fn src(&self) -> String {
        format!("{}/{}", ICON_BASE, self.icon)
    }

    pub fn class(&self) -> &'static str {
        OVERLAY_CLASS
    }

    /// Inline style placing the badge bottom-left above the card image
    pub fn inline_style(&self) -> &'static str {
        BADGE_STYLE
    }
}

/// Map a US or unprefixed rating onto a UK classification code
fn uk_code(rating: &str) -> Option<&'static str> {
    let code = match rating {
        // Film
        "G" | "U" => "GB-U",
        "PG" => "GB-PG",
        "PG-13" | "12" => "GB-12",
        "12A" => "GB-12A",
        "R" | "15" => "GB-15",
        "NC-17" | "18" => "GB-18",
        // TV
        "TV-Y" | "TV-G" => "GB-U",
        "TV-Y7" | "TV-PG" => "GB-PG",
        "TV-14" => "GB-12",
        "TV-MA" => "GB-15",
        "NR" => "GB-NR",
        _ => return None,
    };
    Some(code)
}

/// Icon file name for a rating code
pub fn icon_name(rating: &str) -> String {
    let rating = rating.trim();
    let mapped = if rating.starts_with("GB-") {
        Some(rating)
    } else {
        uk_code(rating.strip_prefix("US-").unwrap_or(rating))
    };

    match mapped.and_then(|code| code.strip_prefix("GB-")) {
        Some(code) if !code.is_empty() => format!("{}.png", code.to_lowercase()),
        _ => FALLBACK_ICON.to_string(),
    }
}
