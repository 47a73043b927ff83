//! Error types for rating-overlay
//!
//! All modules use `OverlayResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for rating-overlay operations
pub type OverlayResult<T> = Result<T, OverlayError>;

/// All errors that can occur in rating-overlay
#[derive(Error, Debug)]
pub enum OverlayError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Media server URL not configured")]
    ServerNotConfigured,

    #[error("No user session configured")]
    NoUserSession,

    // Metadata service errors
    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Metadata request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Malformed metadata payload from {url}: {reason}")]
    MalformedPayload { url: String, reason: String },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    // Backing store errors
    #[error("Failed to persist rating cache: {0}")]
    CachePersist(String),

    #[error("Invalid page snapshot {path}: {reason}")]
    SnapshotInvalid { path: PathBuf, reason: String },

    #[error("Invalid selector {selector:?}: {reason}")]
    SelectorInvalid { selector: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OverlayError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport-level HTTP error
    pub fn http(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Http {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    ///
    /// Retryable errors are the ones the backoff controller exists for:
    /// the service may answer on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ServerNotConfigured => {
                Some("Run: rating-overlay config init, then set [server] url")
            }
            Self::NoUserSession => Some("Set [server] user_id in the config file"),
            Self::HttpStatus { status: 401, .. } => Some("Check [server] api_key"),
            _ => None,
        }
    }
}
