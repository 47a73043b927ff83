//! HTTP metadata client for Jellyfin/Emby servers
//!
//! `ureq` is blocking, so every request runs on the blocking pool.

use super::{ChildQuery, ItemsPage, MediaItem, MetadataService};
use crate::config::schema::ServerConfig;
use crate::error::{OverlayError, OverlayResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const AUTH_HEADER: &str = "X-Emby-Token";

/// Jellyfin REST client
#[derive(Clone)]
pub struct JellyfinClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl JellyfinClient {
    /// Create a client for the configured server
    ///
    /// `timeout` bounds each request at the transport level; the resolver
    /// applies its own deadline on top for the direct path.
    pub fn new(server: &ServerConfig, timeout: Duration) -> OverlayResult<Self> {
        let base_url = server
            .url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or(OverlayError::ServerNotConfigured)?;

        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            agent,
            base_url,
            api_key: server.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T>(&self, path: String, query: Vec<(&'static str, String)>) -> OverlayResult<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = format!("{}{}", self.base_url, path);
        let token = self.api_key.clone();

        tokio::task::spawn_blocking(move || {
            debug!("GET {}", url);

            let mut request = agent.get(url.as_str());
            for (key, value) in &query {
                request = request.query(*key, value.as_str());
            }
            if let Some(token) = token.as_deref() {
                request = request.header(AUTH_HEADER, token);
            }

            let mut response = request.call().map_err(|e| OverlayError::http(&url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(OverlayError::HttpStatus {
                    url,
                    status: status.as_u16(),
                });
            }

            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| OverlayError::http(&url, e))?;

            serde_json::from_str(&body).map_err(|e| OverlayError::MalformedPayload {
                url,
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| OverlayError::Internal(format!("metadata request task failed: {}", e)))?
    }
}

#[async_trait]
impl MetadataService for JellyfinClient {
    async fn item(&self, user_id: &str, item_id: &str) -> OverlayResult<MediaItem> {
        self.get_json(format!("/Users/{}/Items/{}", user_id, item_id), vec![])
            .await
    }

    async fn item_direct(&self, user_id: &str, item_id: &str) -> OverlayResult<MediaItem> {
        self.get_json(
            format!("/Items/{}", item_id),
            vec![("userId", user_id.to_string())],
        )
        .await
    }

    async fn children(&self, user_id: &str, query: &ChildQuery) -> OverlayResult<Vec<MediaItem>> {
        let page: ItemsPage = self
            .get_json("/Items".to_string(), child_query_params(user_id, query))
            .await?;
        Ok(page.items)
    }
}

fn child_query_params(user_id: &str, query: &ChildQuery) -> Vec<(&'static str, String)> {
    vec![
        ("ParentId", query.parent_id.clone()),
        ("IncludeItemTypes", query.include_type.as_str().to_string()),
        ("Recursive", query.recursive.to_string()),
        ("SortBy", query.sort_by.to_string()),
        (
            "SortOrder",
            if query.ascending {
                "Ascending"
            } else {
                "Descending"
            }
            .to_string(),
        ),
        ("Limit", query.limit.to_string()),
        ("userId", user_id.to_string()),
    ]
}
