//! News Gateway: turns a user's interests into one provider query and
//! normalizes the answer into [`FetchedArticle`]s.

use crate::config::NewsConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::FetchedArticle;
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Query term used when a user has no interests.
pub const DEFAULT_QUERY: &str = "general";

/// External news search provider.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search(&self, query: &str) -> ApiResult<Vec<FetchedArticle>>;
}

/// Client for the GNews search API (`/api/v4/search`).
pub struct GNewsClient {
    client: Client,
    config: NewsConfig,
}

impl GNewsClient {
    pub fn new(config: NewsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl GNewsArticle {
    /// Records without a title or url are useless to the client; drop them.
    fn normalize(self) -> Option<FetchedArticle> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        Some(FetchedArticle {
            title,
            description: self.description,
            content: self.content,
            url,
            image: self.image,
            published_at: self.published_at.as_deref().and_then(parse_timestamp),
            source: self.source.and_then(|s| s.name),
        })
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Pull a human-readable message out of a provider error body.
fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("errors") {
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Some(serde_json::Value::Object(map)) => Some(
            map.values()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => value.get("message").and_then(|m| m.as_str()).map(str::to_string),
    }
}

/// The request URL carries the API key, so only the error kind reaches the
/// message; the URL-stripped error goes to the log.
fn transport_error(err: reqwest::Error) -> ApiError {
    let status = err.status().map(|s| s.as_u16());
    let message = if err.is_timeout() {
        "news provider timed out"
    } else if err.is_connect() {
        "news provider is unreachable"
    } else if err.is_decode() {
        "news provider sent an unreadable response"
    } else {
        "news provider request failed"
    };
    debug!(error = %err.without_url(), "news provider transport error");
    ApiError::Gateway {
        status,
        message: message.to_string(),
    }
}

#[async_trait]
impl NewsProvider for GNewsClient {
    async fn search(&self, query: &str) -> ApiResult<Vec<FetchedArticle>> {
        if self.config.api_key.is_empty() {
            return Err(ApiError::Gateway {
                status: None,
                message: "news provider API key is not configured".to_string(),
            });
        }

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[
                ("q", query),
                ("apikey", self.config.api_key.as_str()),
                ("lang", self.config.lang.as_str()),
                ("country", self.config.country.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unknown provider error".to_string());
            return Err(ApiError::Gateway {
                status: Some(status.as_u16()),
                message,
            });
        }

        let payload: GNewsResponse = response.json().await.map_err(transport_error)?;
        Ok(payload
            .articles
            .into_iter()
            .filter_map(GNewsArticle::normalize)
            .collect())
    }
}

#[derive(Clone)]
pub struct NewsGateway {
    storage: Storage,
    provider: Arc<dyn NewsProvider>,
}

impl NewsGateway {
    pub fn new(storage: Storage, provider: Arc<dyn NewsProvider>) -> Self {
        Self { storage, provider }
    }

    /// Articles for the user's first interest (or [`DEFAULT_QUERY`]). One
    /// provider call, no retry.
    pub async fn fetch_for_user(&self, user_id: Uuid) -> ApiResult<Vec<FetchedArticle>> {
        let user = self
            .storage
            .get_user(user_id)?
            .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

        let query = user
            .interests
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_QUERY);
        info!(%user_id, interest = query, "fetching news");

        let articles = self.provider.search(query).await?;
        debug!(%user_id, count = articles.len(), "fetched articles");
        Ok(articles)
    }
}
