//! Saved articles. Every operation is scoped to the calling user: an id that
//! belongs to someone else behaves exactly like an id that doesn't exist.

use crate::error::{ApiError, ApiResult, StorageError};
use crate::models::{SavedArticle, Summary};
use crate::news::parse_timestamp;
use crate::storage::Storage;
use crate::summarize;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Tags arrive either as `"tech, sports"` or as `["tech", "sports"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    /// Trimmed, de-duplicated, blanks dropped.
    pub fn normalize(&self) -> BTreeSet<String> {
        let parts: Vec<&str> = match self {
            TagsInput::Csv(raw) => raw.split(',').collect(),
            TagsInput::List(items) => items.iter().flat_map(|s| s.split(',')).collect(),
        };
        parts
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Provider `source` is an object; clients re-posting a saved article send a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceInput {
    Name(String),
    Object { name: Option<String> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub published_at: Option<String>,
    pub source: Option<SourceInput>,
    pub tags: Option<TagsInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFlags {
    pub is_read: Option<bool>,
    pub is_liked: Option<bool>,
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

/// Ids that don't parse can't exist.
fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::NotFound("article not found".into()))
}

fn not_found() -> ApiError {
    ApiError::NotFound("article not found".into())
}

#[derive(Clone)]
pub struct ArticleService {
    storage: Storage,
}

impl ArticleService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn save(&self, owner: Uuid, input: SaveArticle) -> ApiResult<SavedArticle> {
        let title = required(input.title, "title")?;
        let url = required(input.url, "url")?;
        let tags = input.tags.as_ref().map(TagsInput::normalize).unwrap_or_default();
        if tags.is_empty() {
            return Err(ApiError::Validation("at least one tag is required".into()));
        }
        let published_at = match input.published_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_timestamp(raw)
                    .ok_or_else(|| ApiError::Validation("publishedAt must be an RFC 3339 timestamp".into()))?,
            ),
        };
        let source = input.source.and_then(|s| match s {
            SourceInput::Name(name) => Some(name),
            SourceInput::Object { name } => name,
        });

        let article = SavedArticle {
            id: Uuid::now_v7(),
            title,
            description: input.description,
            content: input.content,
            url,
            image: input.image,
            source,
            published_at,
            tags,
            is_read: false,
            is_liked: false,
            owner_id: owner,
            saved_at: Utc::now(),
        };
        self.storage.insert_article(&article)?;
        info!(%owner, article_id = %article.id, "article saved");
        Ok(article)
    }

    pub fn list(&self, owner: Uuid) -> ApiResult<Vec<SavedArticle>> {
        let articles = self.storage.list_articles(owner)?;
        debug!(%owner, count = articles.len(), "listed saved articles");
        Ok(articles)
    }

    pub fn delete(&self, owner: Uuid, id: &str) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.storage.delete_article_owned(owner, id).map_err(|e| match e {
            StorageError::NotFound => not_found(),
            other => other.into(),
        })?;
        info!(%owner, article_id = %id, "article deleted");
        Ok(())
    }

    pub fn update_flags(&self, owner: Uuid, id: &str, flags: ArticleFlags) -> ApiResult<SavedArticle> {
        if flags.is_read.is_none() && flags.is_liked.is_none() {
            return Err(ApiError::Validation("isRead or isLiked is required".into()));
        }
        let id = parse_id(id)?;
        let updated = self
            .storage
            .update_article_owned(owner, id, |article| {
                if let Some(read) = flags.is_read {
                    article.is_read = read;
                }
                if let Some(liked) = flags.is_liked {
                    article.is_liked = liked;
                }
            })
            .map_err(|e| match e {
                StorageError::NotFound => not_found(),
                other => other.into(),
            })?;
        debug!(%owner, article_id = %id, "article flags updated");
        Ok(updated)
    }

    /// Key points and sentiment of an owned article's description.
    pub fn summarize(&self, owner: Uuid, id: &str) -> ApiResult<Summary> {
        let id = parse_id(id)?;
        let article = self
            .storage
            .get_article_owned(owner, id)?
            .ok_or_else(not_found)?;
        Ok(summarize::summarize(article.description.as_deref().unwrap_or_default()))
    }
}
