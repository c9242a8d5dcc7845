// Article record types
// Defines the persisted article shape and the validated title/content pair

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::StoreError;

/// A single article as persisted in the JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Creation time, never modified after create
    pub timestamp: String,
    /// Last update time, absent until the first update
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Fields present in the stored document that this service does not manage
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub(crate) fn new(id: u64, fields: ArticleFields) -> Self {
        Self {
            id,
            title: fields.title,
            content: fields.content,
            timestamp: now_iso8601(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    pub(crate) fn apply(&mut self, fields: ArticleFields) {
        self.title = fields.title;
        self.content = fields.content;
        self.updated_at = Some(now_iso8601());
    }
}

/// Title and content that passed presence validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleFields {
    title: String,
    content: String,
}

impl ArticleFields {
    /// Both fields must be present and non-empty
    pub fn new(title: Option<String>, content: Option<String>) -> Result<Self, StoreError> {
        match (title, content) {
            (Some(title), Some(content)) if !title.is_empty() && !content.is_empty() => {
                Ok(Self { title, content })
            }
            _ => Err(StoreError::InvalidInput(
                "Missing title or content.".to_string(),
            )),
        }
    }
}

/// Current UTC time as `2025-01-01T12:00:00.000Z`
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Next id for a collection: one past the highest id, or 1 when empty
pub fn next_id(articles: &[Article]) -> Result<u64, StoreError> {
    match articles.iter().map(|a| a.id).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max)),
    }
}
