//! Shared API response types
//!
//! Collections are wrapped in a named field so responses can grow new keys
//! without breaking clients.

use serde::{Deserialize, Serialize};

use crate::models::{Tag, TagWithCount};

/// Tag as returned by `GET /tags`
#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Only present in the tag cloud
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            slug: tag.slug,
            page_count: None,
        }
    }
}

impl From<TagWithCount> for TagResponse {
    fn from(entry: TagWithCount) -> Self {
        Self {
            page_count: Some(entry.page_count),
            ..Self::from(entry.tag)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

/// Plain list of items
#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ItemsResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Search results with the query echoed back
#[derive(Debug, Serialize)]
pub struct SearchResponse<T> {
    pub query: String,
    pub total: usize,
    pub items: Vec<T>,
}
