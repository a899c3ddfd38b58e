//! Tag model
//!
//! Free-form tags attached to Logue pages. A page's tags form a set; tags are
//! created on first use and looked up by exact name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name (unique, matched exactly by the tag filter)
    pub name: String,
    /// URL-friendly slug
    pub slug: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new Tag with the given parameters.
    ///
    /// The ID will be set to 0 and should be assigned by the database.
    pub fn new(name: String, slug: String) -> Self {
        Self {
            id: 0,
            name,
            slug,
            created_at: Utc::now(),
        }
    }
}

/// Tag with page count for tag cloud functionality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of pages carrying this tag
    pub page_count: i64,
}

impl TagWithCount {
    pub fn new(tag: Tag, page_count: i64) -> Self {
        Self { tag, page_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new("Rust Programming".to_string(), "rust-programming".to_string());

        assert_eq!(tag.id, 0);
        assert_eq!(tag.slug, "rust-programming");
        assert_eq!(tag.name, "Rust Programming");
    }

    #[test]
    fn test_tag_with_count_serializes_flat() {
        let tag = Tag::new("Rust".to_string(), "rust".to_string());
        let json = serde_json::to_value(TagWithCount::new(tag, 42)).unwrap();

        assert_eq!(json["name"], "Rust");
        assert_eq!(json["page_count"], 42);
    }
}
