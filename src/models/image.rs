//! Image model
//!
//! Images are the media assets referenced by authors, categories, page
//! headers, feed cards, galleries and `image` body blocks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered image asset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Image {
    /// Unique identifier
    pub id: i64,
    /// Human-readable title, also used as alt text
    pub title: String,
    /// Public URL of the rendition
    pub url: String,
    pub width: Option<i32>,
    pub height: Option<i32>,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Create a new Image. The ID is assigned by the database.
    pub fn new(title: String, url: String, width: Option<i32>, height: Option<i32>) -> Self {
        Self {
            id: 0,
            title,
            url,
            width,
            height,
            created_at: Utc::now(),
        }
    }
}

/// Input for registering an image
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImageInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}
