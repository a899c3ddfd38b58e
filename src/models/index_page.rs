//! Listing pages
//!
//! `LogueIndexPage` is the parent of Logue pages and lists its live, public
//! children newest first. `LogueTagIndexPage` lists pages by tag name. Neither
//! carries state beyond the common page fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paginated index of Logue pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LogueIndexPage {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// Rich-text introduction (HTML, may be empty)
    pub intro: String,
    pub live: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LogueIndexPage {
    pub fn new(slug: String, title: String, intro: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            intro,
            live: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Tag filter page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LogueTagIndexPage {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub live: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LogueTagIndexPage {
    pub fn new(slug: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            slug,
            title,
            live: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating or replacing a `LogueIndexPage`
#[derive(Debug, Clone, Deserialize)]
pub struct IndexPageInput {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default = "default_live")]
    pub live: bool,
}

/// Input for creating or replacing a `LogueTagIndexPage`
#[derive(Debug, Clone, Deserialize)]
pub struct TagIndexPageInput {
    pub slug: String,
    pub title: String,
    #[serde(default = "default_live")]
    pub live: bool,
}

fn default_live() -> bool {
    true
}
