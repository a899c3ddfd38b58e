//! Logue author snippet
//!
//! Authors are reusable snippets. Pages reference them through an ordered
//! join collection (see [`crate::models::LoguePage::authors`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of an author name
pub const AUTHOR_NAME_MAX_LEN: usize = 140;

/// Reusable author snippet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LogueAuthor {
    pub id: i64,
    pub name: String,
    /// Optional personal website
    pub website: Option<String>,
    /// Portrait, nulled when the image is deleted
    pub image_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl LogueAuthor {
    pub fn new(name: String, website: Option<String>, image_id: Option<i64>) -> Self {
        Self {
            id: 0,
            name,
            website,
            image_id,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for LogueAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Input for creating or replacing an author
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub image_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_name() {
        let author = LogueAuthor::new("Ada Lovelace".to_string(), None, None);
        assert_eq!(author.to_string(), "Ada Lovelace");
        assert_eq!(author.id, 0);
    }
}
