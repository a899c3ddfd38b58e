//! Logue category snippet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a category name
pub const CATEGORY_NAME_MAX_LEN: usize = 240;

/// Category snippet; pages hold an unordered set of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct LogueCategory {
    pub id: i64,
    pub name: String,
    /// Optional icon, nulled when the image is deleted
    pub icon_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl LogueCategory {
    pub fn new(name: String, icon_id: Option<i64>) -> Self {
        Self {
            id: 0,
            name,
            icon_id,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for LogueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Input for creating or replacing a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub icon_id: Option<i64>,
}
