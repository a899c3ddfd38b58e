//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Page-to-tag links are written by the Logue page repository; this module
//! only reads them for the tag cloud.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_TAG: &str = "SELECT id, name, slug, created_at FROM tags";

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get tags with page count (for tag cloud)
    /// Returns tags sorted by page count in descending order
    async fn get_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;

    /// Delete those of `ids` that no page links to; returns how many went
    async fn delete_unused(&self, ids: &[i64]) -> Result<u64>;
}

#[derive(sqlx::FromRow)]
struct TagCountRow {
    #[sqlx(flatten)]
    tag: Tag,
    page_count: i64,
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        let now = Utc::now();
        let sql = "INSERT INTO tags (name, slug, created_at) VALUES (?, ?, ?)";

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&tag.name)
            .bind(&tag.slug)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create tag")?
            .insert_id());

        Ok(Tag {
            id,
            name: tag.name.clone(),
            slug: tag.slug.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = format!("{} WHERE id = ?", SELECT_TAG);
        with_pool!(self.pool, p => sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get tag by ID"))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let sql = format!("{} WHERE name = ?", SELECT_TAG);
        with_pool!(self.pool, p => sqlx::query_as::<_, Tag>(&sql)
            .bind(name)
            .fetch_optional(p)
            .await
            .context("Failed to get tag by name"))
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = format!("{} ORDER BY name", SELECT_TAG);
        with_pool!(self.pool, p => sqlx::query_as::<_, Tag>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list tags"))
    }

    async fn get_with_counts(&self, limit: usize) -> Result<Vec<TagWithCount>> {
        let sql = r#"
            SELECT t.id, t.name, t.slug, t.created_at, COUNT(pt.page_id) AS page_count
            FROM tags t
            LEFT JOIN logue_page_tags pt ON t.id = pt.tag_id
            GROUP BY t.id, t.name, t.slug, t.created_at
            ORDER BY page_count DESC, t.name ASC
            LIMIT ?
        "#;

        let rows = with_pool!(self.pool, p => sqlx::query_as::<_, TagCountRow>(sql)
            .bind(limit as i64)
            .fetch_all(p)
            .await
            .context("Failed to get tags with counts")?);

        Ok(rows
            .into_iter()
            .map(|row| TagWithCount::new(row.tag, row.page_count))
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // logue_page_tags entries are removed by ON DELETE CASCADE
        with_pool!(self.pool, p => sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete tag")?
            .rows_affected());

        Ok(())
    }

    async fn delete_unused(&self, ids: &[i64]) -> Result<u64> {
        let sql = "DELETE FROM tags WHERE id = ? \
                   AND NOT EXISTS (SELECT 1 FROM logue_page_tags WHERE tag_id = ?)";

        let mut removed = 0;
        for &id in ids {
            removed += with_pool!(self.pool, p => sqlx::query(sql)
                .bind(id)
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete unused tag")?
                .rows_affected());
        }
        Ok(removed)
    }
}
