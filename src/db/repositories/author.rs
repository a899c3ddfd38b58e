//! Author repository
//!
//! Database operations for Logue author snippets.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::LogueAuthor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_AUTHOR: &str = "SELECT id, name, website, image_id, created_at FROM logue_authors";

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn create(&self, author: &LogueAuthor) -> Result<LogueAuthor>;

    async fn get_by_id(&self, id: i64) -> Result<Option<LogueAuthor>>;

    /// Authors with the given IDs, ordered by ID
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<LogueAuthor>>;

    /// List all authors ordered by name
    async fn list(&self) -> Result<Vec<LogueAuthor>>;

    /// Replace name, website and image of an existing author
    async fn update(&self, author: &LogueAuthor) -> Result<LogueAuthor>;

    /// Delete an author. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, author: &LogueAuthor) -> Result<LogueAuthor> {
        let now = Utc::now();
        let sql = "INSERT INTO logue_authors (name, website, image_id, created_at) VALUES (?, ?, ?, ?)";

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&author.name)
            .bind(&author.website)
            .bind(author.image_id)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create author")?
            .insert_id());

        Ok(LogueAuthor {
            id,
            created_at: now,
            ..author.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<LogueAuthor>> {
        let sql = format!("{} WHERE id = ?", SELECT_AUTHOR);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueAuthor>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get author by ID"))
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<LogueAuthor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{} WHERE id IN ({}) ORDER BY id", SELECT_AUTHOR, placeholders);

        with_pool!(self.pool, p => {
            let mut query = sqlx::query_as::<_, LogueAuthor>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query.fetch_all(p).await.context("Failed to get authors")
        })
    }

    async fn list(&self) -> Result<Vec<LogueAuthor>> {
        let sql = format!("{} ORDER BY name, id", SELECT_AUTHOR);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueAuthor>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list authors"))
    }

    async fn update(&self, author: &LogueAuthor) -> Result<LogueAuthor> {
        let sql = "UPDATE logue_authors SET name = ?, website = ?, image_id = ? WHERE id = ?";
        with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&author.name)
            .bind(&author.website)
            .bind(author.image_id)
            .bind(author.id)
            .execute(p)
            .await
            .context("Failed to update author")?
            .rows_affected());

        Ok(author.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, p => sqlx::query("DELETE FROM logue_authors WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete author")?
            .rows_affected());
        Ok(affected > 0)
    }
}
