//! Category repository
//!
//! Database operations for Logue category snippets.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::LogueCategory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_CATEGORY: &str = "SELECT id, name, icon_id, created_at FROM logue_categories";

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &LogueCategory) -> Result<LogueCategory>;

    async fn get_by_id(&self, id: i64) -> Result<Option<LogueCategory>>;

    /// Categories with the given IDs, ordered by ID
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<LogueCategory>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<LogueCategory>>;

    async fn update(&self, category: &LogueCategory) -> Result<LogueCategory>;

    /// Delete a category. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &LogueCategory) -> Result<LogueCategory> {
        let now = Utc::now();
        let sql = "INSERT INTO logue_categories (name, icon_id, created_at) VALUES (?, ?, ?)";

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&category.name)
            .bind(category.icon_id)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create category")?
            .insert_id());

        Ok(LogueCategory {
            id,
            created_at: now,
            ..category.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<LogueCategory>> {
        let sql = format!("{} WHERE id = ?", SELECT_CATEGORY);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueCategory>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get category by ID"))
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<LogueCategory>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{} WHERE id IN ({}) ORDER BY id", SELECT_CATEGORY, placeholders);

        with_pool!(self.pool, p => {
            let mut query = sqlx::query_as::<_, LogueCategory>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query.fetch_all(p).await.context("Failed to get categories")
        })
    }

    async fn list(&self) -> Result<Vec<LogueCategory>> {
        let sql = format!("{} ORDER BY name, id", SELECT_CATEGORY);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueCategory>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list categories"))
    }

    async fn update(&self, category: &LogueCategory) -> Result<LogueCategory> {
        with_pool!(self.pool, p => sqlx::query("UPDATE logue_categories SET name = ?, icon_id = ? WHERE id = ?")
            .bind(&category.name)
            .bind(category.icon_id)
            .bind(category.id)
            .execute(p)
            .await
            .context("Failed to update category")?
            .rows_affected());

        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Page links cascade
        let affected = with_pool!(self.pool, p => sqlx::query("DELETE FROM logue_categories WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete category")?
            .rows_affected());
        Ok(affected > 0)
    }
}
