//! Index page repository
//!
//! Database operations for `LogueIndexPage` and `LogueTagIndexPage`.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{LogueIndexPage, LogueTagIndexPage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_INDEX: &str =
    "SELECT id, slug, title, intro, live, created_at, updated_at FROM logue_index_pages";
const SELECT_TAG_INDEX: &str =
    "SELECT id, slug, title, live, created_at, updated_at FROM logue_tag_index_pages";

/// Index page repository trait
#[async_trait]
pub trait IndexPageRepository: Send + Sync {
    async fn create_index(&self, page: &LogueIndexPage) -> Result<LogueIndexPage>;

    async fn get_index_by_id(&self, id: i64) -> Result<Option<LogueIndexPage>>;

    async fn get_index_by_slug(&self, slug: &str) -> Result<Option<LogueIndexPage>>;

    async fn list_indexes(&self) -> Result<Vec<LogueIndexPage>>;

    async fn update_index(&self, page: &LogueIndexPage) -> Result<LogueIndexPage>;

    /// Delete an index page and, through the cascade, its Logue pages
    async fn delete_index(&self, id: i64) -> Result<bool>;

    async fn create_tag_index(&self, page: &LogueTagIndexPage) -> Result<LogueTagIndexPage>;

    async fn get_tag_index_by_id(&self, id: i64) -> Result<Option<LogueTagIndexPage>>;

    async fn get_tag_index_by_slug(&self, slug: &str) -> Result<Option<LogueTagIndexPage>>;

    async fn list_tag_indexes(&self) -> Result<Vec<LogueTagIndexPage>>;

    async fn update_tag_index(&self, page: &LogueTagIndexPage) -> Result<LogueTagIndexPage>;

    async fn delete_tag_index(&self, id: i64) -> Result<bool>;
}

/// SQLx-based index page repository implementation
pub struct SqlxIndexPageRepository {
    pool: DynDatabasePool,
}

impl SqlxIndexPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IndexPageRepository> {
        Arc::new(Self::new(pool))
    }

    async fn delete_from(&self, table: &str, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table);
        let affected = with_pool!(self.pool, p => sqlx::query(&sql)
            .bind(id)
            .execute(p)
            .await
            .with_context(|| format!("Failed to delete from {}", table))?
            .rows_affected());
        Ok(affected > 0)
    }
}

#[async_trait]
impl IndexPageRepository for SqlxIndexPageRepository {
    async fn create_index(&self, page: &LogueIndexPage) -> Result<LogueIndexPage> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO logue_index_pages (slug, title, intro, live, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&page.slug)
            .bind(&page.title)
            .bind(&page.intro)
            .bind(page.live)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create index page")?
            .insert_id());

        Ok(LogueIndexPage {
            id,
            created_at: now,
            updated_at: now,
            ..page.clone()
        })
    }

    async fn get_index_by_id(&self, id: i64) -> Result<Option<LogueIndexPage>> {
        let sql = format!("{} WHERE id = ?", SELECT_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueIndexPage>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get index page by ID"))
    }

    async fn get_index_by_slug(&self, slug: &str) -> Result<Option<LogueIndexPage>> {
        let sql = format!("{} WHERE slug = ?", SELECT_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueIndexPage>(&sql)
            .bind(slug)
            .fetch_optional(p)
            .await
            .context("Failed to get index page by slug"))
    }

    async fn list_indexes(&self) -> Result<Vec<LogueIndexPage>> {
        let sql = format!("{} ORDER BY title, id", SELECT_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueIndexPage>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list index pages"))
    }

    async fn update_index(&self, page: &LogueIndexPage) -> Result<LogueIndexPage> {
        let now = Utc::now();
        let sql = "UPDATE logue_index_pages SET slug = ?, title = ?, intro = ?, live = ?, updated_at = ? WHERE id = ?";

        with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&page.slug)
            .bind(&page.title)
            .bind(&page.intro)
            .bind(page.live)
            .bind(now)
            .bind(page.id)
            .execute(p)
            .await
            .context("Failed to update index page")?
            .rows_affected());

        Ok(LogueIndexPage {
            updated_at: now,
            ..page.clone()
        })
    }

    async fn delete_index(&self, id: i64) -> Result<bool> {
        self.delete_from("logue_index_pages", id).await
    }

    async fn create_tag_index(&self, page: &LogueTagIndexPage) -> Result<LogueTagIndexPage> {
        let now = Utc::now();
        let sql = r#"
            INSERT INTO logue_tag_index_pages (slug, title, live, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
        "#;

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&page.slug)
            .bind(&page.title)
            .bind(page.live)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create tag index page")?
            .insert_id());

        Ok(LogueTagIndexPage {
            id,
            created_at: now,
            updated_at: now,
            ..page.clone()
        })
    }

    async fn get_tag_index_by_id(&self, id: i64) -> Result<Option<LogueTagIndexPage>> {
        let sql = format!("{} WHERE id = ?", SELECT_TAG_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueTagIndexPage>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get tag index page by ID"))
    }

    async fn get_tag_index_by_slug(&self, slug: &str) -> Result<Option<LogueTagIndexPage>> {
        let sql = format!("{} WHERE slug = ?", SELECT_TAG_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueTagIndexPage>(&sql)
            .bind(slug)
            .fetch_optional(p)
            .await
            .context("Failed to get tag index page by slug"))
    }

    async fn list_tag_indexes(&self) -> Result<Vec<LogueTagIndexPage>> {
        let sql = format!("{} ORDER BY title, id", SELECT_TAG_INDEX);
        with_pool!(self.pool, p => sqlx::query_as::<_, LogueTagIndexPage>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list tag index pages"))
    }

    async fn update_tag_index(&self, page: &LogueTagIndexPage) -> Result<LogueTagIndexPage> {
        let now = Utc::now();
        let sql = "UPDATE logue_tag_index_pages SET slug = ?, title = ?, live = ?, updated_at = ? WHERE id = ?";

        with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&page.slug)
            .bind(&page.title)
            .bind(page.live)
            .bind(now)
            .bind(page.id)
            .execute(p)
            .await
            .context("Failed to update tag index page")?
            .rows_affected());

        Ok(LogueTagIndexPage {
            updated_at: now,
            ..page.clone()
        })
    }

    async fn delete_tag_index(&self, id: i64) -> Result<bool> {
        self.delete_from("logue_tag_index_pages", id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::is_unique_violation;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxIndexPageRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxIndexPageRepository::new(pool)
    }

    #[tokio::test]
    async fn test_index_page_crud() {
        let repo = setup_test_repo().await;
        let created = repo
            .create_index(&LogueIndexPage::new(
                "logue".to_string(),
                "Logue".to_string(),
                "<p>Notes</p>".to_string(),
            ))
            .await
            .unwrap();

        let found = repo.get_index_by_slug("logue").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.intro, "<p>Notes</p>");
        assert!(found.live);

        let mut changed = found.clone();
        changed.title = "Journal".to_string();
        changed.live = false;
        repo.update_index(&changed).await.unwrap();

        let found = repo.get_index_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Journal");
        assert!(!found.live);

        assert!(repo.delete_index(created.id).await.unwrap());
        assert!(repo.list_indexes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_slug_is_unique() {
        let repo = setup_test_repo().await;
        let page = LogueIndexPage::new("logue".to_string(), "A".to_string(), String::new());
        repo.create_index(&page).await.unwrap();

        let err = repo.create_index(&page).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_tag_index_page_crud() {
        let repo = setup_test_repo().await;
        let created = repo
            .create_tag_index(&LogueTagIndexPage::new(
                "tags".to_string(),
                "Tags".to_string(),
            ))
            .await
            .unwrap();

        let found = repo.get_tag_index_by_slug("tags").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        let mut changed = found;
        changed.slug = "by-tag".to_string();
        repo.update_tag_index(&changed).await.unwrap();
        assert!(repo.get_tag_index_by_slug("tags").await.unwrap().is_none());
        assert!(repo.get_tag_index_by_id(created.id).await.unwrap().is_some());

        assert_eq!(repo.list_tag_indexes().await.unwrap().len(), 1);
        assert!(repo.delete_tag_index(created.id).await.unwrap());
        assert!(!repo.delete_tag_index(created.id).await.unwrap());
    }
}
