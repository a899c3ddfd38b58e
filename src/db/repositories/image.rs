//! Image repository
//!
//! Database operations for registered images.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::Image;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const SELECT_IMAGE: &str = "SELECT id, title, url, width, height, created_at FROM images";

/// Image repository trait
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Register a new image
    async fn create(&self, image: &Image) -> Result<Image>;

    /// Get image by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Image>>;

    /// Get several images at once; missing IDs are absent from the result
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Image>>;

    /// List all images, newest first
    async fn list(&self) -> Result<Vec<Image>>;

    /// Delete an image. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based image repository implementation
pub struct SqlxImageRepository {
    pool: DynDatabasePool,
}

impl SqlxImageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ImageRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ImageRepository for SqlxImageRepository {
    async fn create(&self, image: &Image) -> Result<Image> {
        let now = Utc::now();
        let sql = "INSERT INTO images (title, url, width, height, created_at) VALUES (?, ?, ?, ?, ?)";

        let id = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(&image.title)
            .bind(&image.url)
            .bind(image.width)
            .bind(image.height)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create image")?
            .insert_id());

        Ok(Image {
            id,
            created_at: now,
            ..image.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Image>> {
        let sql = format!("{} WHERE id = ?", SELECT_IMAGE);
        with_pool!(self.pool, p => sqlx::query_as::<_, Image>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get image by ID"))
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Image>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{} WHERE id IN ({}) ORDER BY id", SELECT_IMAGE, placeholders);

        with_pool!(self.pool, p => {
            let mut query = sqlx::query_as::<_, Image>(&sql);
            for id in ids {
                query = query.bind(*id);
            }
            query.fetch_all(p).await.context("Failed to get images")
        })
    }

    async fn list(&self) -> Result<Vec<Image>> {
        let sql = format!("{} ORDER BY created_at DESC, id DESC", SELECT_IMAGE);
        with_pool!(self.pool, p => sqlx::query_as::<_, Image>(&sql)
            .fetch_all(p)
            .await
            .context("Failed to list images"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Authors, categories and page headers are nulled; gallery rows cascade
        let affected = with_pool!(self.pool, p => sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete image")?
            .rows_affected());
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxImageRepository {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxImageRepository::new(pool)
    }

    fn image(title: &str) -> Image {
        Image::new(
            title.to_string(),
            format!("/media/{}.jpg", title),
            Some(800),
            Some(600),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_image() {
        let repo = setup_test_repo().await;
        let created = repo.create(&image("hero")).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "hero");
        assert_eq!(found.width, Some(800));
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let repo = setup_test_repo().await;
        let a = repo.create(&image("a")).await.unwrap();
        let b = repo.create(&image("b")).await.unwrap();

        let found = repo.get_many(&[b.id, 9999, a.id]).await.unwrap();
        let ids: Vec<i64> = found.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert!(repo.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_image() {
        let repo = setup_test_repo().await;
        let created = repo.create(&image("gone")).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
