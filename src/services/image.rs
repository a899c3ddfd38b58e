//! Image service
//!
//! Images are registered by URL; the files themselves live elsewhere.
//! Deleting an image nulls author, category and page references to it and
//! removes the gallery entries that show it.

use crate::cache::Cache;
use crate::db::repositories::ImageRepository;
use crate::models::{CreateImageInput, Image};
use anyhow::Context;
use std::sync::Arc;

use super::{invalidate_content, require_text, ServiceError, ServiceResult};

const IMAGE_TITLE_MAX_LEN: usize = 255;
const IMAGE_URL_MAX_LEN: usize = 500;

/// Image service
pub struct ImageService {
    repo: Arc<dyn ImageRepository>,
    cache: Arc<Cache>,
}

impl ImageService {
    pub fn new(repo: Arc<dyn ImageRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Register an image
    pub async fn register(&self, input: CreateImageInput) -> ServiceResult<Image> {
        require_text("Image title", &input.title, IMAGE_TITLE_MAX_LEN)?;
        require_text("Image URL", &input.url, IMAGE_URL_MAX_LEN)?;
        for (field, value) in [("width", input.width), ("height", input.height)] {
            if matches!(value, Some(v) if v <= 0) {
                return Err(ServiceError::Validation(format!(
                    "Image {} must be positive",
                    field
                )));
            }
        }

        let image = Image::new(
            input.title.trim().to_string(),
            input.url.trim().to_string(),
            input.width,
            input.height,
        );
        let created = self
            .repo
            .create(&image)
            .await
            .context("Failed to register image")?;
        tracing::info!("Registered image {} ({})", created.id, created.url);

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Image> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get image")?
            .ok_or_else(|| ServiceError::NotFound(format!("Image with ID {} not found", id)))
    }

    /// Images with the given ids; missing ids are skipped
    pub async fn get_many(&self, ids: &[i64]) -> ServiceResult<Vec<Image>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .repo
            .get_many(ids)
            .await
            .context("Failed to load images")?)
    }

    /// List images, newest first
    pub async fn list(&self) -> ServiceResult<Vec<Image>> {
        Ok(self.repo.list().await.context("Failed to list images")?)
    }

    /// Fail with a validation error unless image `id` exists
    pub async fn ensure_exists(&self, field: &str, id: i64) -> ServiceResult<()> {
        match self.repo.get_by_id(id).await.context("Failed to get image")? {
            Some(_) => Ok(()),
            None => Err(ServiceError::Validation(format!(
                "{} refers to missing image {}",
                field, id
            ))),
        }
    }

    /// Fail with a validation error naming the first id that is not an image
    pub async fn ensure_all_exist(&self, field: &str, ids: &[i64]) -> ServiceResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self
            .repo
            .get_many(ids)
            .await
            .context("Failed to load images")?;
        match ids.iter().find(|id| !found.iter().any(|image| image.id == **id)) {
            Some(missing) => Err(ServiceError::Validation(format!(
                "{} refers to missing image {}",
                field, missing
            ))),
            None => Ok(()),
        }
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(id).await.context("Failed to delete image")? {
            return Err(ServiceError::NotFound(format!("Image with ID {} not found", id)));
        }
        tracing::info!("Deleted image {}", id);
        invalidate_content(&self.cache).await;
        Ok(())
    }
}
