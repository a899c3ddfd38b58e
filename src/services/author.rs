//! Author service
//!
//! Authors are snippets referenced by Logue pages in a fixed order.
//! Deleting an author removes it from every page that lists it.

use crate::cache::Cache;
use crate::db::repositories::{AuthorRepository, ImageRepository};
use crate::models::{AuthorInput, LogueAuthor, AUTHOR_NAME_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

use super::{invalidate_content, require_http_url, require_text, ServiceError, ServiceResult};

/// Author service
pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
    images: Arc<dyn ImageRepository>,
    cache: Arc<Cache>,
}

impl AuthorService {
    pub fn new(
        repo: Arc<dyn AuthorRepository>,
        images: Arc<dyn ImageRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self { repo, images, cache }
    }

    async fn validate(&self, input: &AuthorInput) -> ServiceResult<()> {
        require_text("Author name", &input.name, AUTHOR_NAME_MAX_LEN)?;
        if let Some(website) = input.website.as_deref().filter(|w| !w.is_empty()) {
            require_http_url("Author website", website)?;
        }
        if let Some(image_id) = input.image_id {
            if self
                .images
                .get_by_id(image_id)
                .await
                .context("Failed to get image")?
                .is_none()
            {
                return Err(ServiceError::Validation(format!(
                    "Author image {} does not exist",
                    image_id
                )));
            }
        }
        Ok(())
    }

    pub async fn create(&self, input: AuthorInput) -> ServiceResult<LogueAuthor> {
        self.validate(&input).await?;

        let author = LogueAuthor::new(
            input.name.trim().to_string(),
            input.website.filter(|w| !w.is_empty()),
            input.image_id,
        );
        let created = self
            .repo
            .create(&author)
            .await
            .context("Failed to create author")?;
        tracing::info!("Created author '{}' ({})", created.name, created.id);

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<LogueAuthor> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| ServiceError::NotFound(format!("Author with ID {} not found", id)))
    }

    /// List all authors ordered by name
    pub async fn list(&self) -> ServiceResult<Vec<LogueAuthor>> {
        Ok(self.repo.list().await.context("Failed to list authors")?)
    }

    /// Replace every field of an author
    pub async fn update(&self, id: i64, input: AuthorInput) -> ServiceResult<LogueAuthor> {
        let existing = self.get_by_id(id).await?;
        self.validate(&input).await?;

        let author = LogueAuthor {
            name: input.name.trim().to_string(),
            website: input.website.filter(|w| !w.is_empty()),
            image_id: input.image_id,
            ..existing
        };
        let updated = self
            .repo
            .update(&author)
            .await
            .context("Failed to update author")?;
        invalidate_content(&self.cache).await;

        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(id).await.context("Failed to delete author")? {
            return Err(ServiceError::NotFound(format!("Author with ID {} not found", id)));
        }
        tracing::info!("Deleted author {}", id);
        invalidate_content(&self.cache).await;
        Ok(())
    }

    /// Fail with a validation error naming the first id that is not an author
    pub async fn ensure_all_exist(&self, ids: &[i64]) -> ServiceResult<()> {
        let found = self
            .repo
            .get_many(ids)
            .await
            .context("Failed to load authors")?;
        match ids.iter().find(|id| !found.iter().any(|a| a.id == **id)) {
            Some(missing) => Err(ServiceError::Validation(format!(
                "Author {} does not exist",
                missing
            ))),
            None => Ok(()),
        }
    }
}
