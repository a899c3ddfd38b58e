//! Category service
//!
//! Categories are flat snippets with an optional icon image. A page's
//! categories form a set.

use crate::cache::Cache;
use crate::db::repositories::{CategoryRepository, ImageRepository};
use crate::models::{CategoryInput, LogueCategory, CATEGORY_NAME_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

use super::{invalidate_content, require_text, ServiceError, ServiceResult};

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    images: Arc<dyn ImageRepository>,
    cache: Arc<Cache>,
}

impl CategoryService {
    pub fn new(
        repo: Arc<dyn CategoryRepository>,
        images: Arc<dyn ImageRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self { repo, images, cache }
    }

    async fn validate(&self, input: &CategoryInput) -> ServiceResult<()> {
        require_text("Category name", &input.name, CATEGORY_NAME_MAX_LEN)?;
        if let Some(icon_id) = input.icon_id {
            let icon = self
                .images
                .get_by_id(icon_id)
                .await
                .context("Failed to get image")?;
            if icon.is_none() {
                return Err(ServiceError::Validation(format!(
                    "Category icon {} does not exist",
                    icon_id
                )));
            }
        }
        Ok(())
    }

    pub async fn create(&self, input: CategoryInput) -> ServiceResult<LogueCategory> {
        self.validate(&input).await?;

        let category = LogueCategory::new(input.name.trim().to_string(), input.icon_id);
        let created = self
            .repo
            .create(&category)
            .await
            .context("Failed to create category")?;
        tracing::info!("Created category '{}' ({})", created.name, created.id);

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<LogueCategory> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    /// List all categories ordered by name
    pub async fn list(&self) -> ServiceResult<Vec<LogueCategory>> {
        Ok(self.repo.list().await.context("Failed to list categories")?)
    }

    pub async fn update(&self, id: i64, input: CategoryInput) -> ServiceResult<LogueCategory> {
        let existing = self.get_by_id(id).await?;
        self.validate(&input).await?;

        let category = LogueCategory {
            name: input.name.trim().to_string(),
            icon_id: input.icon_id,
            ..existing
        };
        let updated = self
            .repo
            .update(&category)
            .await
            .context("Failed to update category")?;
        invalidate_content(&self.cache).await;

        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(id).await.context("Failed to delete category")? {
            return Err(ServiceError::NotFound(format!(
                "Category with ID {} not found",
                id
            )));
        }
        tracing::info!("Deleted category {}", id);
        invalidate_content(&self.cache).await;
        Ok(())
    }

    /// Fail with a validation error naming the first id that is not a category
    pub async fn ensure_all_exist(&self, ids: &[i64]) -> ServiceResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self
            .repo
            .get_many(ids)
            .await
            .context("Failed to load categories")?;
        match ids.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
            Some(missing) => Err(ServiceError::Validation(format!(
                "Category {} does not exist",
                missing
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxCategoryRepository, SqlxImageRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            SqlxImageRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
        )
    }

    fn input(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            icon_id: None,
        }
    }

    #[tokio::test]
    async fn test_category_crud() {
        let service = setup_test_service().await;
        let created = service.create(input("Release notes")).await.unwrap();
        assert_eq!(created.to_string(), "Release notes");

        let updated = service.update(created.id, input("Changelog")).await.unwrap();
        assert_eq!(updated.name, "Changelog");
        assert_eq!(service.list().await.unwrap(), vec![updated]);

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.delete(created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_category_validation() {
        let service = setup_test_service().await;
        assert!(service.create(input(" ")).await.is_err());
        assert!(service
            .create(input(&"c".repeat(CATEGORY_NAME_MAX_LEN + 1)))
            .await
            .is_err());
        assert!(service
            .create(input(&"c".repeat(CATEGORY_NAME_MAX_LEN)))
            .await
            .is_ok());

        let missing_icon = CategoryInput {
            icon_id: Some(5),
            ..input("Icons")
        };
        assert!(matches!(
            service.create(missing_icon).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_all_exist() {
        let service = setup_test_service().await;
        let a = service.create(input("A")).await.unwrap();

        assert!(service.ensure_all_exist(&[]).await.is_ok());
        assert!(service.ensure_all_exist(&[a.id]).await.is_ok());
        assert!(service.ensure_all_exist(&[a.id, a.id + 1]).await.is_err());
    }
}
