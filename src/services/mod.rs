//! Services layer - Business logic
//!
//! This module contains the business logic services of the Logue service.
//! Services are responsible for:
//! - Validating input before it reaches the repositories
//! - Coordinating between repositories and cache
//! - Mapping failures onto [`ServiceError`]

pub mod author;
pub mod category;
pub mod image;
pub mod index;
pub mod logue_page;
pub mod render;
pub mod tag;

pub use author::AuthorService;
pub use category::CategoryService;
pub use image::ImageService;
pub use index::{IndexService, ListingPage, TagFilterResult};
pub use logue_page::{LoguePageService, LoguePageView};
pub use render::{BodyRenderer, RenderContext};
pub use tag::{generate_tag_slug, TagService};

use crate::cache::{Cache, CacheLayer, LOGUE_PREFIX};
use crate::db::repositories::is_unique_violation;
use crate::models::blocks::{is_http_url, BlockError};

/// Error type shared by every service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness conflict (slug or name already taken)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<BlockError> for ServiceError {
    fn from(err: BlockError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Require a non-blank value of at most `max` characters
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{} cannot be empty", field)));
    }
    check_max_len(field, value, max)
}

pub(crate) fn check_max_len(field: &str, value: &str, max: usize) -> ServiceResult<()> {
    if value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Maximum slug length (column width)
pub const SLUG_MAX_LEN: usize = 255;

/// Require a URL path segment made of letters, digits, `-` and `_`
pub(crate) fn validate_slug(slug: &str) -> ServiceResult<()> {
    require_text("Slug", slug, SLUG_MAX_LEN)?;
    if !slug
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ServiceError::Validation(format!(
            "Slug '{}' may only contain letters, digits, '-' and '_'",
            slug
        )));
    }
    Ok(())
}

pub(crate) fn require_http_url(field: &str, value: &str) -> ServiceResult<()> {
    if !is_http_url(value) {
        return Err(ServiceError::Validation(format!(
            "{} must be an absolute http(s) URL",
            field
        )));
    }
    Ok(())
}

/// Map a failed insert or update to `Conflict` when a unique slug index
/// rejected it, which catches writers racing past the pre-check.
pub(crate) fn slug_conflict(err: anyhow::Error, slug: &str) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::Conflict(format!("Slug '{}' is already in use", slug))
    } else {
        ServiceError::Internal(err)
    }
}

/// Drop every cached Logue view after a content write.
///
/// The generation bump retires keys that in-flight reads are about to
/// store; the pattern delete frees what is already cached. A failed delete
/// is logged and otherwise ignored since the write itself already succeeded.
pub(crate) async fn invalidate_content(cache: &Cache) {
    cache.bump_generation();
    let pattern = format!("{}*", LOGUE_PREFIX);
    if let Err(e) = cache.delete_pattern(&pattern).await {
        tracing::warn!("Failed to invalidate Logue cache: {}", e);
    }
}
