//! Tag service
//!
//! Tags are free-form names attached to Logue pages. They are never created
//! directly: a page save names its tags and this service reuses the tag of
//! that exact name or creates it.

use crate::cache::Cache;
use crate::db::repositories::{is_unique_violation, TagRepository};
use crate::models::{Tag, TagWithCount};
use anyhow::Context;
use std::sync::Arc;

use super::{invalidate_content, require_text, ServiceError, ServiceResult};

/// Maximum tag name length (column width)
pub const TAG_NAME_MAX_LEN: usize = 100;

/// Default number of entries in the tag cloud
pub const DEFAULT_CLOUD_LIMIT: usize = 50;

/// Tag ids for a page save
#[derive(Debug, Default)]
pub struct ResolvedTags {
    /// Every named tag, in first-mention order
    pub ids: Vec<i64>,
    /// The subset created by this call
    pub created: Vec<i64>,
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Create a new tag or get the existing one by name
    ///
    /// The name is trimmed first; matching is exact and case-sensitive.
    pub async fn create_or_get(&self, name: &str) -> ServiceResult<Tag> {
        Ok(self.find_or_create(name).await?.0)
    }

    async fn find_or_create(&self, name: &str) -> ServiceResult<(Tag, bool)> {
        let name = name.trim();
        require_text("Tag name", name, TAG_NAME_MAX_LEN)?;

        if let Some(existing) = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok((existing, false));
        }

        let tag = Tag::new(name.to_string(), generate_tag_slug(name));
        match self.repo.create(&tag).await {
            Ok(created) => {
                tracing::info!("Created tag '{}' ({})", created.name, created.id);
                Ok((created, true))
            }
            // Another save created the same name since the lookup above
            Err(e) if is_unique_violation(&e) => {
                let existing = self
                    .repo
                    .get_by_name(name)
                    .await
                    .context("Failed to get tag by name")?
                    .ok_or_else(|| ServiceError::Internal(e.context("Failed to create tag")))?;
                Ok((existing, false))
            }
            Err(e) => Err(ServiceError::Internal(e.context("Failed to create tag"))),
        }
    }

    /// Resolve a list of tag names to tag ids, creating missing tags.
    ///
    /// Blank names are skipped and repeated names collapse to one id.
    pub async fn resolve_names(&self, names: &[String]) -> ServiceResult<ResolvedTags> {
        let mut resolved = ResolvedTags::default();
        for name in names.iter().filter(|n| !n.trim().is_empty()) {
            let (tag, created) = match self.find_or_create(name).await {
                Ok(found) => found,
                Err(e) => {
                    self.discard_created(&resolved).await;
                    return Err(e);
                }
            };
            if created {
                resolved.created.push(tag.id);
            }
            if !resolved.ids.contains(&tag.id) {
                resolved.ids.push(tag.id);
            }
        }
        Ok(resolved)
    }

    /// Undo `resolve_names` after the page save it was for failed.
    ///
    /// Only tags that no page links to are removed, so a tag another writer
    /// attached in the meantime survives.
    pub async fn discard_created(&self, resolved: &ResolvedTags) {
        if resolved.created.is_empty() {
            return;
        }
        match self.repo.delete_unused(&resolved.created).await {
            Ok(removed) => tracing::debug!("Discarded {} unused tags", removed),
            Err(e) => tracing::warn!("Failed to discard unused tags: {}", e),
        }
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> ServiceResult<Vec<Tag>> {
        Ok(self.repo.list().await.context("Failed to list tags")?)
    }

    /// Tags with their page counts, most used first
    pub async fn get_tag_cloud(&self, limit: usize) -> ServiceResult<Vec<TagWithCount>> {
        Ok(self
            .repo
            .get_with_counts(limit)
            .await
            .context("Failed to get tag cloud")?)
    }

    /// Delete a tag; page links are removed by cascade
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| ServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        self.repo.delete(tag.id).await.context("Failed to delete tag")?;
        tracing::info!("Deleted tag '{}' ({})", tag.name, tag.id);

        invalidate_content(&self.cache).await;
        Ok(())
    }
}

/// Generate a URL-friendly slug from a tag name
///
/// Lowercases the name and replaces spaces and ASCII punctuation with
/// single hyphens. Non-ASCII letters are kept as they are.
pub fn generate_tag_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_hyphen = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || !c.is_ascii() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen && !slug.is_empty() {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}
