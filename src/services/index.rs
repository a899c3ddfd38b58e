//! Index service
//!
//! Admin management of index and tag index pages, and the two public views
//! they serve:
//! - the paginated listing of an index page's live, public children
//! - the tag filter of a tag index page
//!
//! Listing pages are cached per content generation, index page and raw page
//! parameter. Every write here drops all cached Logue views.

use crate::cache::{listing_key, Cache, CacheLayer};
use crate::db::repositories::{IndexPageRepository, LoguePageRepository};
use crate::models::{
    resolve_page, IndexPageInput, ListParams, LogueIndexPage, LoguePageItem, LogueTagIndexPage,
    PageFallback, PagedResult, TagIndexPageInput,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{
    invalidate_content, require_text, slug_conflict, validate_slug, ServiceError, ServiceResult,
};

const TITLE_MAX_LEN: usize = 255;

/// One page of an index page's listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage {
    pub index_page: LogueIndexPage,
    pub items: Vec<LoguePageItem>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl ListingPage {
    fn new(index_page: LogueIndexPage, result: PagedResult<LoguePageItem>) -> Self {
        Self {
            index_page,
            total_pages: result.total_pages(),
            has_next: result.has_next(),
            has_prev: result.has_prev(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            items: result.items,
        }
    }
}

/// Pages carrying one tag
#[derive(Debug, Clone, Serialize)]
pub struct TagFilterResult {
    pub tag_index_page: LogueTagIndexPage,
    /// Requested tag name, if any
    pub tag: Option<String>,
    pub items: Vec<LoguePageItem>,
}

/// Index service
pub struct IndexService {
    repo: Arc<dyn IndexPageRepository>,
    pages: Arc<dyn LoguePageRepository>,
    cache: Arc<Cache>,
    per_page: u32,
    cache_ttl: Duration,
}

impl IndexService {
    pub fn new(
        repo: Arc<dyn IndexPageRepository>,
        pages: Arc<dyn LoguePageRepository>,
        cache: Arc<Cache>,
        per_page: u32,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            pages,
            cache,
            per_page: per_page.max(1),
            cache_ttl,
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    // ========================================================================
    // Index pages
    // ========================================================================

    pub async fn create_index(&self, input: IndexPageInput) -> ServiceResult<LogueIndexPage> {
        validate_slug(&input.slug)?;
        require_text("Title", &input.title, TITLE_MAX_LEN)?;

        let mut page = LogueIndexPage::new(input.slug, input.title.trim().to_string(), input.intro);
        page.live = input.live;

        let created = self
            .repo
            .create_index(&page)
            .await
            .map_err(|e| slug_conflict(e, &page.slug))?;
        tracing::info!("Created index page '{}' ({})", created.slug, created.id);
        invalidate_content(&self.cache).await;

        Ok(created)
    }

    pub async fn get_index(&self, id: i64) -> ServiceResult<LogueIndexPage> {
        self.repo
            .get_index_by_id(id)
            .await
            .context("Failed to get index page")?
            .ok_or_else(|| ServiceError::NotFound(format!("Index page with ID {} not found", id)))
    }

    /// A live index page by slug
    pub async fn get_live_index(&self, slug: &str) -> ServiceResult<LogueIndexPage> {
        self.repo
            .get_index_by_slug(slug)
            .await
            .context("Failed to get index page")?
            .filter(|page| page.live)
            .ok_or_else(|| ServiceError::NotFound(format!("Index page '{}' not found", slug)))
    }

    pub async fn list_indexes(&self) -> ServiceResult<Vec<LogueIndexPage>> {
        Ok(self
            .repo
            .list_indexes()
            .await
            .context("Failed to list index pages")?)
    }

    pub async fn update_index(
        &self,
        id: i64,
        input: IndexPageInput,
    ) -> ServiceResult<LogueIndexPage> {
        let existing = self.get_index(id).await?;
        validate_slug(&input.slug)?;
        require_text("Title", &input.title, TITLE_MAX_LEN)?;

        let page = LogueIndexPage {
            slug: input.slug,
            title: input.title.trim().to_string(),
            intro: input.intro,
            live: input.live,
            ..existing
        };
        let updated = self
            .repo
            .update_index(&page)
            .await
            .map_err(|e| slug_conflict(e, &page.slug))?;
        invalidate_content(&self.cache).await;

        Ok(updated)
    }

    /// Delete an index page together with all of its Logue pages
    pub async fn delete_index(&self, id: i64) -> ServiceResult<()> {
        if !self
            .repo
            .delete_index(id)
            .await
            .context("Failed to delete index page")?
        {
            return Err(ServiceError::NotFound(format!(
                "Index page with ID {} not found",
                id
            )));
        }
        tracing::info!("Deleted index page {}", id);
        invalidate_content(&self.cache).await;
        Ok(())
    }

    // ========================================================================
    // Tag index pages
    // ========================================================================

    pub async fn create_tag_index(
        &self,
        input: TagIndexPageInput,
    ) -> ServiceResult<LogueTagIndexPage> {
        validate_slug(&input.slug)?;
        require_text("Title", &input.title, TITLE_MAX_LEN)?;

        let mut page = LogueTagIndexPage::new(input.slug, input.title.trim().to_string());
        page.live = input.live;

        let created = self
            .repo
            .create_tag_index(&page)
            .await
            .map_err(|e| slug_conflict(e, &page.slug))?;
        tracing::info!("Created tag index page '{}' ({})", created.slug, created.id);

        Ok(created)
    }

    pub async fn get_tag_index(&self, id: i64) -> ServiceResult<LogueTagIndexPage> {
        self.repo
            .get_tag_index_by_id(id)
            .await
            .context("Failed to get tag index page")?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Tag index page with ID {} not found", id))
            })
    }

    pub async fn list_tag_indexes(&self) -> ServiceResult<Vec<LogueTagIndexPage>> {
        Ok(self
            .repo
            .list_tag_indexes()
            .await
            .context("Failed to list tag index pages")?)
    }

    pub async fn update_tag_index(
        &self,
        id: i64,
        input: TagIndexPageInput,
    ) -> ServiceResult<LogueTagIndexPage> {
        let existing = self.get_tag_index(id).await?;
        validate_slug(&input.slug)?;
        require_text("Title", &input.title, TITLE_MAX_LEN)?;

        let page = LogueTagIndexPage {
            slug: input.slug,
            title: input.title.trim().to_string(),
            live: input.live,
            ..existing
        };
        Ok(self
            .repo
            .update_tag_index(&page)
            .await
            .map_err(|e| slug_conflict(e, &page.slug))?)
    }

    pub async fn delete_tag_index(&self, id: i64) -> ServiceResult<()> {
        if !self
            .repo
            .delete_tag_index(id)
            .await
            .context("Failed to delete tag index page")?
        {
            return Err(ServiceError::NotFound(format!(
                "Tag index page with ID {} not found",
                id
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Public views
    // ========================================================================

    /// Paginated listing of an index page's live, public children.
    ///
    /// `raw_page` is the unparsed `page` query value. A missing or
    /// non-integer value shows page 1; an out-of-range integer shows the
    /// last page. Neither is an error.
    pub async fn listing(
        &self,
        index_slug: &str,
        raw_page: Option<&str>,
    ) -> ServiceResult<ListingPage> {
        // Read before any content so a concurrent write retires this key
        let generation = self.cache.generation();
        let index = self.get_live_index(index_slug).await?;

        let key = listing_key(generation, index.id, raw_page);
        if let Some(cached) = self.cache.get::<ListingPage>(&key).await.ok().flatten() {
            tracing::debug!("Listing cache hit: {}", key);
            return Ok(cached);
        }

        let total = self
            .pages
            .count_live_children(index.id)
            .await
            .context("Failed to count Logue pages")?;
        let (page, fallback) = resolve_page(raw_page, total, self.per_page);
        match (fallback, raw_page) {
            (Some(PageFallback::FirstPage), Some(raw)) => {
                tracing::debug!("Page parameter '{}' is not an integer, showing page 1", raw)
            }
            (Some(PageFallback::LastPage), Some(raw)) => {
                tracing::debug!("Page parameter '{}' is out of range, showing page {}", raw, page)
            }
            _ => {}
        }

        let params = ListParams::new(page, self.per_page);
        let items = self
            .pages
            .list_live_children(index.id, &params)
            .await
            .context("Failed to list Logue pages")?;

        let listing = ListingPage::new(
            index,
            PagedResult::new(items, total, &params).map(LoguePageItem::from),
        );

        if let Err(e) = self.cache.set(&key, &listing, self.cache_ttl).await {
            tracing::warn!("Failed to cache listing {}: {}", key, e);
        }

        Ok(listing)
    }

    /// Every page tagged with exactly `raw_tag`, live or not.
    ///
    /// A missing or unknown tag yields an empty list.
    pub async fn tag_filter(
        &self,
        tag_index_slug: &str,
        raw_tag: Option<&str>,
    ) -> ServiceResult<TagFilterResult> {
        let tag_index_page = self
            .repo
            .get_tag_index_by_slug(tag_index_slug)
            .await
            .context("Failed to get tag index page")?
            .filter(|page| page.live)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Tag index page '{}' not found", tag_index_slug))
            })?;

        let items = match raw_tag {
            Some(tag) => self
                .pages
                .list_by_tag_name(tag)
                .await
                .context("Failed to filter Logue pages by tag")?
                .into_iter()
                .map(LoguePageItem::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(TagFilterResult {
            tag_index_page,
            tag: raw_tag.map(str::to_string),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        AuthorRepository, SqlxAuthorRepository, SqlxIndexPageRepository,
        SqlxLoguePageRepository, SqlxTagRepository, TagRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{LogueAuthor, LoguePageFields, StreamBody, Tag, Visibility};
    use crate::services::TagService;
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;

    struct Fixture {
        pool: DynDatabasePool,
        pages: Arc<SqlxLoguePageRepository>,
        cache: Arc<Cache>,
        service: IndexService,
        author_id: i64,
    }

    async fn fixture_with(cache: CacheConfig) -> Fixture {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let author = SqlxAuthorRepository::new(pool.clone())
            .create(&LogueAuthor::new("Ada".to_string(), None, None))
            .await
            .unwrap();
        let pages = Arc::new(SqlxLoguePageRepository::new(pool.clone()));
        let cache = create_cache(&cache);
        let service = IndexService::new(
            SqlxIndexPageRepository::boxed(pool.clone()),
            pages.clone(),
            cache.clone(),
            4,
            Duration::from_secs(60),
        );

        Fixture {
            pool,
            pages,
            cache,
            service,
            author_id: author.id,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        })
        .await
    }

    fn index_input(slug: &str) -> IndexPageInput {
        IndexPageInput {
            slug: slug.to_string(),
            title: "Logue".to_string(),
            intro: String::new(),
            live: true,
        }
    }

    fn fields(f: &Fixture, index_id: i64, slug: &str, tag_ids: Vec<i64>) -> LoguePageFields {
        LoguePageFields {
            index_page_id: index_id,
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            header_image_id: None,
            feed_image_id: None,
            intro: "Intro".to_string(),
            body: StreamBody::default(),
            search_text: String::new(),
            visibility: Visibility::Public,
            author_ids: vec![f.author_id],
            tag_ids,
            category_ids: Vec::new(),
            gallery_images: Vec::new(),
            related_links: Vec::new(),
        }
    }

    /// Create `count` live pages published on consecutive days
    async fn publish_pages(f: &Fixture, index_id: i64, count: u32) {
        for day in 1..=count {
            let page = f
                .pages
                .create(&fields(f, index_id, &format!("post-{}", day), Vec::new()), false)
                .await
                .unwrap();
            f.pages
                .set_published(page.id, Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap())
                .await
                .unwrap();
        }
    }

    fn slugs(listing: &ListingPage) -> Vec<&str> {
        listing.items.iter().map(|i| i.page.slug.as_str()).collect()
    }

    #[tokio::test]
    async fn test_index_crud_and_conflict() {
        let f = fixture().await;
        let created = f.service.create_index(index_input("logue")).await.unwrap();
        assert_eq!(created.slug, "logue");

        assert!(matches!(
            f.service.create_index(index_input("logue")).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            f.service.create_index(index_input("bad slug")).await,
            Err(ServiceError::Validation(_))
        ));

        let mut input = index_input("journal");
        input.intro = "<p>Notes</p>".to_string();
        let updated = f.service.update_index(created.id, input).await.unwrap();
        assert_eq!(updated.slug, "journal");
        assert_eq!(updated.intro, "<p>Notes</p>");

        f.service.delete_index(created.id).await.unwrap();
        assert!(matches!(
            f.service.get_index(created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_tag_index_crud() {
        let f = fixture().await;
        let created = f
            .service
            .create_tag_index(TagIndexPageInput {
                slug: "tags".to_string(),
                title: "Tags".to_string(),
                live: true,
            })
            .await
            .unwrap();

        assert_eq!(f.service.list_tag_indexes().await.unwrap().len(), 1);
        f.service.delete_tag_index(created.id).await.unwrap();
        assert!(matches!(
            f.service.delete_tag_index(created.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_pages_newest_first() {
        let f = fixture().await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        publish_pages(&f, index.id, 9).await;

        let first = f.service.listing("logue", Some("1")).await.unwrap();
        assert_eq!(slugs(&first), vec!["post-9", "post-8", "post-7", "post-6"]);
        assert_eq!(first.total, 9);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next);
        assert!(!first.has_prev);

        let last = f.service.listing("logue", Some("3")).await.unwrap();
        assert_eq!(slugs(&last), vec!["post-1"]);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[tokio::test]
    async fn test_listing_page_fallbacks() {
        let f = fixture().await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        publish_pages(&f, index.id, 9).await;

        for raw in [None, Some(""), Some("abc"), Some("1.5")] {
            assert_eq!(f.service.listing("logue", raw).await.unwrap().page, 1);
        }
        for raw in ["0", "-2", "4", "99999999999999999999"] {
            assert_eq!(f.service.listing("logue", Some(raw)).await.unwrap().page, 3);
        }
    }

    #[tokio::test]
    async fn test_listing_excludes_drafts_private_and_other_indexes() {
        let f = fixture().await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        let other = f.service.create_index(index_input("other")).await.unwrap();

        f.pages
            .create(&fields(&f, index.id, "draft", Vec::new()), false)
            .await
            .unwrap();
        let mut private = fields(&f, index.id, "private", Vec::new());
        private.visibility = Visibility::Private;
        f.pages.create(&private, true).await.unwrap();
        f.pages
            .create(&fields(&f, other.id, "elsewhere", Vec::new()), true)
            .await
            .unwrap();
        f.pages
            .create(&fields(&f, index.id, "shown", Vec::new()), true)
            .await
            .unwrap();

        let listing = f.service.listing("logue", Some("7")).await.unwrap();
        assert_eq!(slugs(&listing), vec!["shown"]);
        assert_eq!(listing.page, 1);
    }

    #[tokio::test]
    async fn test_empty_listing_has_one_page() {
        let f = fixture().await;
        f.service.create_index(index_input("logue")).await.unwrap();

        let listing = f.service.listing("logue", Some("5")).await.unwrap();
        assert!(listing.items.is_empty());
        assert_eq!(listing.page, 1);
        assert_eq!(listing.total_pages, 1);
    }

    #[tokio::test]
    async fn test_listing_unknown_or_draft_index() {
        let f = fixture().await;
        let mut input = index_input("hidden");
        input.live = false;
        f.service.create_index(input).await.unwrap();

        assert!(matches!(
            f.service.listing("hidden", None).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.listing("missing", None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_cache_invalidated_by_writes() {
        let f = fixture_with(CacheConfig::default()).await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        publish_pages(&f, index.id, 1).await;

        assert_eq!(f.service.listing("logue", None).await.unwrap().total, 1);

        // A write that bypasses the service is not seen until invalidation
        publish_pages_from(&f, index.id, 2).await;
        assert_eq!(f.service.listing("logue", None).await.unwrap().total, 1);

        f.service
            .update_index(index.id, index_input("logue"))
            .await
            .unwrap();
        assert_eq!(f.service.listing("logue", None).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_listing_cache_invalidated_by_tag_delete() {
        let f = fixture_with(CacheConfig::default()).await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        let tag_service = TagService::new(SqlxTagRepository::boxed(f.pool.clone()), f.cache.clone());
        let rust = tag_service.create_or_get("rust").await.unwrap();
        f.pages
            .create(&fields(&f, index.id, "tagged", vec![rust.id]), true)
            .await
            .unwrap();

        let before = f.service.listing("logue", None).await.unwrap();
        assert_eq!(before.items[0].page.tags.len(), 1);

        tag_service.delete(rust.id).await.unwrap();
        let after = f.service.listing("logue", None).await.unwrap();
        assert!(after.items[0].page.tags.is_empty());
    }

    #[tokio::test]
    async fn test_listing_stored_after_invalidation_is_not_served() {
        let f = fixture_with(CacheConfig::default()).await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        publish_pages(&f, index.id, 1).await;

        // A reader takes the generation and builds its listing...
        let generation = f.cache.generation();
        let stale = f.service.listing("logue", None).await.unwrap();
        assert_eq!(stale.total, 1);

        // ...a write lands and invalidates...
        publish_pages_from(&f, index.id, 2).await;
        invalidate_content(&f.cache).await;

        // ...and only then does the slow reader store what it built
        f.cache
            .set(
                &listing_key(generation, index.id, None),
                &stale,
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert_eq!(f.service.listing("logue", None).await.unwrap().total, 2);
    }

    async fn publish_pages_from(f: &Fixture, index_id: i64, day: u32) {
        let page = f
            .pages
            .create(&fields(f, index_id, &format!("late-{}", day), Vec::new()), false)
            .await
            .unwrap();
        f.pages
            .set_published(page.id, Utc.with_ymd_and_hms(2024, 2, day, 9, 0, 0).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_tag_filter() {
        let f = fixture().await;
        let index = f.service.create_index(index_input("logue")).await.unwrap();
        f.service
            .create_tag_index(TagIndexPageInput {
                slug: "tags".to_string(),
                title: "Tags".to_string(),
                live: true,
            })
            .await
            .unwrap();

        let tags = SqlxTagRepository::new(f.pool.clone());
        let news = tags
            .create(&Tag::new("news".to_string(), "news".to_string()))
            .await
            .unwrap();

        f.pages
            .create(&fields(&f, index.id, "tagged-draft", vec![news.id]), false)
            .await
            .unwrap();
        f.pages
            .create(&fields(&f, index.id, "tagged-live", vec![news.id]), true)
            .await
            .unwrap();
        f.pages
            .create(&fields(&f, index.id, "untagged", Vec::new()), true)
            .await
            .unwrap();

        let result = f.service.tag_filter("tags", Some("news")).await.unwrap();
        let found: Vec<&str> = result.items.iter().map(|i| i.page.slug.as_str()).collect();
        assert_eq!(found, vec!["tagged-draft", "tagged-live"]);
        assert_eq!(result.tag.as_deref(), Some("news"));

        assert!(f.service.tag_filter("tags", None).await.unwrap().items.is_empty());
        assert!(f.service.tag_filter("tags", Some("nope")).await.unwrap().items.is_empty());
        assert!(f.service.tag_filter("tags", Some("News")).await.unwrap().items.is_empty());
        assert!(matches!(
            f.service.tag_filter("missing", Some("news")).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// The listing always shows a page within range
        #[test]
        fn listing_page_always_in_range(count in 0u32..10, raw in "[-+]?[0-9a-z]{0,4}") {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let f = fixture().await;
                let index = f.service.create_index(index_input("logue")).await.unwrap();
                publish_pages(&f, index.id, count).await;

                let listing = f.service.listing("logue", Some(&raw)).await.unwrap();
                prop_assert!(listing.page >= 1);
                prop_assert!(listing.page <= listing.total_pages);
                prop_assert!(listing.items.len() <= 4);
                prop_assert_eq!(listing.total, i64::from(count));
                Ok(())
            })?;
        }
    }
}
