//! Logue page service
//!
//! Implements business logic for Logue pages:
//! - Create and update with full validation of fields, children and references
//! - Publishing workflow (`live`, first/last published timestamps)
//! - Public detail view with the rendered body and main image
//! - Search over title, intro and body text
//!
//! Every successful write drops all cached Logue views.

use crate::cache::Cache;
use crate::db::repositories::{IndexPageRepository, LoguePageRepository};
use crate::models::blocks::strip_html;
use crate::models::{
    CreateLoguePageInput, GalleryImageInput, Image, LoguePage, LoguePageFields, LoguePageItem,
    RelatedLinkInput, SearchParams, StreamBody, UpdateLoguePageInput, CAPTION_MAX_LEN,
    INTRO_MAX_LEN, LINK_NAME_MAX_LEN, MAX_AUTHORS, MIN_AUTHORS,
};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::render::{BodyRenderer, PageLink, RenderContext};
use super::tag::ResolvedTags;
use super::{
    check_max_len, invalidate_content, require_http_url, require_text, slug_conflict,
    validate_slug, AuthorService, CategoryService, ImageService, ServiceError, ServiceResult,
    TagService,
};

const TITLE_MAX_LEN: usize = 255;
const LINK_URL_MAX_LEN: usize = 200;

/// Public path of a Logue page
pub fn page_path(index_slug: &str, page_slug: &str) -> String {
    format!("/logue/{}/{}", index_slug, page_slug)
}

/// A page as shown on its own, with the body rendered to HTML
#[derive(Debug, Clone, Serialize)]
pub struct LoguePageView {
    #[serde(flatten)]
    pub page: LoguePage,
    pub url: String,
    pub main_image: Option<Image>,
    pub body_html: String,
}

/// Logue page service
pub struct LoguePageService {
    repo: Arc<dyn LoguePageRepository>,
    indexes: Arc<dyn IndexPageRepository>,
    authors: Arc<AuthorService>,
    categories: Arc<CategoryService>,
    images: Arc<ImageService>,
    tags: Arc<TagService>,
    renderer: BodyRenderer,
    cache: Arc<Cache>,
}

impl LoguePageService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn LoguePageRepository>,
        indexes: Arc<dyn IndexPageRepository>,
        authors: Arc<AuthorService>,
        categories: Arc<CategoryService>,
        images: Arc<ImageService>,
        tags: Arc<TagService>,
        renderer: BodyRenderer,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            indexes,
            authors,
            categories,
            images,
            tags,
            renderer,
            cache,
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a page under an existing index page.
    ///
    /// A page created with `live` set is published immediately.
    pub async fn create(&self, input: CreateLoguePageInput) -> ServiceResult<LoguePage> {
        let index = self
            .indexes
            .get_index_by_id(input.index_page_id)
            .await
            .context("Failed to get index page")?;
        if index.is_none() {
            return Err(ServiceError::Validation(format!(
                "Index page {} does not exist",
                input.index_page_id
            )));
        }

        let mut fields = LoguePageFields {
            index_page_id: input.index_page_id,
            slug: input.slug,
            title: input.title.trim().to_string(),
            date: input.date,
            header_image_id: input.header_image_id,
            feed_image_id: input.feed_image_id,
            intro: input.intro.trim().to_string(),
            body: StreamBody::from_input(input.body)?,
            search_text: String::new(),
            visibility: input.visibility,
            author_ids: input.author_ids,
            tag_ids: Vec::new(),
            category_ids: input.category_ids,
            gallery_images: input.gallery_images,
            related_links: input.related_links,
        };
        self.validate(&fields, None, true).await?;

        let resolved = self.tags.resolve_names(&input.tags).await?;
        fields.tag_ids = resolved.ids.clone();
        fields.search_text = search_text(&fields.intro, &fields.body);

        let page = match self.repo.create(&fields, input.live).await {
            Ok(page) => page,
            Err(e) => {
                self.tags.discard_created(&resolved).await;
                return Err(slug_conflict(e, &fields.slug));
            }
        };
        tracing::info!("Created Logue page '{}' ({})", page.slug, page.id);
        invalidate_content(&self.cache).await;

        Ok(page)
    }

    /// Update a page. Omitted fields keep their current values; a supplied
    /// child collection replaces the stored one entirely.
    pub async fn update(&self, id: i64, input: UpdateLoguePageInput) -> ServiceResult<LoguePage> {
        let existing = self.get_by_id(id).await?;

        let body_changed = input.body.is_some();
        let body = match input.body {
            Some(children) => StreamBody::from_input(children)?,
            None => existing.body,
        };

        let mut fields = LoguePageFields {
            index_page_id: existing.index_page_id,
            slug: input.slug.unwrap_or(existing.slug),
            title: input
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.title),
            date: input.date.unwrap_or(existing.date),
            header_image_id: input.header_image_id.unwrap_or(existing.header_image_id),
            feed_image_id: input.feed_image_id.unwrap_or(existing.feed_image_id),
            intro: input
                .intro
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.intro),
            body,
            search_text: String::new(),
            visibility: input.visibility.unwrap_or(existing.visibility),
            author_ids: input
                .author_ids
                .unwrap_or_else(|| existing.authors.iter().map(|a| a.id).collect()),
            tag_ids: existing.tags.iter().map(|t| t.id).collect(),
            category_ids: input
                .category_ids
                .unwrap_or_else(|| existing.categories.iter().map(|c| c.id).collect()),
            gallery_images: input.gallery_images.unwrap_or_else(|| {
                existing
                    .gallery_images
                    .iter()
                    .map(|g| GalleryImageInput {
                        image_id: g.image.id,
                        caption: g.caption.clone(),
                    })
                    .collect()
            }),
            related_links: input.related_links.unwrap_or_else(|| {
                existing
                    .related_links
                    .iter()
                    .map(|l| RelatedLinkInput {
                        name: l.name.clone(),
                        url: l.url.clone(),
                    })
                    .collect()
            }),
        };
        self.validate(&fields, Some(id), body_changed).await?;

        let resolved = match input.tags {
            Some(names) => {
                let resolved = self.tags.resolve_names(&names).await?;
                fields.tag_ids = resolved.ids.clone();
                resolved
            }
            None => ResolvedTags::default(),
        };
        fields.search_text = search_text(&fields.intro, &fields.body);

        let page = match self.repo.update(id, &fields).await {
            Ok(Some(page)) => page,
            Ok(None) => {
                self.tags.discard_created(&resolved).await;
                return Err(not_found(id));
            }
            Err(e) => {
                self.tags.discard_created(&resolved).await;
                return Err(slug_conflict(e, &fields.slug));
            }
        };
        tracing::info!("Updated Logue page '{}' ({})", page.slug, page.id);
        invalidate_content(&self.cache).await;

        Ok(page)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self
            .repo
            .delete(id)
            .await
            .context("Failed to delete Logue page")?
        {
            return Err(not_found(id));
        }
        tracing::info!("Deleted Logue page {}", id);
        invalidate_content(&self.cache).await;
        Ok(())
    }

    /// Make a page live. The first publication time is kept once set.
    pub async fn publish(&self, id: i64) -> ServiceResult<LoguePage> {
        let page = self
            .repo
            .set_published(id, Utc::now())
            .await
            .context("Failed to publish Logue page")?
            .ok_or_else(|| not_found(id))?;
        tracing::info!("Published Logue page '{}' ({})", page.slug, page.id);
        invalidate_content(&self.cache).await;
        Ok(page)
    }

    pub async fn unpublish(&self, id: i64) -> ServiceResult<LoguePage> {
        let page = self
            .repo
            .set_unpublished(id)
            .await
            .context("Failed to unpublish Logue page")?
            .ok_or_else(|| not_found(id))?;
        tracing::info!("Unpublished Logue page '{}' ({})", page.slug, page.id);
        invalidate_content(&self.cache).await;
        Ok(page)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<LoguePage> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get Logue page")?
            .ok_or_else(|| not_found(id))
    }

    /// All pages, optionally under one index page, newest post date first
    pub async fn list(&self, index_page_id: Option<i64>) -> ServiceResult<Vec<LoguePage>> {
        Ok(self
            .repo
            .list(index_page_id)
            .await
            .context("Failed to list Logue pages")?)
    }

    /// First gallery image of a page
    pub async fn main_image(&self, id: i64) -> ServiceResult<Option<Image>> {
        Ok(self.get_by_id(id).await?.main_image().cloned())
    }

    /// A live, public page under a live index page
    pub async fn get_public(&self, index_slug: &str, page_slug: &str) -> ServiceResult<LoguePageView> {
        let index = self
            .indexes
            .get_index_by_slug(index_slug)
            .await
            .context("Failed to get index page")?
            .filter(|index| index.live);

        let page = match index {
            Some(index) => self
                .repo
                .get_by_slug(page_slug)
                .await
                .context("Failed to get Logue page")?
                .filter(|page| page.index_page_id == index.id && page.is_public()),
            None => None,
        };

        match page {
            Some(page) => self.view(page, index_slug).await,
            None => Err(ServiceError::NotFound(format!(
                "Page '{}/{}' not found",
                index_slug, page_slug
            ))),
        }
    }

    async fn view(&self, page: LoguePage, index_slug: &str) -> ServiceResult<LoguePageView> {
        let body_html = self.render_body(&page).await?;
        Ok(LoguePageView {
            url: page_path(index_slug, &page.slug),
            main_image: page.main_image().cloned(),
            body_html,
            page,
        })
    }

    /// Render a page body, resolving the images and pages it refers to.
    ///
    /// Referenced pages that are not publicly visible are left unresolved.
    pub async fn render_body(&self, page: &LoguePage) -> ServiceResult<String> {
        let images = self.images.get_many(&page.body.image_ids()).await?;

        let mut links = HashMap::new();
        let mut index_slugs: HashMap<i64, Option<String>> = HashMap::new();
        for id in page.body.page_ids() {
            let Some(target) = self
                .repo
                .get_by_id(id)
                .await
                .context("Failed to load related page")?
                .filter(LoguePage::is_public)
            else {
                continue;
            };

            if !index_slugs.contains_key(&target.index_page_id) {
                let slug = self
                    .indexes
                    .get_index_by_id(target.index_page_id)
                    .await
                    .context("Failed to load index page")?
                    .map(|index| index.slug);
                index_slugs.insert(target.index_page_id, slug);
            }
            if let Some(Some(index_slug)) = index_slugs.get(&target.index_page_id) {
                links.insert(
                    id,
                    PageLink {
                        url: page_path(index_slug, &target.slug),
                        title: target.title,
                    },
                );
            }
        }

        Ok(self
            .renderer
            .render(&page.body, &RenderContext::new(images, links))?)
    }

    /// Search live, public pages.
    ///
    /// A blank query with no date bounds matches nothing.
    pub async fn search(&self, params: &SearchParams) -> ServiceResult<Vec<LoguePageItem>> {
        if params.q.trim().is_empty() && params.date_from.is_none() && params.date_to.is_none() {
            return Ok(Vec::new());
        }
        if let (Some(from), Some(to)) = (params.date_from, params.date_to) {
            if from > to {
                return Err(ServiceError::Validation(
                    "date_from must not be after date_to".to_string(),
                ));
            }
        }

        let pages = self
            .repo
            .search(params)
            .await
            .context("Failed to search Logue pages")?;
        tracing::debug!("Search '{}' matched {} pages", params.q.trim(), pages.len());

        Ok(pages.into_iter().map(LoguePageItem::from).collect())
    }

    // ========================================================================
    // Validation
    // ========================================================================

    async fn validate(
        &self,
        fields: &LoguePageFields,
        exclude_id: Option<i64>,
        check_body_refs: bool,
    ) -> ServiceResult<()> {
        validate_slug(&fields.slug)?;
        require_text("Title", &fields.title, TITLE_MAX_LEN)?;
        require_text("Intro", &fields.intro, INTRO_MAX_LEN)?;

        let count = fields.author_ids.len();
        if !(MIN_AUTHORS..=MAX_AUTHORS).contains(&count) {
            return Err(ServiceError::Validation(format!(
                "A page needs between {} and {} authors, got {}",
                MIN_AUTHORS, MAX_AUTHORS, count
            )));
        }
        self.authors.ensure_all_exist(&fields.author_ids).await?;
        self.categories.ensure_all_exist(&fields.category_ids).await?;

        if let Some(id) = fields.header_image_id {
            self.images.ensure_exists("header_image_id", id).await?;
        }
        if let Some(id) = fields.feed_image_id {
            self.images.ensure_exists("feed_image_id", id).await?;
        }

        for item in &fields.gallery_images {
            check_max_len("Gallery caption", &item.caption, CAPTION_MAX_LEN)?;
        }
        let gallery_ids: Vec<i64> = fields.gallery_images.iter().map(|g| g.image_id).collect();
        self.images.ensure_all_exist("gallery_images", &gallery_ids).await?;

        for link in &fields.related_links {
            require_text("Link name", &link.name, LINK_NAME_MAX_LEN)?;
            require_http_url("Link URL", &link.url)?;
            check_max_len("Link URL", &link.url, LINK_URL_MAX_LEN)?;
        }

        fields.body.validate()?;
        if check_body_refs {
            self.images.ensure_all_exist("body", &fields.body.image_ids()).await?;

            let page_ids = fields.body.page_ids();
            if !page_ids.is_empty() {
                let existing = self
                    .repo
                    .existing_ids(&page_ids)
                    .await
                    .context("Failed to check referenced pages")?;
                if let Some(missing) = page_ids.iter().find(|id| !existing.contains(id)) {
                    return Err(ServiceError::Validation(format!(
                        "body refers to missing page {}",
                        missing
                    )));
                }
            }
        }

        if self
            .repo
            .slug_exists(&fields.slug, exclude_id)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(ServiceError::Conflict(format!(
                "Slug '{}' is already in use",
                fields.slug
            )));
        }

        Ok(())
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Logue page with ID {} not found", id))
}

/// Text indexed for search: the intro followed by the body's plain text
fn search_text(intro: &str, body: &StreamBody) -> String {
    let intro = strip_html(intro);
    let body = body.plain_text();
    match (intro.is_empty(), body.is_empty()) {
        (false, false) => format!("{} {}", intro, body),
        (false, true) => intro,
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{
        SqlxAuthorRepository, SqlxCategoryRepository, SqlxImageRepository,
        SqlxIndexPageRepository, SqlxLoguePageRepository, SqlxTagRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{
        AuthorInput, CategoryInput, CreateImageInput, ListParams, LogueIndexPage,
        RawStreamChild, Visibility,
    };
    use chrono::NaiveDate;
    use serde_json::json;

    struct Fixture {
        service: LoguePageService,
        images: Arc<ImageService>,
        tags: Arc<TagService>,
        categories: Arc<CategoryService>,
        authors: Vec<i64>,
        index: LogueIndexPage,
        image_ids: Vec<i64>,
    }

    async fn fixture() -> Fixture {
        fixture_with(|repo| repo).await
    }

    /// Build the fixture with the page repository wrapped by `wrap`
    async fn fixture_with(
        wrap: impl FnOnce(Arc<dyn LoguePageRepository>) -> Arc<dyn LoguePageRepository>,
    ) -> Fixture {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let image_repo = SqlxImageRepository::boxed(pool.clone());
        let images = Arc::new(ImageService::new(image_repo.clone(), cache.clone()));
        let authors = Arc::new(AuthorService::new(
            SqlxAuthorRepository::boxed(pool.clone()),
            image_repo.clone(),
            cache.clone(),
        ));
        let categories = Arc::new(CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            image_repo,
            cache.clone(),
        ));
        let tags = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let indexes = SqlxIndexPageRepository::boxed(pool.clone());

        let index = indexes
            .create_index(&LogueIndexPage::new(
                "logue".to_string(),
                "Logue".to_string(),
                String::new(),
            ))
            .await
            .unwrap();

        let mut author_ids = Vec::new();
        for n in 0..7 {
            let author = authors
                .create(AuthorInput {
                    name: format!("Author {}", n),
                    website: None,
                    image_id: None,
                })
                .await
                .unwrap();
            author_ids.push(author.id);
        }

        let mut image_ids = Vec::new();
        for name in ["one", "two"] {
            let image = images
                .register(CreateImageInput {
                    title: name.to_string(),
                    url: format!("/media/{}.jpg", name),
                    width: None,
                    height: None,
                })
                .await
                .unwrap();
            image_ids.push(image.id);
        }

        let service = LoguePageService::new(
            wrap(SqlxLoguePageRepository::boxed(pool)),
            indexes,
            authors,
            categories.clone(),
            images.clone(),
            tags.clone(),
            BodyRenderer::new("base16-ocean.dark").unwrap(),
            cache,
        );

        Fixture {
            service,
            images,
            tags,
            categories,
            authors: author_ids,
            index,
            image_ids,
        }
    }

    /// Page repository that reports every slug as free, as a writer that
    /// raced past the availability check would see it
    struct StaleSlugCheck(Arc<dyn LoguePageRepository>);

    #[async_trait::async_trait]
    impl LoguePageRepository for StaleSlugCheck {
        async fn create(&self, fields: &LoguePageFields, live: bool) -> anyhow::Result<LoguePage> {
            self.0.create(fields, live).await
        }

        async fn update(
            &self,
            id: i64,
            fields: &LoguePageFields,
        ) -> anyhow::Result<Option<LoguePage>> {
            self.0.update(id, fields).await
        }

        async fn delete(&self, id: i64) -> anyhow::Result<bool> {
            self.0.delete(id).await
        }

        async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<LoguePage>> {
            self.0.get_by_id(id).await
        }

        async fn get_by_slug(&self, slug: &str) -> anyhow::Result<Option<LoguePage>> {
            self.0.get_by_slug(slug).await
        }

        async fn slug_exists(&self, _slug: &str, _exclude_id: Option<i64>) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn existing_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<i64>> {
            self.0.existing_ids(ids).await
        }

        async fn list(&self, index_page_id: Option<i64>) -> anyhow::Result<Vec<LoguePage>> {
            self.0.list(index_page_id).await
        }

        async fn count_live_children(&self, index_page_id: i64) -> anyhow::Result<i64> {
            self.0.count_live_children(index_page_id).await
        }

        async fn list_live_children(
            &self,
            index_page_id: i64,
            params: &ListParams,
        ) -> anyhow::Result<Vec<LoguePage>> {
            self.0.list_live_children(index_page_id, params).await
        }

        async fn list_by_tag_name(&self, tag_name: &str) -> anyhow::Result<Vec<LoguePage>> {
            self.0.list_by_tag_name(tag_name).await
        }

        async fn search(&self, params: &SearchParams) -> anyhow::Result<Vec<LoguePage>> {
            self.0.search(params).await
        }

        async fn set_published(
            &self,
            id: i64,
            at: chrono::DateTime<Utc>,
        ) -> anyhow::Result<Option<LoguePage>> {
            self.0.set_published(id, at).await
        }

        async fn set_unpublished(&self, id: i64) -> anyhow::Result<Option<LoguePage>> {
            self.0.set_unpublished(id).await
        }
    }

    fn input(f: &Fixture, slug: &str) -> CreateLoguePageInput {
        CreateLoguePageInput {
            index_page_id: f.index.id,
            slug: slug.to_string(),
            title: format!("Title {}", slug),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            header_image_id: None,
            feed_image_id: None,
            intro: "A short intro".to_string(),
            body: Vec::new(),
            author_ids: vec![f.authors[0]],
            tags: Vec::new(),
            category_ids: Vec::new(),
            gallery_images: Vec::new(),
            related_links: Vec::new(),
            visibility: Visibility::Public,
            live: true,
        }
    }

    fn child(block_type: &str, value: serde_json::Value) -> RawStreamChild {
        RawStreamChild {
            block_type: block_type.to_string(),
            value,
            id: None,
        }
    }

    fn assert_validation<T: std::fmt::Debug>(result: ServiceResult<T>) {
        assert!(
            matches!(result, Err(ServiceError::Validation(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_create_page() {
        let f = fixture().await;
        let mut page_input = input(&f, "hello");
        page_input.tags = vec!["news".to_string(), "news".to_string(), "howto".to_string()];
        page_input.gallery_images = vec![
            GalleryImageInput {
                image_id: f.image_ids[1],
                caption: "Second first".to_string(),
            },
            GalleryImageInput {
                image_id: f.image_ids[0],
                caption: String::new(),
            },
        ];

        let page = f.service.create(page_input).await.unwrap();
        assert!(page.live);
        assert!(page.first_published_at.is_some());
        assert_eq!(page.tags.len(), 2);
        assert_eq!(
            f.service.main_image(page.id).await.unwrap().map(|i| i.id),
            Some(f.image_ids[1])
        );
    }

    #[tokio::test]
    async fn test_author_count_bounds() {
        let f = fixture().await;

        let mut none = input(&f, "none");
        none.author_ids = Vec::new();
        assert_validation(f.service.create(none).await);

        let mut seven = input(&f, "seven");
        seven.author_ids = f.authors.clone();
        assert_validation(f.service.create(seven).await);

        let mut six = input(&f, "six");
        six.author_ids = f.authors[..6].to_vec();
        let page = f.service.create(six).await.unwrap();
        let ids: Vec<i64> = page.authors.iter().map(|a| a.id).collect();
        assert_eq!(ids, f.authors[..6].to_vec());
    }

    #[tokio::test]
    async fn test_field_validation() {
        let f = fixture().await;

        let mut long_intro = input(&f, "intro");
        long_intro.intro = "i".repeat(INTRO_MAX_LEN + 1);
        assert_validation(f.service.create(long_intro).await);

        let mut empty_intro = input(&f, "intro");
        empty_intro.intro = "  ".to_string();
        assert_validation(f.service.create(empty_intro).await);

        let mut caption = input(&f, "caption");
        caption.gallery_images = vec![GalleryImageInput {
            image_id: f.image_ids[0],
            caption: "c".repeat(CAPTION_MAX_LEN + 1),
        }];
        assert_validation(f.service.create(caption).await);

        let mut link = input(&f, "link");
        link.related_links = vec![RelatedLinkInput {
            name: "Docs".to_string(),
            url: "docs.example.com".to_string(),
        }];
        assert_validation(f.service.create(link).await);

        let mut header = input(&f, "header");
        header.header_image_id = Some(9999);
        assert_validation(f.service.create(header).await);

        let mut category = input(&f, "category");
        category.category_ids = vec![9999];
        assert_validation(f.service.create(category).await);

        let mut parent = input(&f, "parent");
        parent.index_page_id = 9999;
        assert_validation(f.service.create(parent).await);
    }

    #[tokio::test]
    async fn test_body_validation() {
        let f = fixture().await;

        let mut unknown = input(&f, "unknown");
        unknown.body = vec![child("video", json!("x"))];
        assert_validation(f.service.create(unknown).await);

        let mut missing_image = input(&f, "missing-image");
        missing_image.body = vec![child("image", json!(4242))];
        assert_validation(f.service.create(missing_image).await);

        let mut missing_page = input(&f, "missing-page");
        missing_page.body = vec![child("related_content", json!(4242))];
        assert_validation(f.service.create(missing_page).await);

        let mut code = input(&f, "code");
        code.body = vec![child("code_block", json!({"title": "", "code": "x"}))];
        assert_validation(f.service.create(code).await);
    }

    #[tokio::test]
    async fn test_slug_conflict() {
        let f = fixture().await;
        f.service.create(input(&f, "taken")).await.unwrap();
        assert!(matches!(
            f.service.create(input(&f, "taken")).await,
            Err(ServiceError::Conflict(_))
        ));

        let other = f.service.create(input(&f, "other")).await.unwrap();
        let rename = UpdateLoguePageInput {
            slug: Some("taken".to_string()),
            ..UpdateLoguePageInput::default()
        };
        assert!(matches!(
            f.service.update(other.id, rename).await,
            Err(ServiceError::Conflict(_))
        ));

        // Keeping its own slug is not a conflict
        let same = UpdateLoguePageInput {
            slug: Some("other".to_string()),
            ..UpdateLoguePageInput::default()
        };
        assert!(f.service.update(other.id, same).await.is_ok());
    }

    #[tokio::test]
    async fn test_slug_race_is_conflict_and_drops_new_tags() {
        let f = fixture_with(|repo| Arc::new(StaleSlugCheck(repo)) as Arc<dyn LoguePageRepository>)
            .await;
        let mut first = input(&f, "taken");
        first.tags = vec!["kept".to_string()];
        f.service.create(first).await.unwrap();

        let mut second = input(&f, "taken");
        second.tags = vec!["kept".to_string(), "fresh".to_string()];
        assert!(matches!(
            f.service.create(second).await,
            Err(ServiceError::Conflict(_))
        ));

        let other = f.service.create(input(&f, "other")).await.unwrap();
        let rename = UpdateLoguePageInput {
            slug: Some("taken".to_string()),
            tags: Some(vec!["fresh".to_string()]),
            ..UpdateLoguePageInput::default()
        };
        assert!(matches!(
            f.service.update(other.id, rename).await,
            Err(ServiceError::Conflict(_))
        ));

        let names: Vec<String> = f.tags.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["kept".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_children() {
        let f = fixture().await;
        let category = f
            .categories
            .create(CategoryInput {
                name: "Systems".to_string(),
                icon_id: None,
            })
            .await
            .unwrap();

        let mut create = input(&f, "keep");
        create.author_ids = vec![f.authors[1], f.authors[0]];
        create.tags = vec!["rust".to_string()];
        create.category_ids = vec![category.id];
        create.header_image_id = Some(f.image_ids[0]);
        create.related_links = vec![RelatedLinkInput {
            name: "Docs".to_string(),
            url: "https://docs.example.com".to_string(),
        }];
        let page = f.service.create(create).await.unwrap();

        let updated = f
            .service
            .update(
                page.id,
                UpdateLoguePageInput {
                    title: Some("Renamed".to_string()),
                    header_image_id: Some(None),
                    ..UpdateLoguePageInput::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.header_image_id, None);
        let authors: Vec<i64> = updated.authors.iter().map(|a| a.id).collect();
        assert_eq!(authors, vec![f.authors[1], f.authors[0]]);
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.categories.len(), 1);
        assert_eq!(updated.related_links.len(), 1);

        let replaced = f
            .service
            .update(
                page.id,
                UpdateLoguePageInput {
                    author_ids: Some(vec![f.authors[2]]),
                    tags: Some(Vec::new()),
                    ..UpdateLoguePageInput::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.authors.len(), 1);
        assert!(replaced.tags.is_empty());
    }

    #[tokio::test]
    async fn test_publish_workflow() {
        let f = fixture().await;
        let mut draft = input(&f, "draft");
        draft.live = false;
        let page = f.service.create(draft).await.unwrap();
        assert!(page.first_published_at.is_none());
        assert!(matches!(
            f.service.get_public("logue", "draft").await,
            Err(ServiceError::NotFound(_))
        ));

        let published = f.service.publish(page.id).await.unwrap();
        let first = published.first_published_at;
        assert!(first.is_some());
        assert!(f.service.get_public("logue", "draft").await.is_ok());

        f.service.unpublish(page.id).await.unwrap();
        assert!(f.service.get_public("logue", "draft").await.is_err());

        let again = f.service.publish(page.id).await.unwrap();
        assert_eq!(again.first_published_at, first);
        assert!(again.last_published_at >= first);

        assert!(matches!(
            f.service.publish(9999).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_public_checks_visibility_and_parent() {
        let f = fixture().await;
        let mut private = input(&f, "private");
        private.visibility = Visibility::Private;
        f.service.create(private).await.unwrap();
        f.service.create(input(&f, "public")).await.unwrap();

        assert!(f.service.get_public("logue", "private").await.is_err());
        assert!(f.service.get_public("other-index", "public").await.is_err());

        let view = f.service.get_public("logue", "public").await.unwrap();
        assert_eq!(view.url, "/logue/logue/public");
        assert_eq!(view.body_html, "");
    }

    #[tokio::test]
    async fn test_rendered_body_resolves_references() {
        let f = fixture().await;
        let target = f.service.create(input(&f, "target")).await.unwrap();
        let mut hidden = input(&f, "hidden");
        hidden.live = false;
        let hidden = f.service.create(hidden).await.unwrap();

        let mut page = input(&f, "with-body");
        page.body = vec![
            child("richtext_section", json!("<p>Hello</p>")),
            child("image", json!(f.image_ids[0])),
            child("related_content", json!(target.id)),
            child("related_content", json!(hidden.id)),
            child(
                "code_block",
                json!({"title": "main.rs", "code": "fn main() {}", "caption": null}),
            ),
        ];
        f.service.create(page).await.unwrap();

        let view = f.service.get_public("logue", "with-body").await.unwrap();
        assert!(view.body_html.contains("<p>Hello</p>"));
        assert!(view.body_html.contains("/media/one.jpg"));
        assert!(view.body_html.contains("href=\"/logue/logue/target\""));
        assert!(!view.body_html.contains("/logue/logue/hidden"));
        assert!(view.body_html.contains("block-code"));
        assert_eq!(view.page.body.len(), 5);
    }

    #[tokio::test]
    async fn test_deleting_image_nulls_references() {
        let f = fixture().await;
        let mut create = input(&f, "imagery");
        create.header_image_id = Some(f.image_ids[0]);
        create.feed_image_id = Some(f.image_ids[0]);
        create.gallery_images = vec![
            GalleryImageInput {
                image_id: f.image_ids[0],
                caption: "gone".to_string(),
            },
            GalleryImageInput {
                image_id: f.image_ids[1],
                caption: "kept".to_string(),
            },
        ];
        let page = f.service.create(create).await.unwrap();

        f.images.delete(f.image_ids[0]).await.unwrap();

        let page = f.service.get_by_id(page.id).await.unwrap();
        assert_eq!(page.header_image_id, None);
        assert_eq!(page.feed_image_id, None);
        assert_eq!(page.gallery_images.len(), 1);
        assert_eq!(page.gallery_images[0].caption, "kept");
        assert_eq!(page.main_image().map(|i| i.id), Some(f.image_ids[1]));
    }

    #[tokio::test]
    async fn test_search() {
        let f = fixture().await;
        let mut rust = input(&f, "rust-notes");
        rust.title = "Rust notes".to_string();
        rust.body = vec![child("richtext_section", json!("<p>Borrow checker</p>"))];
        f.service.create(rust).await.unwrap();

        let mut old = input(&f, "old");
        old.date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        old.intro = "Ancient borrow history".to_string();
        f.service.create(old).await.unwrap();

        let mut draft = input(&f, "draft-borrow");
        draft.intro = "borrow draft".to_string();
        draft.live = false;
        f.service.create(draft).await.unwrap();

        let search = |q: &str, from: Option<NaiveDate>| SearchParams {
            q: q.to_string(),
            date_from: from,
            date_to: None,
        };

        let found = f.service.search(&search("BORROW", None)).await.unwrap();
        let slugs: Vec<&str> = found.iter().map(|i| i.page.slug.as_str()).collect();
        assert_eq!(slugs, vec!["rust-notes", "old"]);

        let recent = f
            .service
            .search(&search("borrow", NaiveDate::from_ymd_opt(2023, 1, 1)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        assert!(f.service.search(&search("  ", None)).await.unwrap().is_empty());
        assert!(f.service.search(&search("100%", None)).await.unwrap().is_empty());

        let inverted = SearchParams {
            q: String::new(),
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2023, 1, 1),
        };
        assert_validation(f.service.search(&inverted).await);
    }

    #[tokio::test]
    async fn test_delete_page() {
        let f = fixture().await;
        let page = f.service.create(input(&f, "bye")).await.unwrap();

        f.service.delete(page.id).await.unwrap();
        assert!(matches!(
            f.service.get_by_id(page.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(page.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(f.service.list(Some(f.index.id)).await.unwrap().is_empty());
    }

    #[test]
    fn test_search_text() {
        let body = StreamBody::default();
        assert_eq!(search_text("Intro", &body), "Intro");
        assert_eq!(search_text("", &body), "");
    }
}
