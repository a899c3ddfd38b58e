//! Logue page repository
//!
//! Database operations for Logue pages and their child collections.
//!
//! A page is written in a single transaction together with its ordered
//! authors, gallery images and related links and its tag and category sets.
//! Reads hydrate the same collections back, preserving submitted order.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{
    GalleryImage, Image, ListParams, LogueAuthor, LogueCategory, LoguePage, LoguePageFields,
    RelatedLink, SearchParams, StreamBody, Tag,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

const PAGE_COLUMNS: &str = "p.id, p.index_page_id, p.slug, p.title, p.date, p.header_image_id, \
     p.feed_image_id, p.intro, p.body, p.live, p.visibility, p.first_published_at, \
     p.last_published_at, p.created_at, p.updated_at";

/// Logue page repository trait
#[async_trait]
pub trait LoguePageRepository: Send + Sync {
    /// Insert a page with all its children. A live page is stamped as
    /// published at creation time.
    async fn create(&self, fields: &LoguePageFields, live: bool) -> Result<LoguePage>;

    /// Replace the fields and children of an existing page.
    /// The parent index page is never changed.
    async fn update(&self, id: i64, fields: &LoguePageFields) -> Result<Option<LoguePage>>;

    /// Delete a page. Children are removed by cascade.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn get_by_id(&self, id: i64) -> Result<Option<LoguePage>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<LoguePage>>;

    /// Whether another page already uses `slug`
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Subset of `ids` that name existing pages
    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    /// All pages, optionally restricted to one index page, newest first
    async fn list(&self, index_page_id: Option<i64>) -> Result<Vec<LoguePage>>;

    /// Number of live, public children of an index page
    async fn count_live_children(&self, index_page_id: i64) -> Result<i64>;

    /// One page of live, public children, most recently first-published first
    async fn list_live_children(
        &self,
        index_page_id: i64,
        params: &ListParams,
    ) -> Result<Vec<LoguePage>>;

    /// Every page tagged with exactly `tag_name`, live or not, ordered by ID
    async fn list_by_tag_name(&self, tag_name: &str) -> Result<Vec<LoguePage>>;

    /// Live, public pages matching the search filters, newest post date first
    async fn search(&self, params: &SearchParams) -> Result<Vec<LoguePage>>;

    /// Mark live. `first_published_at` is only set if still empty.
    async fn set_published(&self, id: i64, at: DateTime<Utc>) -> Result<Option<LoguePage>>;

    async fn set_unpublished(&self, id: i64) -> Result<Option<LoguePage>>;
}

#[derive(sqlx::FromRow)]
struct LoguePageRow {
    id: i64,
    index_page_id: i64,
    slug: String,
    title: String,
    date: NaiveDate,
    header_image_id: Option<i64>,
    feed_image_id: Option<i64>,
    intro: String,
    body: Option<String>,
    live: bool,
    visibility: String,
    first_published_at: Option<DateTime<Utc>>,
    last_published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GalleryRow {
    id: i64,
    caption: String,
    image_id: i64,
    image_title: String,
    image_url: String,
    image_width: Option<i32>,
    image_height: Option<i32>,
    image_created_at: DateTime<Utc>,
}

impl From<GalleryRow> for GalleryImage {
    fn from(row: GalleryRow) -> Self {
        Self {
            id: row.id,
            caption: row.caption,
            image: Image {
                id: row.image_id,
                title: row.image_title,
                url: row.image_url,
                width: row.image_width,
                height: row.image_height,
                created_at: row.image_created_at,
            },
        }
    }
}

/// Escape LIKE wildcards with `!`
fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_");
    format!("%{}%", escaped)
}

fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Rewrite every child collection of page `$id` inside transaction `$tx`.
macro_rules! replace_children {
    ($tx:ident, $id:expr, $fields:expr) => {{
        let id: i64 = $id;
        let fields: &LoguePageFields = $fields;

        for table in [
            "logue_page_authors",
            "logue_page_gallery_images",
            "logue_page_related_links",
            "logue_page_tags",
            "logue_page_categories",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE page_id = ?", table))
                .bind(id)
                .execute(&mut *$tx)
                .await
                .with_context(|| format!("Failed to clear {}", table))?;
        }

        for (order, author_id) in fields.author_ids.iter().enumerate() {
            sqlx::query("INSERT INTO logue_page_authors (page_id, author_id, sort_order) VALUES (?, ?, ?)")
                .bind(id)
                .bind(*author_id)
                .bind(order as i32)
                .execute(&mut *$tx)
                .await
                .context("Failed to add page author")?;
        }

        for (order, item) in fields.gallery_images.iter().enumerate() {
            sqlx::query("INSERT INTO logue_page_gallery_images (page_id, image_id, caption, sort_order) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(item.image_id)
                .bind(&item.caption)
                .bind(order as i32)
                .execute(&mut *$tx)
                .await
                .context("Failed to add gallery image")?;
        }

        for (order, link) in fields.related_links.iter().enumerate() {
            sqlx::query("INSERT INTO logue_page_related_links (page_id, name, url, sort_order) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(&link.name)
                .bind(&link.url)
                .bind(order as i32)
                .execute(&mut *$tx)
                .await
                .context("Failed to add related link")?;
        }

        for tag_id in dedup(&fields.tag_ids) {
            sqlx::query("INSERT INTO logue_page_tags (page_id, tag_id) VALUES (?, ?)")
                .bind(id)
                .bind(tag_id)
                .execute(&mut *$tx)
                .await
                .context("Failed to tag page")?;
        }

        for category_id in dedup(&fields.category_ids) {
            sqlx::query("INSERT INTO logue_page_categories (page_id, category_id) VALUES (?, ?)")
                .bind(id)
                .bind(category_id)
                .execute(&mut *$tx)
                .await
                .context("Failed to categorise page")?;
        }
    }};
}

/// SQLx-based Logue page repository implementation
pub struct SqlxLoguePageRepository {
    pool: DynDatabasePool,
}

impl SqlxLoguePageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LoguePageRepository> {
        Arc::new(Self::new(pool))
    }

    async fn hydrate(&self, row: LoguePageRow) -> Result<LoguePage> {
        let id = row.id;

        let authors = with_pool!(self.pool, p => sqlx::query_as::<_, LogueAuthor>(
            r#"
            SELECT a.id, a.name, a.website, a.image_id, a.created_at
            FROM logue_page_authors pa
            JOIN logue_authors a ON a.id = pa.author_id
            WHERE pa.page_id = ?
            ORDER BY pa.sort_order, pa.id
            "#,
        )
        .bind(id)
        .fetch_all(p)
        .await
        .context("Failed to load page authors")?);

        let tags = with_pool!(self.pool, p => sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM logue_page_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.page_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(id)
        .fetch_all(p)
        .await
        .context("Failed to load page tags")?);

        let categories = with_pool!(self.pool, p => sqlx::query_as::<_, LogueCategory>(
            r#"
            SELECT c.id, c.name, c.icon_id, c.created_at
            FROM logue_page_categories pc
            JOIN logue_categories c ON c.id = pc.category_id
            WHERE pc.page_id = ?
            ORDER BY c.name
            "#,
        )
        .bind(id)
        .fetch_all(p)
        .await
        .context("Failed to load page categories")?);

        let gallery = with_pool!(self.pool, p => sqlx::query_as::<_, GalleryRow>(
            r#"
            SELECT g.id, g.caption, i.id AS image_id, i.title AS image_title, i.url AS image_url,
                   i.width AS image_width, i.height AS image_height, i.created_at AS image_created_at
            FROM logue_page_gallery_images g
            JOIN images i ON i.id = g.image_id
            WHERE g.page_id = ?
            ORDER BY g.sort_order, g.id
            "#,
        )
        .bind(id)
        .fetch_all(p)
        .await
        .context("Failed to load gallery images")?);

        let related_links = with_pool!(self.pool, p => sqlx::query_as::<_, RelatedLink>(
            "SELECT id, name, url FROM logue_page_related_links WHERE page_id = ? ORDER BY sort_order, id",
        )
        .bind(id)
        .fetch_all(p)
        .await
        .context("Failed to load related links")?);

        Ok(LoguePage {
            id,
            index_page_id: row.index_page_id,
            slug: row.slug,
            title: row.title,
            date: row.date,
            header_image_id: row.header_image_id,
            feed_image_id: row.feed_image_id,
            intro: row.intro,
            body: StreamBody::from_stored(row.body.as_deref()),
            live: row.live,
            visibility: row.visibility.parse()?,
            first_published_at: row.first_published_at,
            last_published_at: row.last_published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            authors,
            tags,
            categories,
            gallery_images: gallery.into_iter().map(GalleryImage::from).collect(),
            related_links,
        })
    }

    async fn hydrate_all(&self, rows: Vec<LoguePageRow>) -> Result<Vec<LoguePage>> {
        let mut pages = Vec::with_capacity(rows.len());
        for row in rows {
            pages.push(self.hydrate(row).await?);
        }
        Ok(pages)
    }

    async fn get_where(&self, condition: &str, value: &str) -> Result<Option<LoguePage>> {
        let sql = format!("SELECT {} FROM logue_pages p WHERE {}", PAGE_COLUMNS, condition);
        let row = with_pool!(self.pool, p => sqlx::query_as::<_, LoguePageRow>(&sql)
            .bind(value)
            .fetch_optional(p)
            .await
            .context("Failed to get Logue page")?);

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LoguePageRepository for SqlxLoguePageRepository {
    async fn create(&self, fields: &LoguePageFields, live: bool) -> Result<LoguePage> {
        let now = Utc::now();
        let published_at = live.then_some(now);
        let body = fields.body.to_stored().context("Failed to encode page body")?;
        let sql = r#"
            INSERT INTO logue_pages (
                index_page_id, slug, title, date, header_image_id, feed_image_id, intro, body,
                search_text, live, visibility, first_published_at, last_published_at,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let id = with_pool!(self.pool, p => {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            let id = sqlx::query(sql)
                .bind(fields.index_page_id)
                .bind(&fields.slug)
                .bind(&fields.title)
                .bind(fields.date)
                .bind(fields.header_image_id)
                .bind(fields.feed_image_id)
                .bind(&fields.intro)
                .bind(&body)
                .bind(&fields.search_text)
                .bind(live)
                .bind(fields.visibility.as_str())
                .bind(published_at)
                .bind(published_at)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to create Logue page")?
                .insert_id();
            replace_children!(tx, id, fields);
            tx.commit().await.context("Failed to commit Logue page")?;
            id
        });

        self.get_by_id(id)
            .await?
            .context("Logue page vanished after insert")
    }

    async fn update(&self, id: i64, fields: &LoguePageFields) -> Result<Option<LoguePage>> {
        let now = Utc::now();
        let body = fields.body.to_stored().context("Failed to encode page body")?;
        let sql = r#"
            UPDATE logue_pages
            SET slug = ?, title = ?, date = ?, header_image_id = ?, feed_image_id = ?, intro = ?,
                body = ?, search_text = ?, visibility = ?, updated_at = ?
            WHERE id = ?
        "#;

        let affected = with_pool!(self.pool, p => {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            let affected = sqlx::query(sql)
                .bind(&fields.slug)
                .bind(&fields.title)
                .bind(fields.date)
                .bind(fields.header_image_id)
                .bind(fields.feed_image_id)
                .bind(&fields.intro)
                .bind(&body)
                .bind(&fields.search_text)
                .bind(fields.visibility.as_str())
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to update Logue page")?
                .rows_affected();
            if affected > 0 {
                replace_children!(tx, id, fields);
            }
            tx.commit().await.context("Failed to commit Logue page")?;
            affected
        });

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, p => sqlx::query("DELETE FROM logue_pages WHERE id = ?")
            .bind(id)
            .execute(p)
            .await
            .context("Failed to delete Logue page")?
            .rows_affected());
        Ok(affected > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<LoguePage>> {
        let sql = format!("SELECT {} FROM logue_pages p WHERE p.id = ?", PAGE_COLUMNS);
        let row = with_pool!(self.pool, p => sqlx::query_as::<_, LoguePageRow>(&sql)
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get Logue page by ID")?);

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<LoguePage>> {
        self.get_where("p.slug = ?", slug).await
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count = with_pool!(self.pool, p => sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM logue_pages WHERE slug = ? AND id <> ?",
        )
        .bind(slug)
        .bind(exclude_id.unwrap_or(0))
        .fetch_one(p)
        .await
        .context("Failed to check slug")?);
        Ok(count > 0)
    }

    async fn existing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        let ids = dedup(ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id FROM logue_pages WHERE id IN ({}) ORDER BY id", placeholders);

        with_pool!(self.pool, p => {
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for id in &ids {
                query = query.bind(*id);
            }
            query.fetch_all(p).await.context("Failed to check page IDs")
        })
    }

    async fn list(&self, index_page_id: Option<i64>) -> Result<Vec<LoguePage>> {
        let sql = match index_page_id {
            Some(_) => format!(
                "SELECT {} FROM logue_pages p WHERE p.index_page_id = ? ORDER BY p.date DESC, p.id DESC",
                PAGE_COLUMNS
            ),
            None => format!(
                "SELECT {} FROM logue_pages p ORDER BY p.date DESC, p.id DESC",
                PAGE_COLUMNS
            ),
        };

        let rows = with_pool!(self.pool, p => {
            let mut query = sqlx::query_as::<_, LoguePageRow>(&sql);
            if let Some(index_page_id) = index_page_id {
                query = query.bind(index_page_id);
            }
            query.fetch_all(p).await.context("Failed to list Logue pages")?
        });

        self.hydrate_all(rows).await
    }

    async fn count_live_children(&self, index_page_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) FROM logue_pages WHERE index_page_id = ? AND live = ? AND visibility = 'public'";
        with_pool!(self.pool, p => sqlx::query_scalar::<_, i64>(sql)
            .bind(index_page_id)
            .bind(true)
            .fetch_one(p)
            .await
            .context("Failed to count Logue pages"))
    }

    async fn list_live_children(
        &self,
        index_page_id: i64,
        params: &ListParams,
    ) -> Result<Vec<LoguePage>> {
        let sql = format!(
            r#"
            SELECT {} FROM logue_pages p
            WHERE p.index_page_id = ? AND p.live = ? AND p.visibility = 'public'
            ORDER BY p.first_published_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#,
            PAGE_COLUMNS
        );

        let rows = with_pool!(self.pool, p => sqlx::query_as::<_, LoguePageRow>(&sql)
            .bind(index_page_id)
            .bind(true)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(p)
            .await
            .context("Failed to list Logue pages")?);

        self.hydrate_all(rows).await
    }

    async fn list_by_tag_name(&self, tag_name: &str) -> Result<Vec<LoguePage>> {
        // (page_id, tag_id) is the primary key and names are unique: one row per page
        let sql = format!(
            r#"
            SELECT {} FROM logue_pages p
            JOIN logue_page_tags pt ON pt.page_id = p.id
            JOIN tags t ON t.id = pt.tag_id
            WHERE t.name = ?
            ORDER BY p.id
            "#,
            PAGE_COLUMNS
        );

        let rows = with_pool!(self.pool, p => sqlx::query_as::<_, LoguePageRow>(&sql)
            .bind(tag_name)
            .fetch_all(p)
            .await
            .context("Failed to filter Logue pages by tag")?);

        self.hydrate_all(rows).await
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<LoguePage>> {
        let query = params.q.trim();
        let pattern = (!query.is_empty()).then(|| like_pattern(query));

        let mut sql = format!(
            "SELECT {} FROM logue_pages p WHERE p.live = ? AND p.visibility = 'public'",
            PAGE_COLUMNS
        );
        if pattern.is_some() {
            sql.push_str(
                " AND (LOWER(p.title) LIKE ? ESCAPE '!' OR LOWER(p.intro) LIKE ? ESCAPE '!' \
                 OR LOWER(p.search_text) LIKE ? ESCAPE '!')",
            );
        }
        if params.date_from.is_some() {
            sql.push_str(" AND p.date >= ?");
        }
        if params.date_to.is_some() {
            sql.push_str(" AND p.date <= ?");
        }
        sql.push_str(" ORDER BY p.date DESC, p.id DESC");

        let rows = with_pool!(self.pool, p => {
            let mut q = sqlx::query_as::<_, LoguePageRow>(&sql).bind(true);
            if let Some(pattern) = &pattern {
                q = q.bind(pattern.as_str()).bind(pattern.as_str()).bind(pattern.as_str());
            }
            if let Some(from) = params.date_from {
                q = q.bind(from);
            }
            if let Some(to) = params.date_to {
                q = q.bind(to);
            }
            q.fetch_all(p).await.context("Failed to search Logue pages")?
        });

        self.hydrate_all(rows).await
    }

    async fn set_published(&self, id: i64, at: DateTime<Utc>) -> Result<Option<LoguePage>> {
        let sql = r#"
            UPDATE logue_pages
            SET live = ?, first_published_at = COALESCE(first_published_at, ?),
                last_published_at = ?, updated_at = ?
            WHERE id = ?
        "#;

        let affected = with_pool!(self.pool, p => sqlx::query(sql)
            .bind(true)
            .bind(at)
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(p)
            .await
            .context("Failed to publish Logue page")?
            .rows_affected());

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn set_unpublished(&self, id: i64) -> Result<Option<LoguePage>> {
        let affected = with_pool!(self.pool, p => sqlx::query(
            "UPDATE logue_pages SET live = ?, updated_at = ? WHERE id = ?",
        )
        .bind(false)
        .bind(Utc::now())
        .bind(id)
        .execute(p)
        .await
        .context("Failed to unpublish Logue page")?
        .rows_affected());

        if affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}
