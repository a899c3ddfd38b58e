//! Logue page model
//!
//! A `LoguePage` is a single post under a `LogueIndexPage`. Besides its own
//! fields it owns three ordered child collections (authors, gallery images,
//! related links) and two sets (tags, categories).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::blocks::{RawStreamChild, StreamBody};
use super::{Image, LogueAuthor, LogueCategory, Tag};

/// A page needs at least this many authors
pub const MIN_AUTHORS: usize = 1;
/// A page can have at most this many authors
pub const MAX_AUTHORS: usize = 6;
/// Maximum length of a page intro
pub const INTRO_MAX_LEN: usize = 250;
/// Maximum length of a gallery caption
pub const CAPTION_MAX_LEN: usize = 250;
/// Maximum length of a related link name
pub const LINK_NAME_MAX_LEN: usize = 255;

/// Page visibility
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

/// Gallery entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryImage {
    pub id: i64,
    pub image: Image,
    pub caption: String,
}

/// Related link entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct RelatedLink {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Logue post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoguePage {
    pub id: i64,
    /// Parent `LogueIndexPage`
    pub index_page_id: i64,
    pub slug: String,
    pub title: String,
    /// Post date
    pub date: NaiveDate,
    pub header_image_id: Option<i64>,
    /// Image used in feeds
    pub feed_image_id: Option<i64>,
    pub intro: String,
    pub body: StreamBody,
    pub live: bool,
    pub visibility: Visibility,
    /// Set on first publish and never changed afterwards
    pub first_published_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered
    pub authors: Vec<LogueAuthor>,
    /// Ordered by name
    pub tags: Vec<Tag>,
    /// Ordered by name
    pub categories: Vec<LogueCategory>,
    /// Ordered
    pub gallery_images: Vec<GalleryImage>,
    /// Ordered
    pub related_links: Vec<RelatedLink>,
}

impl LoguePage {
    /// Image of the first gallery entry, if any.
    pub fn main_image(&self) -> Option<&Image> {
        self.gallery_images.first().map(|item| &item.image)
    }

    /// Whether anonymous readers can see this page
    pub fn is_public(&self) -> bool {
        self.live && self.visibility == Visibility::Public
    }
}

/// A page as shown in listings and search results, with its main image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoguePageItem {
    #[serde(flatten)]
    pub page: LoguePage,
    pub main_image: Option<Image>,
}

impl From<LoguePage> for LoguePageItem {
    fn from(page: LoguePage) -> Self {
        let main_image = page.main_image().cloned();
        Self { page, main_image }
    }
}

/// Gallery entry as submitted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryImageInput {
    pub image_id: i64,
    #[serde(default)]
    pub caption: String,
}

/// Related link as submitted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelatedLinkInput {
    pub name: String,
    pub url: String,
}

/// Input for creating a Logue page
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLoguePageInput {
    pub index_page_id: i64,
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub header_image_id: Option<i64>,
    #[serde(default)]
    pub feed_image_id: Option<i64>,
    pub intro: String,
    #[serde(default)]
    pub body: Vec<RawStreamChild>,
    pub author_ids: Vec<i64>,
    /// Tag names; missing tags are created
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(default)]
    pub gallery_images: Vec<GalleryImageInput>,
    #[serde(default)]
    pub related_links: Vec<RelatedLinkInput>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Publish immediately
    #[serde(default)]
    pub live: bool,
}

/// Input for updating a Logue page. Absent fields are kept; collections
/// that are present replace the stored ones entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLoguePageInput {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    /// `null` clears the image
    #[serde(default, deserialize_with = "double_option")]
    pub header_image_id: Option<Option<i64>>,
    /// `null` clears the image
    #[serde(default, deserialize_with = "double_option")]
    pub feed_image_id: Option<Option<i64>>,
    pub intro: Option<String>,
    pub body: Option<Vec<RawStreamChild>>,
    pub author_ids: Option<Vec<i64>>,
    pub tags: Option<Vec<String>>,
    pub category_ids: Option<Vec<i64>>,
    pub gallery_images: Option<Vec<GalleryImageInput>>,
    pub related_links: Option<Vec<RelatedLinkInput>>,
    pub visibility: Option<Visibility>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Validated field set written by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct LoguePageFields {
    pub index_page_id: i64,
    pub slug: String,
    pub title: String,
    pub date: NaiveDate,
    pub header_image_id: Option<i64>,
    pub feed_image_id: Option<i64>,
    pub intro: String,
    pub body: StreamBody,
    /// Plain text of intro and body for search
    pub search_text: String,
    pub visibility: Visibility,
    pub author_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub gallery_images: Vec<GalleryImageInput>,
    pub related_links: Vec<RelatedLinkInput>,
}

/// Search filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}
