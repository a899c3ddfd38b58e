//! Data models
//!
//! This module contains all data structures used throughout the Logue service.
//! Models represent:
//! - Database entities (Image, LogueAuthor, LogueCategory, Tag, index pages, LoguePage)
//! - Structured body blocks
//! - API request/response types and pagination

mod author;
pub mod blocks;
mod category;
mod image;
mod index_page;
mod logue_page;
mod pagination;
mod tag;

pub use author::{AuthorInput, LogueAuthor, AUTHOR_NAME_MAX_LEN};
pub use blocks::{BodyBlock, RawStreamChild, StreamBody, StreamChild};
pub use category::{CategoryInput, LogueCategory, CATEGORY_NAME_MAX_LEN};
pub use image::{CreateImageInput, Image};
pub use index_page::{IndexPageInput, LogueIndexPage, LogueTagIndexPage, TagIndexPageInput};
pub use logue_page::{
    CreateLoguePageInput, GalleryImage, GalleryImageInput, LoguePage, LoguePageFields, LoguePageItem,
    RelatedLink, RelatedLinkInput, SearchParams, UpdateLoguePageInput, Visibility,
    CAPTION_MAX_LEN, INTRO_MAX_LEN, LINK_NAME_MAX_LEN, MAX_AUTHORS, MIN_AUTHORS,
};
pub use pagination::{page_count, resolve_page, ListParams, PageFallback, PageRequest, PagedResult};
pub use tag::{Tag, TagWithCount};
