//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.
//!
//! Query text is shared between SQLite and MySQL; `with_pool!` expands a body
//! once per backend with `$p` bound to the concrete pool.

/// Run `$body` with `$p` bound to whichever concrete pool `$pool` wraps.
macro_rules! with_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool.backend() {
            $crate::db::Backend::Sqlite($p) => $body,
            $crate::db::Backend::Mysql($p) => $body,
        }
    };
}

pub mod author;
pub mod category;
pub mod image;
pub mod index_page;
pub mod logue_page;
pub mod tag;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use image::{ImageRepository, SqlxImageRepository};
pub use index_page::{IndexPageRepository, SqlxIndexPageRepository};
pub use logue_page::{LoguePageRepository, SqlxLoguePageRepository};
pub use tag::{SqlxTagRepository, TagRepository};

/// Whether an error is a unique-constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .map(|db| db.is_unique_violation())
            .unwrap_or(false)
    })
}
