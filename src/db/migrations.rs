//! Database migrations module
//!
//! Code-based database migrations for the Logue service. All migrations are
//! embedded directly in Rust code as SQL strings, supporting both SQLite and
//! MySQL databases for single-binary deployment.
//!
//! # Usage
//!
//! ```ignore
//! use logue::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Foreign keys encode the content lifecycle: image references are nulled
//! when the image goes away, while ordered child rows and tag/category links
//! are removed together with their page.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations for the Logue schema, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_images",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                url VARCHAR(1024) NOT NULL,
                width INTEGER,
                height INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS images (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(255) NOT NULL,
                url VARCHAR(1024) NOT NULL,
                width INT,
                height INT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
    },
    // Snippets: authors and categories
    Migration {
        version: 2,
        name: "create_logue_snippets",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS logue_authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(140) NOT NULL,
                website VARCHAR(200),
                image_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS logue_categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(240) NOT NULL,
                icon_id INTEGER,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (icon_id) REFERENCES images(id) ON DELETE SET NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS logue_authors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(140) NOT NULL,
                website VARCHAR(200),
                image_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE SET NULL
            );
            CREATE TABLE IF NOT EXISTS logue_categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(240) NOT NULL,
                icon_id BIGINT,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (icon_id) REFERENCES images(id) ON DELETE SET NULL
            );
        "#,
    },
    Migration {
        version: 3,
        name: "create_tags",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_tags_slug ON tags(slug);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(100) NOT NULL UNIQUE,
                slug VARCHAR(100) NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_tags_slug ON tags(slug);
        "#,
    },
    // Listing pages
    Migration {
        version: 4,
        name: "create_logue_index_pages",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS logue_index_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                intro TEXT NOT NULL DEFAULT '',
                live BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS logue_tag_index_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                live BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS logue_index_pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                intro TEXT NOT NULL,
                live BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS logue_tag_index_pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                live BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_logue_pages",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS logue_pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                index_page_id INTEGER NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                date DATE NOT NULL,
                header_image_id INTEGER,
                feed_image_id INTEGER,
                intro VARCHAR(250) NOT NULL,
                body TEXT,
                search_text TEXT NOT NULL DEFAULT '',
                live BOOLEAN NOT NULL DEFAULT 0,
                visibility VARCHAR(20) NOT NULL DEFAULT 'public',
                first_published_at TIMESTAMP,
                last_published_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (index_page_id) REFERENCES logue_index_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (header_image_id) REFERENCES images(id) ON DELETE SET NULL,
                FOREIGN KEY (feed_image_id) REFERENCES images(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logue_pages_listing
                ON logue_pages(index_page_id, live, visibility, first_published_at);
            CREATE INDEX IF NOT EXISTS idx_logue_pages_date ON logue_pages(date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS logue_pages (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                index_page_id BIGINT NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                title VARCHAR(255) NOT NULL,
                date DATE NOT NULL,
                header_image_id BIGINT,
                feed_image_id BIGINT,
                intro VARCHAR(250) NOT NULL,
                body LONGTEXT,
                search_text LONGTEXT NOT NULL,
                live BOOLEAN NOT NULL DEFAULT FALSE,
                visibility VARCHAR(20) NOT NULL DEFAULT 'public',
                first_published_at TIMESTAMP NULL,
                last_published_at TIMESTAMP NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
                FOREIGN KEY (index_page_id) REFERENCES logue_index_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (header_image_id) REFERENCES images(id) ON DELETE SET NULL,
                FOREIGN KEY (feed_image_id) REFERENCES images(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_logue_pages_listing
                ON logue_pages(index_page_id, live, visibility, first_published_at);
            CREATE INDEX idx_logue_pages_date ON logue_pages(date);
        "#,
    },
    // Ordered child collections
    Migration {
        version: 6,
        name: "create_logue_page_children",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS logue_page_authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES logue_authors(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_logue_page_authors_page ON logue_page_authors(page_id, sort_order);
            CREATE TABLE IF NOT EXISTS logue_page_gallery_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                image_id INTEGER NOT NULL,
                caption VARCHAR(250) NOT NULL DEFAULT '',
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_logue_page_gallery_page ON logue_page_gallery_images(page_id, sort_order);
            CREATE TABLE IF NOT EXISTS logue_page_related_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                url VARCHAR(200) NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_logue_page_links_page ON logue_page_related_links(page_id, sort_order);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS logue_page_authors (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                page_id BIGINT NOT NULL,
                author_id BIGINT NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES logue_authors(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_logue_page_authors_page ON logue_page_authors(page_id, sort_order);
            CREATE TABLE IF NOT EXISTS logue_page_gallery_images (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                page_id BIGINT NOT NULL,
                image_id BIGINT NOT NULL,
                caption VARCHAR(250) NOT NULL DEFAULT '',
                sort_order INT NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (image_id) REFERENCES images(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_logue_page_gallery_page ON logue_page_gallery_images(page_id, sort_order);
            CREATE TABLE IF NOT EXISTS logue_page_related_links (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                page_id BIGINT NOT NULL,
                name VARCHAR(255) NOT NULL,
                url VARCHAR(200) NOT NULL,
                sort_order INT NOT NULL DEFAULT 0,
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_logue_page_links_page ON logue_page_related_links(page_id, sort_order);
        "#,
    },
    // Unordered sets: tags and categories
    Migration {
        version: 7,
        name: "create_logue_page_links",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS logue_page_tags (
                page_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (page_id, tag_id),
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_logue_page_tags_tag ON logue_page_tags(tag_id);
            CREATE TABLE IF NOT EXISTS logue_page_categories (
                page_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                PRIMARY KEY (page_id, category_id),
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES logue_categories(id) ON DELETE CASCADE
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS logue_page_tags (
                page_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL,
                PRIMARY KEY (page_id, tag_id),
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_logue_page_tags_tag ON logue_page_tags(tag_id);
            CREATE TABLE IF NOT EXISTS logue_page_categories (
                page_id BIGINT NOT NULL,
                category_id BIGINT NOT NULL,
                PRIMARY KEY (page_id, category_id),
                FOREIGN KEY (page_id) REFERENCES logue_pages(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES logue_categories(id) ON DELETE CASCADE
            );
        "#,
    },
];

/// Run all pending migrations
///
/// Creates the `_migrations` tracking table when missing, then applies every
/// migration whose version has not been recorded yet, in order.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Get list of already applied migrations
async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    const SQL: &str = "SELECT version, name, applied_at FROM _migrations ORDER BY version";

    let records = match pool.backend() {
        Backend::Sqlite(p) => sqlx::query(SQL)
            .fetch_all(p)
            .await?
            .iter()
            .map(|row| {
                Ok(MigrationRecord {
                    version: row.try_get("version")?,
                    name: row.try_get("name")?,
                    applied_at: row.try_get("applied_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?,
        Backend::Mysql(p) => sqlx::query(SQL)
            .fetch_all(p)
            .await?
            .iter()
            .map(|row| {
                Ok(MigrationRecord {
                    version: row.try_get::<i32, _>("version")? as i64,
                    name: row.try_get("name")?,
                    applied_at: row.try_get("applied_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?,
    };

    Ok(records)
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    for statement in split_sql_statements(sql) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    match pool.backend() {
        Backend::Sqlite(p) => {
            sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
                .bind(migration.version)
                .bind(migration.name)
                .execute(p)
                .await?;
        }
        Backend::Mysql(p) => {
            sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
                .bind(migration.version)
                .bind(migration.name)
                .execute(p)
                .await?;
        }
    }

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Check if migrations are up to date
pub async fn is_up_to_date(pool: &DynDatabasePool) -> Result<bool> {
    Ok(pending_count(pool).await? == 0)
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
