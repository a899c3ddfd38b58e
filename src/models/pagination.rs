//! Pagination types
//!
//! Page numbers arrive as raw query strings. Resolution never fails:
//! - a missing or non-integer value selects page 1
//! - an integer below 1 or past the last page selects the last page
//!
//! An empty listing still has one (empty) page.

use serde::{Deserialize, Serialize};

/// How a raw `page` parameter was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// No value supplied
    Missing,
    /// Supplied but not an integer
    NotAnInteger,
    /// An integer that fits in `i64`
    Number(i64),
    /// An integer literal too large in magnitude for `i64`
    Overflow,
}

impl PageRequest {
    /// Interpret a raw query value.
    ///
    /// Surrounding whitespace and a leading sign are accepted, as integer
    /// parsing of query strings usually does.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Missing;
        };
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('+')
            .or_else(|| trimmed.strip_prefix('-'))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Self::NotAnInteger;
        }

        match trimmed.parse::<i64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Overflow,
        }
    }
}

/// Which fallback, if any, was applied while resolving a page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFallback {
    FirstPage,
    LastPage,
}

/// Number of pages needed for `total` items; never less than 1.
pub fn page_count(total: i64, per_page: u32) -> u32 {
    let per_page = i64::from(per_page.max(1));
    let total = total.max(0);
    let pages = (total + per_page - 1) / per_page;
    pages.clamp(1, i64::from(u32::MAX)) as u32
}

/// Resolve a raw page parameter against a listing of `total` items.
pub fn resolve_page(raw: Option<&str>, total: i64, per_page: u32) -> (u32, Option<PageFallback>) {
    let last = page_count(total, per_page);

    match PageRequest::parse(raw) {
        PageRequest::Missing | PageRequest::NotAnInteger => (1, Some(PageFallback::FirstPage)),
        PageRequest::Number(n) if n >= 1 && n <= i64::from(last) => (n as u32, None),
        PageRequest::Number(_) | PageRequest::Overflow => (last, Some(PageFallback::LastPage)),
    }
}

/// Pagination parameters after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        page_count(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Map items to another type, keeping pagination metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
