//! Common API utilities and shared types
//!
//! Query strings shared by the public and admin endpoints.

use serde::Deserialize;

use crate::services::tag::DEFAULT_CLOUD_LIMIT;

/// Default tag cloud size
pub fn default_cloud_limit() -> usize {
    DEFAULT_CLOUD_LIMIT
}

/// Raw query pairs, in request order.
///
/// Listing parameters are read from this instead of a typed struct so that
/// malformed or repeated keys never fail the request.
pub type QueryPairs = Vec<(String, String)>;

/// Last value given for `key`, so `?page=2&page=x` reads as `x`
pub fn last_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// `GET /tags` query parameters
#[derive(Debug, Deserialize)]
pub struct ListTagsQuery {
    /// Return the tag cloud (tags with page counts) instead of the plain list
    #[serde(default)]
    pub cloud: bool,
    #[serde(default = "default_cloud_limit")]
    pub limit: usize,
}

/// `GET /admin/pages` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListPagesQuery {
    /// Restrict to children of one index page
    pub index_page_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> QueryPairs {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_last_value_wins() {
        let query = pairs(&[("page", "2"), ("tag", "rust"), ("page", "x")]);
        assert_eq!(last_value(&query, "page"), Some("x"));
        assert_eq!(last_value(&query, "tag"), Some("rust"));
        assert_eq!(last_value(&query, "q"), None);
    }

    #[test]
    fn test_last_value_keeps_empty() {
        let query = pairs(&[("page", "")]);
        assert_eq!(last_value(&query, "page"), Some(""));
    }
}
