//! Public Logue API endpoints
//!
//! - GET /api/v1/logue/{index_slug}?page= - Paginated listing of an index page
//! - GET /api/v1/logue/{index_slug}/{page_slug} - Page detail with rendered body
//! - GET /api/v1/logue-tags/{slug}?tag= - Pages carrying one tag
//! - GET /api/v1/search?q=&date_from=&date_to= - Search
//! - GET /api/v1/tags, /categories, /authors - Snippet lists

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::common::{last_value, ListTagsQuery, QueryPairs};
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{ItemsResponse, SearchResponse, TagListResponse, TagResponse};
use crate::models::{LogueAuthor, LogueCategory, LoguePageItem, SearchParams};
use crate::services::{ListingPage, LoguePageView, TagFilterResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logue/{index_slug}", get(get_listing))
        .route("/logue/{index_slug}/{page_slug}", get(get_page))
        .route("/logue-tags/{slug}", get(get_tag_filter))
        .route("/search", get(search))
        .route("/tags", get(list_tags))
        .route("/categories", get(list_categories))
        .route("/authors", get(list_authors))
}

async fn get_listing(
    State(state): State<AppState>,
    Path(index_slug): Path<String>,
    Query(query): Query<QueryPairs>,
) -> Result<Json<ListingPage>, ApiError> {
    let listing = state
        .index_service
        .listing(&index_slug, last_value(&query, "page"))
        .await?;
    Ok(Json(listing))
}

async fn get_page(
    State(state): State<AppState>,
    Path((index_slug, page_slug)): Path<(String, String)>,
) -> Result<Json<LoguePageView>, ApiError> {
    let view = state.page_service.get_public(&index_slug, &page_slug).await?;
    Ok(Json(view))
}

async fn get_tag_filter(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<QueryPairs>,
) -> Result<Json<TagFilterResult>, ApiError> {
    let result = state
        .index_service
        .tag_filter(&slug, last_value(&query, "tag"))
        .await?;
    Ok(Json(result))
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse<LoguePageItem>>, ApiError> {
    let items = state.page_service.search(&params).await?;
    Ok(Json(SearchResponse {
        query: params.q,
        total: items.len(),
        items,
    }))
}

/// Plain tag list, or the tag cloud with `?cloud=true`
async fn list_tags(
    State(state): State<AppState>,
    Query(query): Query<ListTagsQuery>,
) -> Result<Json<TagListResponse>, ApiError> {
    let tags = if query.cloud {
        let cloud = state.tag_service.get_tag_cloud(query.limit).await?;
        cloud.into_iter().map(TagResponse::from).collect()
    } else {
        let list = state.tag_service.list().await?;
        list.into_iter().map(TagResponse::from).collect()
    };

    Ok(Json(TagListResponse { tags }))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ItemsResponse<LogueCategory>>, ApiError> {
    Ok(Json(state.category_service.list().await?.into()))
}

async fn list_authors(
    State(state): State<AppState>,
) -> Result<Json<ItemsResponse<LogueAuthor>>, ApiError> {
    Ok(Json(state.author_service.list().await?.into()))
}
