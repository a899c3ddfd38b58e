//! Admin API endpoints
//!
//! CRUD for images, authors, categories, index pages, tag index pages and
//! Logue pages, plus publishing and the block schema registry. Mounted under
//! `/api/v1/admin` behind [`require_admin_token`](super::middleware::require_admin_token).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::common::ListPagesQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::ItemsResponse;
use crate::models::blocks::{body_block_schemas, struct_block_schemas, BlockSchema};
use crate::models::{
    AuthorInput, CategoryInput, CreateImageInput, CreateLoguePageInput, IndexPageInput,
    LoguePage, LoguePageItem, TagIndexPageInput, UpdateLoguePageInput,
};

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        // Images
        .route("/images", get(list_images).post(register_image))
        .route("/images/{id}", get(get_image).delete(delete_image))
        // Authors
        .route("/authors", get(list_authors).post(create_author))
        .route(
            "/authors/{id}",
            get(get_author).put(update_author).delete(delete_author),
        )
        // Categories
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        // Tags are created through page saves
        .route("/tags/{id}", delete(delete_tag))
        // Index pages
        .route("/index-pages", get(list_index_pages).post(create_index_page))
        .route(
            "/index-pages/{id}",
            get(get_index_page).put(update_index_page).delete(delete_index_page),
        )
        .route(
            "/tag-index-pages",
            get(list_tag_index_pages).post(create_tag_index_page),
        )
        .route(
            "/tag-index-pages/{id}",
            get(get_tag_index_page)
                .put(update_tag_index_page)
                .delete(delete_tag_index_page),
        )
        // Logue pages
        .route("/pages", get(list_pages).post(create_page))
        .route(
            "/pages/{id}",
            get(get_page).patch(update_page).delete(delete_page),
        )
        .route("/pages/{id}/publish", post(publish_page))
        .route("/pages/{id}/unpublish", post(unpublish_page))
        .route("/pages/{id}/preview", get(preview_page))
        // Block schema registry
        .route("/blocks/schema", get(get_block_schema))
}

// ============================================================================
// Images
// ============================================================================

async fn list_images(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.image_service.list().await?;
    Ok(Json(ItemsResponse::from(items)))
}

async fn register_image(
    State(state): State<AppState>,
    Json(input): Json<CreateImageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let image = state.image_service.register(input).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.image_service.get_by_id(id).await?))
}

async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.image_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Authors
// ============================================================================

async fn list_authors(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.author_service.list().await?;
    Ok(Json(ItemsResponse::from(items)))
}

async fn create_author(
    State(state): State<AppState>,
    Json(input): Json<AuthorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state.author_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.author_service.get_by_id(id).await?))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AuthorInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.author_service.update(id, input).await?))
}

async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.author_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Categories and tags
// ============================================================================

async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.category_service.list().await?;
    Ok(Json(ItemsResponse::from(items)))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.category_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.category_service.get_by_id(id).await?))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.category_service.update(id, input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Index pages
// ============================================================================

async fn list_index_pages(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.index_service.list_indexes().await?;
    Ok(Json(ItemsResponse::from(items)))
}

async fn create_index_page(
    State(state): State<AppState>,
    Json(input): Json<IndexPageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.index_service.create_index(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn get_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.index_service.get_index(id).await?))
}

async fn update_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<IndexPageInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.index_service.update_index(id, input).await?))
}

async fn delete_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.index_service.delete_index(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tag_index_pages(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.index_service.list_tag_indexes().await?;
    Ok(Json(ItemsResponse::from(items)))
}

async fn create_tag_index_page(
    State(state): State<AppState>,
    Json(input): Json<TagIndexPageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.index_service.create_tag_index(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn get_tag_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.index_service.get_tag_index(id).await?))
}

async fn update_tag_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TagIndexPageInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.index_service.update_tag_index(id, input).await?))
}

async fn delete_tag_index_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.index_service.delete_tag_index(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Logue pages
// ============================================================================

/// Rendered body of a page, published or not
#[derive(Debug, Serialize)]
struct PreviewResponse {
    id: i64,
    body_html: String,
}

async fn list_pages(
    State(state): State<AppState>,
    Query(query): Query<ListPagesQuery>,
) -> Result<Json<ItemsResponse<LoguePage>>, ApiError> {
    Ok(Json(state.page_service.list(query.index_page_id).await?.into()))
}

async fn create_page(
    State(state): State<AppState>,
    Json(input): Json<CreateLoguePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.page_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<LoguePageItem>, ApiError> {
    let page = state.page_service.get_by_id(id).await?;
    Ok(Json(page.into()))
}

async fn update_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateLoguePageInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.page_service.update(id, input).await?))
}

async fn delete_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.page_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.page_service.publish(id).await?))
}

async fn unpublish_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.page_service.unpublish(id).await?))
}

async fn preview_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let page = state.page_service.get_by_id(id).await?;
    let body_html = state.page_service.render_body(&page).await?;
    Ok(Json(PreviewResponse { id, body_html }))
}

// ============================================================================
// Block schema
// ============================================================================

#[derive(Debug, Serialize)]
struct BlockSchemaResponse {
    /// Block types accepted in a page body, in display order
    body: Vec<BlockSchema>,
    /// Every declared struct block
    struct_blocks: Vec<BlockSchema>,
}

async fn get_block_schema() -> Json<BlockSchemaResponse> {
    Json(BlockSchemaResponse {
        body: body_block_schemas(),
        struct_blocks: struct_block_schemas(),
    })
}
