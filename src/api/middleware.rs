//! API middleware
//!
//! Contains the shared application state, the JSON error envelope and the
//! admin token check.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAuthorRepository, SqlxCategoryRepository, SqlxImageRepository, SqlxIndexPageRepository,
    SqlxLoguePageRepository, SqlxTagRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    AuthorService, BodyRenderer, CategoryService, ImageService, IndexService, LoguePageService,
    ServiceError, TagService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub image_service: Arc<ImageService>,
    pub author_service: Arc<AuthorService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub index_service: Arc<IndexService>,
    pub page_service: Arc<LoguePageService>,
    /// Bearer token for admin routes; `None` leaves them open
    pub admin_token: Option<String>,
}

impl AppState {
    /// Wire repositories and services over one pool and cache
    pub fn new(pool: DynDatabasePool, cache: Arc<Cache>, config: &Config) -> anyhow::Result<Self> {
        let image_repo = SqlxImageRepository::boxed(pool.clone());
        let index_repo = SqlxIndexPageRepository::boxed(pool.clone());
        let page_repo = SqlxLoguePageRepository::boxed(pool.clone());

        let image_service = Arc::new(ImageService::new(image_repo.clone(), cache.clone()));
        let author_service = Arc::new(AuthorService::new(
            SqlxAuthorRepository::boxed(pool.clone()),
            image_repo.clone(),
            cache.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(
            SqlxCategoryRepository::boxed(pool.clone()),
            image_repo,
            cache.clone(),
        ));
        let tag_service = Arc::new(TagService::new(
            SqlxTagRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let index_service = Arc::new(IndexService::new(
            index_repo.clone(),
            page_repo.clone(),
            cache.clone(),
            config.logue.per_page,
            Duration::from_secs(config.cache.ttl_seconds),
        ));

        let renderer = BodyRenderer::new(&config.logue.highlight_theme)?;
        let page_service = Arc::new(LoguePageService::new(
            page_repo,
            index_repo,
            author_service.clone(),
            category_service.clone(),
            image_service.clone(),
            tag_service.clone(),
            renderer,
            cache,
        ));

        Ok(Self {
            pool,
            image_service,
            author_service,
            category_service,
            tag_service,
            index_service,
            page_service,
            admin_token: config.admin.token.clone().filter(|t| !t.is_empty()),
        })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::not_found(msg),
            ServiceError::Validation(msg) => Self::validation_error(msg),
            ServiceError::Conflict(msg) => Self::conflict(msg),
            ServiceError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                Self::internal_error("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Admin authorization middleware.
///
/// Passes every request when no admin token is configured.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.admin_token.as_deref() {
        match extract_bearer_token(&request) {
            Some(token) if token == expected => {}
            Some(_) => return Err(ApiError::unauthorized("Invalid admin token")),
            None => return Err(ApiError::unauthorized("Missing admin token")),
        }
    }

    Ok(next.run(request).await)
}
