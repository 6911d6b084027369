use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::UrlStats;
use crate::models::{CreateUrlRequest, ShortenedUrl, UrlSummary};
use crate::service::ServiceError;
use crate::session::SessionId;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    25
}

#[derive(Serialize)]
pub struct ListResponse {
    pub urls: Vec<UrlSummary>,
    pub total: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Storage(e) => {
            tracing::error!("Storage failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let error = match err {
        ServiceError::Storage(_) => "Internal server error".to_string(),
        other => other.to_string(),
    };

    (status, Json(ErrorResponse { error }))
}

/// Service root; also where expired links send their visitors
pub async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "OK".to_string(),
    })
}

/// Create a new shortened URL owned by the caller's session
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    payload: Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortenedUrl>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: rejection.body_text(),
            }),
        )
    })?;

    let url = state
        .service
        .shorten(&payload.url, payload.delete_after, session.as_str())
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(url)))
}

/// List the caller's links, newest first
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let urls = state
        .service
        .list_mine(session.as_str(), query.limit)
        .await
        .map_err(error_response)?;

    let total = urls.len();
    Ok(Json(ListResponse { urls, total }))
}

/// Link details and visit statistics by manage code
pub async fn get_url_info(
    State(state): State<Arc<AppState>>,
    Path(manage_code): Path<String>,
) -> Result<Json<UrlStats>, ApiError> {
    let stats = state
        .service
        .info(&manage_code)
        .await
        .map_err(error_response)?;

    Ok(Json(stats))
}

/// Delete one of the caller's links
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionId>,
    Path(manage_code): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .service
        .delete(&manage_code, session.as_str())
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}
