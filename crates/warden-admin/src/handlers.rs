//! HTTP request handlers.

use crate::api_types::{ApiResponse, HealthResponse, RejectRequest};
use crate::error::AdminError;
use crate::state::AppState;
use crate::pages;
use axum::Json;
use axum::extract::{Path, State};
use axum::response::Html;
use uuid::Uuid;
use warden_core::{QueryRecord, QueryStatus};

type ApiResult<T> = Result<Json<ApiResponse<T>>, AdminError>;

fn parse_id(id: &str) -> Result<Uuid, AdminError> {
    Uuid::parse_str(id).map_err(|_| AdminError::InvalidRequest(format!("invalid query id '{}'", id)))
}

/// Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Reviewer page listing every record.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AdminError> {
    let records = state.store().list_all().await?;
    Ok(Html(pages::queries_page(&records)))
}

/// List every record, newest first.
pub async fn queries_list(State(state): State<AppState>) -> ApiResult<Vec<QueryRecord>> {
    let records = state.store().list_all().await?;
    Ok(Json(ApiResponse::list(records)))
}

/// List records awaiting a decision.
pub async fn queries_pending(State(state): State<AppState>) -> ApiResult<Vec<QueryRecord>> {
    let records = state.store().list_by_status(QueryStatus::Pending).await?;
    Ok(Json(ApiResponse::list(records)))
}

pub async fn query_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QueryRecord> {
    let id = parse_id(&id)?;
    state
        .store()
        .get(id)
        .await?
        .map(|record| Json(ApiResponse::new(record)))
        .ok_or_else(|| AdminError::NotFound("Query not found".to_string()))
}

pub async fn query_approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<QueryRecord> {
    let id = parse_id(&id)?;
    let record = state.store().approve(id).await?;
    tracing::info!(query_id = %id, "Query approved via admin API");
    Ok(Json(
        ApiResponse::new(record).with_message("Query approved successfully"),
    ))
}

/// Reject a record. The body is optional; a missing reason is replaced
/// with a default.
pub async fn query_reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> ApiResult<QueryRecord> {
    let id = parse_id(&id)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let record = state.store().reject(id, request.reason()).await?;
    tracing::info!(query_id = %id, reason = request.reason(), "Query rejected via admin API");
    Ok(Json(
        ApiResponse::new(record).with_message("Query rejected successfully"),
    ))
}
