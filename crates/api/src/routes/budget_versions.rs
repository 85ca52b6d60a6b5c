//! Budget version routes.
//!
//! CRUD over versions plus clone and activate. Status changes live under
//! `/consolidation/{id}`.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use schoolplan_core::version::{CreateVersionInput, UpdateVersionInput, VersionFilter};
use schoolplan_core::workflow::VersionStatus;
use schoolplan_shared::types::{PageRequest, VersionId};

use crate::{AppState, error::ApiError};

/// Creates budget version routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budget-versions", get(list_versions).post(create_version))
        .route(
            "/budget-versions/{id}",
            get(get_version).put(update_version).delete(delete_version),
        )
        .route("/budget-versions/{id}/clone", post(clone_version))
        .route("/budget-versions/{id}/activate", post(activate_version))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing versions.
#[derive(Debug, Default, Deserialize)]
pub struct ListVersionsQuery {
    /// Page number, 1-indexed.
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
    /// Only this fiscal year.
    pub fiscal_year: Option<i32>,
    /// Only this status.
    pub status: Option<VersionStatus>,
}

impl ListVersionsQuery {
    fn split(self) -> (VersionFilter, PageRequest) {
        let defaults = PageRequest::default();
        (
            VersionFilter {
                fiscal_year: self.fiscal_year,
                status: self.status,
            },
            PageRequest {
                page: self.page.unwrap_or(defaults.page),
                per_page: self.per_page.unwrap_or(defaults.per_page),
            },
        )
    }
}

/// Request body for cloning a version.
#[derive(Debug, Default, Deserialize)]
pub struct CloneVersionRequest {
    /// Name of the clone. Defaults to "<source> (copy)".
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/budget-versions` - List versions, newest first.
async fn list_versions(
    State(state): State<AppState>,
    Query(query): Query<ListVersionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (filter, page) = query.split();
    let versions = state.versions.list(filter, page).await?;
    Ok(Json(versions))
}

/// POST `/budget-versions` - Create a WORKING version.
async fn create_version(
    State(state): State<AppState>,
    payload: Result<Json<CreateVersionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let version = state.versions.create(payload).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// GET `/budget-versions/{id}` - Fetch one version.
async fn get_version(
    State(state): State<AppState>,
    Path(id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.get(id).await?))
}

/// PUT `/budget-versions/{id}` - Edit name, academic year or notes.
async fn update_version(
    State(state): State<AppState>,
    Path(id): Path<VersionId>,
    payload: Result<Json<UpdateVersionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.versions.update(id, payload).await?))
}

/// DELETE `/budget-versions/{id}` - Delete a WORKING or REJECTED version.
async fn delete_version(
    State(state): State<AppState>,
    Path(id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    state.versions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/budget-versions/{id}/clone` - Copy any version into a new WORKING one.
async fn clone_version(
    State(state): State<AppState>,
    Path(id): Path<VersionId>,
    payload: Result<Json<CloneVersionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let clone = state.versions.clone_version(id, payload.name).await?;
    Ok((StatusCode::CREATED, Json(clone)))
}

/// POST `/budget-versions/{id}/activate` - Make the version its fiscal year's target.
async fn activate_version(
    State(state): State<AppState>,
    Path(id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.activate(id).await?))
}
