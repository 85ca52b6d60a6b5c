//! Consolidation and workflow routes.
//!
//! Everything here is keyed by budget version. Workflow transitions accept
//! an optional `expected_status`; when it no longer matches the stored
//! status the request fails with 409 instead of acting on stale state.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use schoolplan_core::statements::{
    StatementError, StatementFormat, StatementPeriod, StatementType,
};
use schoolplan_core::workflow::VersionStatus;
use schoolplan_shared::types::VersionId;

use crate::{AppState, error::ApiError};

/// Creates consolidation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/consolidation/{version_id}", get(get_consolidated))
        .route("/consolidation/{version_id}/status", get(get_status))
        .route("/consolidation/{version_id}/validation", get(get_validation))
        .route("/consolidation/{version_id}/consolidate", post(consolidate))
        .route("/consolidation/{version_id}/submit", post(submit))
        .route("/consolidation/{version_id}/approve", post(approve))
        .route("/consolidation/{version_id}/reject", post(reject))
        .route("/consolidation/{version_id}/reopen", post(reopen))
        .route("/consolidation/{version_id}/supersede", post(supersede))
        .route(
            "/consolidation/{version_id}/statements/{statement_type}",
            get(get_statement),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters shared by submit, approve and reopen.
#[derive(Debug, Default, Deserialize)]
pub struct TransitionQuery {
    /// Status the caller last saw.
    pub expected_status: Option<VersionStatus>,
}

/// Request body for rejecting a version.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why the version is sent back. Must not be blank.
    #[serde(default)]
    pub reason: String,
    /// Status the caller last saw.
    #[serde(default)]
    pub expected_status: Option<VersionStatus>,
}

/// Request body for superseding a version.
#[derive(Debug, Default, Deserialize)]
pub struct SupersedeRequest {
    /// The version that replaces this one.
    #[serde(default)]
    pub superseded_by: Option<VersionId>,
    /// Status the caller last saw.
    #[serde(default)]
    pub expected_status: Option<VersionStatus>,
}

/// Query parameters for statements.
#[derive(Debug, Default, Deserialize)]
pub struct StatementQuery {
    /// `PCG` (default) or `IFRS`.
    pub format: Option<String>,
    /// `ANNUAL` (default), `T1`, `T2` or `T3`.
    pub period: Option<String>,
}

impl StatementQuery {
    fn parse(
        &self,
        statement_type: &str,
    ) -> Result<(StatementType, StatementFormat, StatementPeriod), StatementError> {
        let statement_type = StatementType::parse(statement_type)
            .ok_or_else(|| StatementError::InvalidType(statement_type.to_string()))?;
        let format = match self.format.as_deref() {
            None => StatementFormat::default(),
            Some(raw) => StatementFormat::parse(raw)
                .ok_or_else(|| StatementError::InvalidFormat(raw.to_string()))?,
        };
        let period = match self.period.as_deref() {
            None => StatementPeriod::default(),
            Some(raw) => StatementPeriod::parse(raw)
                .ok_or_else(|| StatementError::InvalidPeriod(raw.to_string()))?,
        };
        Ok((statement_type, format, period))
    }
}

// ============================================================================
// Consolidation Handlers
// ============================================================================

/// GET `/consolidation/{version_id}` - Last consolidated budget.
async fn get_consolidated(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.consolidation.get_consolidated(version_id).await?))
}

/// GET `/consolidation/{version_id}/status` - Per-module completeness.
async fn get_status(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.consolidation.get_status(version_id).await?))
}

/// GET `/consolidation/{version_id}/validation` - Dry-run with errors and warnings.
async fn get_validation(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.consolidation.get_validation(version_id).await?))
}

/// POST `/consolidation/{version_id}/consolidate` - Regenerate line items.
async fn consolidate(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.consolidation.consolidate(version_id).await?))
}

/// GET `/consolidation/{version_id}/statements/{statement_type}` - Render a statement.
async fn get_statement(
    State(state): State<AppState>,
    Path((version_id, statement_type)): Path<(VersionId, String)>,
    Query(query): Query<StatementQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (statement_type, format, period) = query.parse(&statement_type)?;
    let statement = state
        .consolidation
        .get_statement(version_id, statement_type, format, period)
        .await?;
    Ok(Json(statement.as_ref().clone()))
}

// ============================================================================
// Workflow Handlers
// ============================================================================

/// POST `/consolidation/{version_id}/submit` - WORKING → SUBMITTED.
async fn submit(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    Query(query): Query<TransitionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.submit(version_id, query.expected_status).await?))
}

/// POST `/consolidation/{version_id}/approve` - SUBMITTED → APPROVED.
async fn approve(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    Query(query): Query<TransitionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.approve(version_id, query.expected_status).await?))
}

/// POST `/consolidation/{version_id}/reject` - SUBMITTED → REJECTED.
async fn reject(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let version = state
        .versions
        .reject(version_id, payload.reason, payload.expected_status)
        .await?;
    Ok(Json(version))
}

/// POST `/consolidation/{version_id}/reopen` - REJECTED → WORKING.
async fn reopen(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    Query(query): Query<TransitionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.versions.reopen(version_id, query.expected_status).await?))
}

/// POST `/consolidation/{version_id}/supersede` - APPROVED → SUPERSEDED.
async fn supersede(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<SupersedeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(JsonRejection::MissingJsonContentType(_)) => SupersedeRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let version = state
        .versions
        .supersede(version_id, payload.superseded_by, payload.expected_status)
        .await?;
    Ok(Json(version))
}
