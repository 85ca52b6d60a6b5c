//! Enrollment projection routes.
//!
//! Override edits (`PUT *-overrides`, `POST draft`) only write the draft.
//! `POST apply` is the single endpoint that recomputes results.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;

use schoolplan_core::projection::{FieldOverrides, LevelOverride, OverrideSet};
use schoolplan_shared::types::{CycleId, LevelId, VersionId};

use crate::{AppState, error::ApiError};

/// Creates enrollment projection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/enrollment-projection/{version_id}/config", get(get_config))
        .route(
            "/enrollment-projection/{version_id}/global-overrides",
            put(update_global_overrides),
        )
        .route(
            "/enrollment-projection/{version_id}/level-overrides",
            put(update_level_overrides),
        )
        .route(
            "/enrollment-projection/{version_id}/grade-overrides",
            put(update_grade_overrides),
        )
        .route("/enrollment-projection/{version_id}/draft", post(save_draft))
        .route("/enrollment-projection/{version_id}/apply", post(apply))
        .route("/enrollment-projection/{version_id}/validate", post(validate))
        .route("/enrollment-projection/{version_id}/unvalidate", post(unvalidate))
        .route(
            "/enrollment-projection/{version_id}/lateral-optimization",
            get(lateral_optimization),
        )
        .route("/enrollment-projection/{version_id}/results", get(get_results))
}

// ============================================================================
// Request Types
// ============================================================================

/// Cycle-tier edits. An entry with no field set clears that cycle.
#[derive(Debug, Deserialize)]
pub struct LevelOverridesRequest {
    /// Overrides keyed by cycle.
    pub level_overrides: BTreeMap<CycleId, LevelOverride>,
}

/// Grade-tier edits. An entry with no field set clears that grade.
#[derive(Debug, Deserialize)]
pub struct GradeOverridesRequest {
    /// Overrides keyed by grade.
    pub grade_overrides: BTreeMap<LevelId, FieldOverrides>,
}

/// Request body for apply.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    /// Replaces the committed overrides. When absent the stored draft is applied.
    #[serde(default)]
    pub overrides: Option<OverrideSet>,
    /// Years to project, 1 to 5.
    #[serde(default)]
    pub horizon_years: Option<u8>,
}

/// Request body for validate.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Must be `true`.
    #[serde(default)]
    pub confirmation: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/enrollment-projection/{version_id}/config` - Committed config, draft and catalogue.
async fn get_config(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projection.get_config(version_id).await?))
}

/// PUT `/enrollment-projection/{version_id}/global-overrides`
async fn update_global_overrides(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<FieldOverrides>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let draft = state
        .projection
        .update_global_overrides(version_id, payload)
        .await?;
    Ok(Json(draft))
}

/// PUT `/enrollment-projection/{version_id}/level-overrides`
async fn update_level_overrides(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<LevelOverridesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let draft = state
        .projection
        .update_level_overrides(version_id, payload.level_overrides)
        .await?;
    Ok(Json(draft))
}

/// PUT `/enrollment-projection/{version_id}/grade-overrides`
async fn update_grade_overrides(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<GradeOverridesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let draft = state
        .projection
        .update_grade_overrides(version_id, payload.grade_overrides)
        .await?;
    Ok(Json(draft))
}

/// POST `/enrollment-projection/{version_id}/draft` - Overwrite the whole draft.
async fn save_draft(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<OverrideSet>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.projection.save_draft(version_id, payload).await?))
}

/// POST `/enrollment-projection/{version_id}/apply` - Commit and recompute.
///
/// The body is optional.
async fn apply(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<ApplyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        // No JSON body: apply the stored draft.
        Err(JsonRejection::MissingJsonContentType(_)) => ApplyRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let results = state
        .projection
        .apply_and_calculate(version_id, payload.overrides, payload.horizon_years)
        .await?;
    Ok(Json(results))
}

/// POST `/enrollment-projection/{version_id}/validate` - Mark validated, flag downstream.
async fn validate(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(
        state
            .projection
            .validate(version_id, payload.confirmation)
            .await?,
    ))
}

/// POST `/enrollment-projection/{version_id}/unvalidate`
async fn unvalidate(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projection.unvalidate(version_id).await?))
}

/// GET `/enrollment-projection/{version_id}/lateral-optimization`
async fn lateral_optimization(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projection.lateral_optimization(version_id).await?))
}

/// GET `/enrollment-projection/{version_id}/results` - Last committed results.
async fn get_results(
    State(state): State<AppState>,
    Path(version_id): Path<VersionId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projection.get_results(version_id).await?))
}
