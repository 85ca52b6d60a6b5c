//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod budget_versions;
pub mod consolidation;
pub mod health;
pub mod projection;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(budget_versions::routes())
        .merge(consolidation::routes())
        .merge(projection::routes())
}
