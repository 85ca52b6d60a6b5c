//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes for budget versions, consolidation and enrollment projection
//! - Conversion of domain errors into JSON error responses
//! - The shared [`AppState`] handed to every handler

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use schoolplan_core::consolidation::{
    ConsolidationEngine, ConsolidationRepository, ConsolidationService,
};
use schoolplan_core::planning::ModuleAdapters;
use schoolplan_core::projection::{ProjectionRepository, ProjectionService};
use schoolplan_core::statements::{StatementBuilder, StatementCache};
use schoolplan_core::version::{VersionRepository, VersionService};

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Budget version store and workflow transitions.
    pub versions: VersionService,
    /// Consolidation, validation and statements.
    pub consolidation: ConsolidationService,
    /// Enrollment projection drafts and apply.
    pub projection: ProjectionService,
}

impl AppState {
    /// Wires the three services over one store.
    ///
    /// `store` implements every repository trait; both backends do.
    #[must_use]
    pub fn new<S>(
        store: Arc<S>,
        adapters: ModuleAdapters,
        engine: ConsolidationEngine,
        statements: StatementBuilder,
        cache: StatementCache,
    ) -> Self
    where
        S: VersionRepository + ConsolidationRepository + ProjectionRepository + 'static,
    {
        let adapters = Arc::new(adapters);
        let versions = VersionService::new(store.clone(), adapters.clone());
        let consolidation =
            ConsolidationService::new(versions.clone(), store.clone(), adapters, engine)
                .with_statements(statements, cache);
        let projection = ProjectionService::new(versions.clone(), store);
        Self {
            versions,
            consolidation,
            projection,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
