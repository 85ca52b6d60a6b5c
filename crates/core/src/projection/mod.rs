//! Enrollment projection.
//!
//! Projects grade headcounts from a base enrollment through a three-tier
//! override cascade, with a draft/apply protocol so frequent edits never
//! trigger recomputation.
//!
//! # Modules
//!
//! - `types` - Catalogue, overrides, config and result types
//! - `cascade` - Grade → cycle → global → default resolution
//! - `engine` - Cohort projection over the horizon
//! - `optimizer` - Lateral-entry recommendations
//! - `service` - Draft, apply and validate operations

pub mod cascade;
pub mod engine;
pub mod error;
pub mod optimizer;
pub mod repository;
pub mod service;
pub mod types;

#[cfg(test)]
mod cascade_props;
#[cfg(test)]
mod service_props;

/// Years projected when nothing else is configured.
pub const DEFAULT_HORIZON_YEARS: u8 = 1;
/// Longest supported horizon.
pub const MAX_HORIZON_YEARS: u8 = 5;

pub use cascade::{OverrideCascade, OverrideResolver, validate_overrides};
pub use engine::ProjectionEngine;
pub use error::ProjectionError;
pub use optimizer::optimize_lateral_entry;
pub use repository::ProjectionRepository;
pub use service::ProjectionService;
pub use types::{
    BaseEnrollment, Cycle, FieldOverrides, FieldValue, GradeCatalog, GradeLevel,
    GradeProjection, LateralOptimization, LevelOverride, OverrideField, OverrideSet,
    OverrideSource, ProjectionConfig, ProjectionConfigView, ProjectionDraft, ProjectionResults,
    ResolvedParameters, YearSummary,
};
