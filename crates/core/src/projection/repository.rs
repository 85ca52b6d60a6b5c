//! Projection persistence seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use schoolplan_shared::types::VersionId;

use crate::error::StoreError;
use crate::planning::PlanningModule;
use crate::projection::types::{
    BaseEnrollment, GradeCatalog, ProjectionConfig, ProjectionDraft, ProjectionResults,
};
use crate::workflow::VersionStatus;

/// Storage of projection configs, drafts and results.
///
/// Every write takes the version status the caller checked. The store
/// re-checks it atomically with the write and returns `StatusMismatch`
/// without writing when the version has moved on.
#[async_trait]
pub trait ProjectionRepository: Send + Sync {
    /// Cycles and grade levels of the version.
    async fn load_catalog(&self, version_id: VersionId) -> Result<GradeCatalog, StoreError>;

    /// Base headcounts of the version.
    async fn load_base_enrollment(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<BaseEnrollment>, StoreError>;

    /// Committed config, if one was ever applied.
    async fn load_config(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionConfig>, StoreError>;

    /// Pending draft, if any.
    async fn load_draft(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionDraft>, StoreError>;

    /// Replaces the draft wholesale.
    async fn save_draft(
        &self,
        draft: &ProjectionDraft,
        expected: VersionStatus,
    ) -> Result<(), StoreError>;

    /// Commits config and results and deletes the draft in one atomic step.
    async fn commit_apply(
        &self,
        config: &ProjectionConfig,
        results: &ProjectionResults,
        expected: VersionStatus,
    ) -> Result<(), StoreError>;

    /// Last committed results.
    async fn load_results(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionResults>, StoreError>;

    /// Sets the validated flag and replaces the stale downstream modules.
    async fn set_validation(
        &self,
        version_id: VersionId,
        validated: bool,
        validated_at: Option<DateTime<Utc>>,
        stale_modules: &[PlanningModule],
        expected: VersionStatus,
    ) -> Result<(), StoreError>;

    /// Downstream modules flagged for recomputation.
    async fn stale_modules(&self, version_id: VersionId)
    -> Result<Vec<PlanningModule>, StoreError>;
}
