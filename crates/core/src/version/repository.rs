//! Budget version persistence seam.

use async_trait::async_trait;

use schoolplan_shared::types::{PageRequest, VersionId};

use crate::error::StoreError;
use crate::version::types::{BudgetVersion, VersionFilter};
use crate::workflow::{StatusTransition, VersionStatus};

/// Storage of budget versions.
///
/// Every mutation takes the status the caller read and fails with
/// [`StoreError::StatusMismatch`] when the stored status differs.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Inserts a new version.
    async fn insert(&self, version: &BudgetVersion) -> Result<(), StoreError>;

    /// Finds a version by id.
    async fn find(&self, id: VersionId) -> Result<Option<BudgetVersion>, StoreError>;

    /// Lists versions, newest first, with the total match count.
    async fn list(
        &self,
        filter: VersionFilter,
        page: PageRequest,
    ) -> Result<(Vec<BudgetVersion>, u64), StoreError>;

    /// Overwrites name, academic year, notes and `updated_at`.
    async fn update(
        &self,
        version: &BudgetVersion,
        expected: VersionStatus,
    ) -> Result<(), StoreError>;

    /// Applies workflow transitions all-or-nothing and returns the updated rows.
    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
    ) -> Result<Vec<BudgetVersion>, StoreError>;

    /// Marks the version active and clears the flag on its fiscal-year siblings.
    async fn activate(
        &self,
        id: VersionId,
        expected: VersionStatus,
    ) -> Result<BudgetVersion, StoreError>;

    /// Deletes the version with its line items and projection data.
    async fn delete(&self, id: VersionId, expected: VersionStatus) -> Result<(), StoreError>;

    /// Inserts `clone` and copies the source's planning records, grade
    /// catalogue, base enrollment and committed projection config.
    async fn clone_version(
        &self,
        source: VersionId,
        clone: &BudgetVersion,
    ) -> Result<(), StoreError>;
}
