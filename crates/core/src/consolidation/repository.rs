//! Consolidation persistence seam.

use async_trait::async_trait;

use schoolplan_shared::types::VersionId;

use crate::consolidation::types::{ConsolidationLineItem, ConsolidationRun};
use crate::error::StoreError;
use crate::workflow::VersionStatus;

/// Storage of consolidation runs and their line items.
#[async_trait]
pub trait ConsolidationRepository: Send + Sync {
    /// Replaces every line item of the run's version and records the run.
    ///
    /// Must be atomic: readers see either the previous set or the new one.
    /// The version status is checked in the same step; if it is no longer
    /// `expected` nothing is written and `StatusMismatch` is returned.
    async fn replace_line_items(
        &self,
        run: &ConsolidationRun,
        items: &[ConsolidationLineItem],
        expected: VersionStatus,
    ) -> Result<(), StoreError>;

    /// Loads the last run and its line items in stored order.
    async fn load(
        &self,
        version_id: VersionId,
    ) -> Result<Option<(ConsolidationRun, Vec<ConsolidationLineItem>)>, StoreError>;
}
