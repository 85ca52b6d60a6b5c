//! Read-only accessors over the planning modules.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use schoolplan_shared::types::VersionId;

use crate::consolidation::ConsolidationStatus;
use crate::planning::types::{PlanningModule, PlanningRecord};

/// Failure reported by a planning adapter.
///
/// An empty module is never an error; adapters return an empty list.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The module's backing store could not be reached.
    #[error("{module} module unavailable: {message}")]
    Unavailable {
        /// Module that failed.
        module: PlanningModule,
        /// Underlying cause.
        message: String,
    },

    /// The module returned data that cannot be interpreted.
    #[error("{module} module returned malformed data: {message}")]
    Malformed {
        /// Module that failed.
        module: PlanningModule,
        /// What was wrong.
        message: String,
    },
}

/// Accessor for one planning module's committed records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanningModuleAdapter: Send + Sync {
    /// The module this adapter reads.
    fn module(&self) -> PlanningModule;

    /// Lists committed records for a version. Empty when nothing was planned.
    async fn list_records(&self, version_id: VersionId)
    -> Result<Vec<PlanningRecord>, AdapterError>;
}

/// Exactly one adapter per planning module.
#[derive(Clone)]
pub struct ModuleAdapters {
    adapters: Vec<Arc<dyn PlanningModuleAdapter>>,
}

impl std::fmt::Debug for ModuleAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.adapters.iter().map(|a| a.module()))
            .finish()
    }
}

impl ModuleAdapters {
    /// Builds the set by asking `factory` for each module in planning order.
    pub fn from_fn(mut factory: impl FnMut(PlanningModule) -> Arc<dyn PlanningModuleAdapter>) -> Self {
        let adapters = PlanningModule::ALL
            .iter()
            .map(|module| {
                let adapter = factory(*module);
                debug_assert_eq!(adapter.module(), *module);
                adapter
            })
            .collect();
        Self { adapters }
    }

    /// Returns the adapter for `module`.
    #[must_use]
    pub fn get(&self, module: PlanningModule) -> &Arc<dyn PlanningModuleAdapter> {
        &self.adapters[module.index()]
    }

    /// Pulls every module's records, in planning order.
    ///
    /// Stops at the first failing adapter.
    pub async fn pull_all(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<(PlanningModule, Vec<PlanningRecord>)>, AdapterError> {
        let mut pulled = Vec::with_capacity(self.adapters.len());
        for module in PlanningModule::ALL {
            let records = self.get(module).list_records(version_id).await?;
            pulled.push((module, records));
        }
        Ok(pulled)
    }

    /// Recomputes per-module completeness from live module data.
    pub async fn completeness(
        &self,
        version_id: VersionId,
    ) -> Result<ConsolidationStatus, AdapterError> {
        let pulled = self.pull_all(version_id).await?;
        Ok(ConsolidationStatus::from_records(version_id, &pulled))
    }
}
