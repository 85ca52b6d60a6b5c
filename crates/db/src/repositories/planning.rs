//! Planning module adapters over the `planning_records` table.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use schoolplan_core::error::StoreError;
use schoolplan_core::planning::{
    AdapterError, ModuleAdapters, PlanningModule, PlanningModuleAdapter, PlanningRecord,
};
use schoolplan_shared::types::VersionId;

use super::convert::{record_from_model, record_to_active};
use super::{PgStore, db_err};
use crate::entities::planning_records;

/// Reads one module's committed records.
#[derive(Debug, Clone)]
pub struct PgPlanningAdapter {
    db: DatabaseConnection,
    module: PlanningModule,
}

impl PgPlanningAdapter {
    /// Creates an adapter for `module`.
    #[must_use]
    pub const fn new(db: DatabaseConnection, module: PlanningModule) -> Self {
        Self { db, module }
    }
}

#[async_trait]
impl PlanningModuleAdapter for PgPlanningAdapter {
    fn module(&self) -> PlanningModule {
        self.module
    }

    async fn list_records(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningRecord>, AdapterError> {
        let rows = planning_records::Entity::find()
            .filter(planning_records::Column::VersionId.eq(version_id.into_inner()))
            .filter(planning_records::Column::Module.eq(self.module.as_str()))
            .order_by_asc(planning_records::Column::Position)
            .all(&self.db)
            .await
            .map_err(|e| AdapterError::Unavailable {
                module: self.module,
                message: e.to_string(),
            })?;

        rows.into_iter()
            .map(|row| {
                record_from_model(row).map_err(|e| AdapterError::Malformed {
                    module: self.module,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

impl PgStore {
    /// One adapter per planning module, sharing this store's pool.
    #[must_use]
    pub fn adapters(&self) -> ModuleAdapters {
        ModuleAdapters::from_fn(|module| {
            Arc::new(PgPlanningAdapter::new(self.db.clone(), module))
                as Arc<dyn PlanningModuleAdapter>
        })
    }

    /// Replaces a module's records for a version.
    pub async fn replace_records(
        &self,
        version_id: VersionId,
        module: PlanningModule,
        records: &[PlanningRecord],
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        planning_records::Entity::delete_many()
            .filter(planning_records::Column::VersionId.eq(version_id.into_inner()))
            .filter(planning_records::Column::Module.eq(module.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if !records.is_empty() {
            planning_records::Entity::insert_many(
                (0u32..)
                    .zip(records)
                    .map(|(position, r)| record_to_active(version_id, module, position, r)),
            )
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)
    }
}
