//! Consolidation run persistence.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};

use schoolplan_core::consolidation::{
    ConsolidationLineItem, ConsolidationRepository, ConsolidationRun,
};
use schoolplan_core::error::StoreError;
use schoolplan_core::workflow::VersionStatus;
use schoolplan_shared::types::VersionId;

use super::convert::{line_item_from_model, line_item_to_active, to_i32, utc};
use super::version::lock_status;
use super::{PgStore, db_err};
use crate::entities::{consolidation_line_items, consolidation_runs};

#[async_trait]
impl ConsolidationRepository for PgStore {
    async fn replace_line_items(
        &self,
        run: &ConsolidationRun,
        items: &[ConsolidationLineItem],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let version = run.version_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;
        lock_status(&txn, run.version_id, expected).await?;

        consolidation_line_items::Entity::delete_many()
            .filter(consolidation_line_items::Column::VersionId.eq(version))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !items.is_empty() {
            consolidation_line_items::Entity::insert_many(
                (0u32..)
                    .zip(items)
                    .map(|(position, item)| line_item_to_active(run.version_id, position, item)),
            )
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        consolidation_runs::Entity::insert(consolidation_runs::ActiveModel {
            version_id: Set(version),
            fingerprint: Set(run.fingerprint.clone()),
            is_complete: Set(run.is_complete),
            line_item_count: Set(to_i32(run.line_item_count)),
            consolidated_at: Set(run.consolidated_at.into()),
        })
        .on_conflict(
            OnConflict::column(consolidation_runs::Column::VersionId)
                .update_columns([
                    consolidation_runs::Column::Fingerprint,
                    consolidation_runs::Column::IsComplete,
                    consolidation_runs::Column::LineItemCount,
                    consolidation_runs::Column::ConsolidatedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        tracing::debug!(
            version_id = %run.version_id,
            line_items = items.len(),
            "Replaced consolidation line items"
        );
        Ok(())
    }

    async fn load(
        &self,
        version_id: VersionId,
    ) -> Result<Option<(ConsolidationRun, Vec<ConsolidationLineItem>)>, StoreError> {
        let Some(run) = consolidation_runs::Entity::find_by_id(version_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let items = consolidation_line_items::Entity::find()
            .filter(consolidation_line_items::Column::VersionId.eq(version_id.into_inner()))
            .order_by_asc(consolidation_line_items::Column::Position)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(line_item_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        let run = ConsolidationRun {
            version_id,
            fingerprint: run.fingerprint,
            is_complete: run.is_complete,
            line_item_count: u32::try_from(run.line_item_count)
                .map_err(|_| StoreError::Corrupt("negative line_item_count".to_string()))?,
            consolidated_at: utc(run.consolidated_at),
        };
        Ok(Some((run, items)))
    }
}
