//! Budget version persistence.
//!
//! Status changes are compare-and-swap updates guarded by
//! `WHERE status = $expected`.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use schoolplan_core::error::StoreError;
use schoolplan_core::version::{BudgetVersion, VersionFilter, VersionRepository};
use schoolplan_core::workflow::{StatusTransition, VersionStatus};
use schoolplan_shared::types::{PageRequest, VersionId};

use super::convert::{parse_status, version_from_model, version_to_active};
use super::{PgStore, db_err};
use crate::entities::{
    base_enrollments, budget_versions, planning_records, projection_configs, school_cycles,
    school_grades,
};

/// Explains why a guarded update touched no row.
async fn cas_failure<C: ConnectionTrait>(
    conn: &C,
    id: VersionId,
    expected: VersionStatus,
) -> StoreError {
    match budget_versions::Entity::find_by_id(id.into_inner()).one(conn).await {
        Ok(Some(row)) => match parse_status(&row.status) {
            Ok(actual) => StoreError::StatusMismatch {
                version_id: id,
                expected,
                actual,
            },
            Err(e) => e,
        },
        Ok(None) => StoreError::version_not_found(id),
        Err(e) => db_err(e),
    }
}

/// Locks the version row (`SELECT ... FOR UPDATE`) and checks its status.
///
/// Call inside a transaction: status transitions on the same row block
/// until the caller commits or rolls back.
pub(super) async fn lock_status<C: ConnectionTrait>(
    conn: &C,
    id: VersionId,
    expected: VersionStatus,
) -> Result<(), StoreError> {
    let row = budget_versions::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::version_not_found(id))?;
    let actual = parse_status(&row.status)?;
    if actual != expected {
        return Err(StoreError::StatusMismatch {
            version_id: id,
            expected,
            actual,
        });
    }
    Ok(())
}

async fn guarded_update<C: ConnectionTrait>(
    conn: &C,
    version: &BudgetVersion,
    expected: VersionStatus,
) -> Result<(), StoreError> {
    let result = budget_versions::Entity::update_many()
        .set(version_to_active(version))
        .filter(budget_versions::Column::Id.eq(version.id.into_inner()))
        .filter(budget_versions::Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await
        .map_err(db_err)?;
    if result.rows_affected == 0 {
        return Err(cas_failure(conn, version.id, expected).await);
    }
    Ok(())
}

#[async_trait]
impl VersionRepository for PgStore {
    async fn insert(&self, version: &BudgetVersion) -> Result<(), StoreError> {
        version_to_active(version)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, id: VersionId) -> Result<Option<BudgetVersion>, StoreError> {
        budget_versions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(version_from_model)
            .transpose()
    }

    async fn list(
        &self,
        filter: VersionFilter,
        page: PageRequest,
    ) -> Result<(Vec<BudgetVersion>, u64), StoreError> {
        let mut query = budget_versions::Entity::find();
        if let Some(year) = filter.fiscal_year {
            query = query.filter(budget_versions::Column::FiscalYear.eq(year));
        }
        if let Some(status) = filter.status {
            query = query.filter(budget_versions::Column::Status.eq(status.as_str()));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let rows = query
            .order_by_desc(budget_versions::Column::CreatedAt)
            .order_by_desc(budget_versions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let versions = rows
            .into_iter()
            .map(version_from_model)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((versions, total))
    }

    async fn update(
        &self,
        version: &BudgetVersion,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        guarded_update(&self.db, version, expected).await
    }

    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
    ) -> Result<Vec<BudgetVersion>, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();
        let mut updated = Vec::with_capacity(transitions.len());

        for t in transitions {
            let row = budget_versions::Entity::find_by_id(t.version_id.into_inner())
                .one(&txn)
                .await
                .map_err(db_err)?
                .ok_or_else(|| StoreError::version_not_found(t.version_id))?;
            let mut version = version_from_model(row)?;
            version.apply_action(&t.action, now);
            // Dropping `txn` on error rolls the whole batch back.
            guarded_update(&txn, &version, t.expected).await?;
            updated.push(version);
        }

        txn.commit().await.map_err(db_err)?;
        Ok(updated)
    }

    async fn activate(
        &self,
        id: VersionId,
        expected: VersionStatus,
    ) -> Result<BudgetVersion, StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let row = budget_versions::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::version_not_found(id))?;

        // Clear the year first: a partial unique index allows one active row.
        budget_versions::Entity::update_many()
            .col_expr(budget_versions::Column::IsActive, Expr::value(false))
            .filter(budget_versions::Column::FiscalYear.eq(row.fiscal_year))
            .filter(budget_versions::Column::IsActive.eq(true))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = budget_versions::Entity::update_many()
            .col_expr(budget_versions::Column::IsActive, Expr::value(true))
            .col_expr(budget_versions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(budget_versions::Column::Id.eq(id.into_inner()))
            .filter(budget_versions::Column::Status.eq(expected.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(cas_failure(&txn, id, expected).await);
        }

        let row = budget_versions::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::version_not_found(id))?;
        txn.commit().await.map_err(db_err)?;
        version_from_model(row)
    }

    async fn delete(&self, id: VersionId, expected: VersionStatus) -> Result<(), StoreError> {
        // Child rows go with ON DELETE CASCADE.
        let result = budget_versions::Entity::delete_many()
            .filter(budget_versions::Column::Id.eq(id.into_inner()))
            .filter(budget_versions::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(cas_failure(&self.db, id, expected).await);
        }
        Ok(())
    }

    async fn clone_version(
        &self,
        source: VersionId,
        clone: &BudgetVersion,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let src = source.into_inner();
        let dst = clone.id.into_inner();

        if budget_versions::Entity::find_by_id(src)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_none()
        {
            return Err(StoreError::version_not_found(source));
        }
        version_to_active(clone).insert(&txn).await.map_err(db_err)?;

        let records = planning_records::Entity::find()
            .filter(planning_records::Column::VersionId.eq(src))
            .all(&txn)
            .await
            .map_err(db_err)?;
        if !records.is_empty() {
            planning_records::Entity::insert_many(records.into_iter().map(|r| {
                planning_records::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    version_id: Set(dst),
                    module: Set(r.module),
                    position: Set(r.position),
                    account_code: Set(r.account_code),
                    account_name: Set(r.account_name),
                    category: Set(r.category),
                    amount_sar: Set(r.amount_sar),
                    amount_t1: Set(r.amount_t1),
                    amount_t2: Set(r.amount_t2),
                    amount_t3: Set(r.amount_t3),
                    useful_life_years: Set(r.useful_life_years),
                    notes: Set(r.notes),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        // Catalogue ids are kept so committed overrides still resolve.
        let cycles = school_cycles::Entity::find()
            .filter(school_cycles::Column::VersionId.eq(src))
            .all(&txn)
            .await
            .map_err(db_err)?;
        if !cycles.is_empty() {
            school_cycles::Entity::insert_many(cycles.into_iter().map(|c| {
                school_cycles::ActiveModel {
                    version_id: Set(dst),
                    id: Set(c.id),
                    code: Set(c.code),
                    name: Set(c.name),
                    sort_order: Set(c.sort_order),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        let grades = school_grades::Entity::find()
            .filter(school_grades::Column::VersionId.eq(src))
            .all(&txn)
            .await
            .map_err(db_err)?;
        if !grades.is_empty() {
            school_grades::Entity::insert_many(grades.into_iter().map(|g| {
                school_grades::ActiveModel {
                    version_id: Set(dst),
                    id: Set(g.id),
                    code: Set(g.code),
                    name: Set(g.name),
                    cycle_id: Set(g.cycle_id),
                    sort_order: Set(g.sort_order),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        let base = base_enrollments::Entity::find()
            .filter(base_enrollments::Column::VersionId.eq(src))
            .all(&txn)
            .await
            .map_err(db_err)?;
        if !base.is_empty() {
            base_enrollments::Entity::insert_many(base.into_iter().map(|b| {
                base_enrollments::ActiveModel {
                    version_id: Set(dst),
                    level_id: Set(b.level_id),
                    student_count: Set(b.student_count),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        if let Some(config) = projection_configs::Entity::find_by_id(src)
            .one(&txn)
            .await
            .map_err(db_err)?
        {
            projection_configs::ActiveModel {
                version_id: Set(dst),
                overrides: Set(config.overrides),
                horizon_years: Set(config.horizon_years),
                validated: Set(false),
                validated_at: Set(None),
                stale_modules: Set(serde_json::json!([])),
                draft: Set(None),
                draft_saved_at: Set(None),
                updated_at: Set(clone.created_at.into()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        tracing::debug!(source = %source, clone = %clone.id, "Copied version planning data");
        Ok(())
    }
}
