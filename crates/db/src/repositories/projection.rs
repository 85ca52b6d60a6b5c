//! Enrollment projection persistence.
//!
//! The committed overrides and the draft share one `projection_configs`
//! row; results are a JSONB snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;

use schoolplan_core::error::StoreError;
use schoolplan_core::workflow::VersionStatus;
use schoolplan_core::planning::PlanningModule;
use schoolplan_core::projection::{
    BaseEnrollment, Cycle, GradeCatalog, GradeLevel, ProjectionConfig, ProjectionDraft,
    ProjectionRepository, ProjectionResults,
};
use schoolplan_shared::types::{CycleId, LevelId, VersionId};

use super::convert::{to_i32, utc};
use super::version::lock_status;
use super::{PgStore, db_err};
use crate::entities::{
    base_enrollments, projection_configs, projection_results, school_cycles, school_grades,
};

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}

impl PgStore {
    /// Replaces the grade catalogue and base enrollment of a version.
    pub async fn replace_catalog(
        &self,
        version_id: VersionId,
        catalog: &GradeCatalog,
        base: &[BaseEnrollment],
    ) -> Result<(), StoreError> {
        let version = version_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;

        base_enrollments::Entity::delete_many()
            .filter(base_enrollments::Column::VersionId.eq(version))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        school_grades::Entity::delete_many()
            .filter(school_grades::Column::VersionId.eq(version))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        school_cycles::Entity::delete_many()
            .filter(school_cycles::Column::VersionId.eq(version))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !catalog.cycles.is_empty() {
            school_cycles::Entity::insert_many(catalog.cycles.iter().map(|c| {
                school_cycles::ActiveModel {
                    version_id: Set(version),
                    id: Set(c.id.into_inner()),
                    code: Set(c.code.clone()),
                    name: Set(c.name.clone()),
                    sort_order: Set(c.sort_order),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }
        if !catalog.levels.is_empty() {
            school_grades::Entity::insert_many(catalog.levels.iter().map(|l| {
                school_grades::ActiveModel {
                    version_id: Set(version),
                    id: Set(l.id.into_inner()),
                    code: Set(l.code.clone()),
                    name: Set(l.name.clone()),
                    cycle_id: Set(l.cycle_id.map(CycleId::into_inner)),
                    sort_order: Set(l.sort_order),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }
        if !base.is_empty() {
            base_enrollments::Entity::insert_many(base.iter().map(|b| {
                base_enrollments::ActiveModel {
                    version_id: Set(version),
                    level_id: Set(b.level_id.into_inner()),
                    student_count: Set(to_i32(b.student_count)),
                }
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)
    }
}

#[async_trait]
impl ProjectionRepository for PgStore {
    async fn load_catalog(&self, version_id: VersionId) -> Result<GradeCatalog, StoreError> {
        let version = version_id.into_inner();
        let cycles = school_cycles::Entity::find()
            .filter(school_cycles::Column::VersionId.eq(version))
            .order_by_asc(school_cycles::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|c| Cycle {
                id: CycleId::from_uuid(c.id),
                code: c.code,
                name: c.name,
                sort_order: c.sort_order,
            })
            .collect();
        let levels = school_grades::Entity::find()
            .filter(school_grades::Column::VersionId.eq(version))
            .order_by_asc(school_grades::Column::SortOrder)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|g| GradeLevel {
                id: LevelId::from_uuid(g.id),
                code: g.code,
                name: g.name,
                cycle_id: g.cycle_id.map(CycleId::from_uuid),
                sort_order: g.sort_order,
            })
            .collect();
        Ok(GradeCatalog { cycles, levels })
    }

    async fn load_base_enrollment(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<BaseEnrollment>, StoreError> {
        base_enrollments::Entity::find()
            .filter(base_enrollments::Column::VersionId.eq(version_id.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|b| {
                Ok(BaseEnrollment {
                    level_id: LevelId::from_uuid(b.level_id),
                    student_count: u32::try_from(b.student_count).map_err(|_| {
                        StoreError::Corrupt(format!("negative headcount for {}", b.level_id))
                    })?,
                })
            })
            .collect()
    }

    async fn load_config(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionConfig>, StoreError> {
        let Some(row) = projection_configs::Entity::find_by_id(version_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        Ok(Some(ProjectionConfig {
            version_id,
            overrides: from_json(row.overrides)?,
            horizon_years: u8::try_from(row.horizon_years)
                .map_err(|_| StoreError::Corrupt(format!("horizon {}", row.horizon_years)))?,
            validated: row.validated,
            validated_at: row.validated_at.map(utc),
            updated_at: utc(row.updated_at),
        }))
    }

    async fn load_draft(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionDraft>, StoreError> {
        let row = projection_configs::Entity::find_by_id(version_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let Some((draft, saved_at)) = row.and_then(|r| r.draft.zip(r.draft_saved_at)) else {
            return Ok(None);
        };
        Ok(Some(ProjectionDraft {
            version_id,
            overrides: from_json(draft)?,
            saved_at: utc(saved_at),
        }))
    }

    async fn save_draft(
        &self,
        draft: &ProjectionDraft,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let saved_at = draft.saved_at.into();
        let txn = self.db.begin().await.map_err(db_err)?;
        lock_status(&txn, draft.version_id, expected).await?;

        projection_configs::Entity::insert(projection_configs::ActiveModel {
            version_id: Set(draft.version_id.into_inner()),
            overrides: Set(serde_json::json!({})),
            horizon_years: Set(i16::from(schoolplan_core::projection::DEFAULT_HORIZON_YEARS)),
            validated: Set(false),
            validated_at: Set(None),
            stale_modules: Set(serde_json::json!([])),
            draft: Set(Some(to_json(&draft.overrides)?)),
            draft_saved_at: Set(Some(saved_at)),
            updated_at: Set(saved_at),
        })
        .on_conflict(
            OnConflict::column(projection_configs::Column::VersionId)
                .update_columns([
                    projection_configs::Column::Draft,
                    projection_configs::Column::DraftSavedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)
    }

    async fn commit_apply(
        &self,
        config: &ProjectionConfig,
        results: &ProjectionResults,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let version = config.version_id.into_inner();
        let txn = self.db.begin().await.map_err(db_err)?;
        lock_status(&txn, config.version_id, expected).await?;

        projection_configs::Entity::insert(projection_configs::ActiveModel {
            version_id: Set(version),
            overrides: Set(to_json(&config.overrides)?),
            horizon_years: Set(i16::from(config.horizon_years)),
            validated: Set(config.validated),
            validated_at: Set(config.validated_at.map(Into::into)),
            stale_modules: Set(serde_json::json!([])),
            draft: Set(None),
            draft_saved_at: Set(None),
            updated_at: Set(config.updated_at.into()),
        })
        .on_conflict(
            OnConflict::column(projection_configs::Column::VersionId)
                .update_columns([
                    projection_configs::Column::Overrides,
                    projection_configs::Column::HorizonYears,
                    projection_configs::Column::Validated,
                    projection_configs::Column::ValidatedAt,
                    projection_configs::Column::StaleModules,
                    projection_configs::Column::Draft,
                    projection_configs::Column::DraftSavedAt,
                    projection_configs::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        projection_results::Entity::insert(projection_results::ActiveModel {
            version_id: Set(version),
            results: Set(to_json(results)?),
            calculated_at: Set(results.calculated_at.into()),
        })
        .on_conflict(
            OnConflict::column(projection_results::Column::VersionId)
                .update_columns([
                    projection_results::Column::Results,
                    projection_results::Column::CalculatedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)
    }

    async fn load_results(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionResults>, StoreError> {
        projection_results::Entity::find_by_id(version_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(|row| from_json(row.results))
            .transpose()
    }

    async fn set_validation(
        &self,
        version_id: VersionId,
        validated: bool,
        validated_at: Option<DateTime<Utc>>,
        stale_modules: &[PlanningModule],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        lock_status(&txn, version_id, expected).await?;

        let result = projection_configs::Entity::update_many()
            .col_expr(projection_configs::Column::Validated, Expr::value(validated))
            .col_expr(projection_configs::Column::ValidatedAt, Expr::value(validated_at))
            .col_expr(
                projection_configs::Column::StaleModules,
                Expr::value(to_json(&stale_modules)?),
            )
            .filter(projection_configs::Column::VersionId.eq(version_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                entity: "projection config",
                id: version_id.to_string(),
            });
        }
        txn.commit().await.map_err(db_err)
    }

    async fn stale_modules(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningModule>, StoreError> {
        projection_configs::Entity::find_by_id(version_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map_or_else(|| Ok(Vec::new()), |row| from_json(row.stale_modules))
    }
}
