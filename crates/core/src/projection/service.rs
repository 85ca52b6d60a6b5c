//! Enrollment projection service: draft edits, apply and validation.
//!
//! Draft writes are cheap whole-document overwrites and never touch
//! results. Apply is the only path that recomputes, and it holds a
//! per-version lock for the duration.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use schoolplan_shared::types::{CycleId, LevelId, VersionId};

use crate::locks::VersionLocks;
use crate::planning::PlanningModule;
use crate::projection::cascade::validate_overrides;
use crate::projection::engine::ProjectionEngine;
use crate::projection::error::ProjectionError;
use crate::projection::optimizer::optimize_lateral_entry;
use crate::projection::repository::ProjectionRepository;
use crate::projection::types::{
    FieldOverrides, LateralOptimization, LevelOverride, OverrideSet, ProjectionConfig,
    ProjectionConfigView, ProjectionDraft, ProjectionResults,
};
use crate::version::VersionService;

/// Modules that consume projected enrollment.
pub const DOWNSTREAM_MODULES: [PlanningModule; 2] =
    [PlanningModule::ClassStructure, PlanningModule::Dhg];

/// Enrollment projection service.
#[derive(Clone)]
pub struct ProjectionService {
    versions: VersionService,
    repo: Arc<dyn ProjectionRepository>,
    apply_locks: VersionLocks,
}

impl ProjectionService {
    /// Create a new projection service.
    #[must_use]
    pub fn new(versions: VersionService, repo: Arc<dyn ProjectionRepository>) -> Self {
        Self {
            versions,
            repo,
            apply_locks: VersionLocks::new(),
        }
    }

    async fn committed_config(&self, id: VersionId) -> Result<ProjectionConfig, ProjectionError> {
        Ok(self
            .repo
            .load_config(id)
            .await?
            .unwrap_or_else(|| ProjectionConfig::empty(id, Utc::now())))
    }

    /// Overrides currently being edited: the draft, else the committed set.
    async fn working_overrides(&self, id: VersionId) -> Result<OverrideSet, ProjectionError> {
        if let Some(draft) = self.repo.load_draft(id).await? {
            return Ok(draft.overrides);
        }
        Ok(self.committed_config(id).await?.overrides)
    }

    /// Returns the committed config with draft, catalogue and results state.
    pub async fn get_config(&self, id: VersionId) -> Result<ProjectionConfigView, ProjectionError> {
        self.versions.get(id).await?;
        Ok(ProjectionConfigView {
            config: self.committed_config(id).await?,
            draft: self.repo.load_draft(id).await?,
            catalog: self.repo.load_catalog(id).await?,
            base_enrollment: self.repo.load_base_enrollment(id).await?,
            has_results: self.repo.load_results(id).await?.is_some(),
            stale_modules: self.repo.stale_modules(id).await?,
        })
    }

    /// Overwrites the draft with `overrides`. Never recomputes.
    ///
    /// Concurrent saves race; the last write wins.
    pub async fn save_draft(
        &self,
        id: VersionId,
        overrides: OverrideSet,
    ) -> Result<ProjectionDraft, ProjectionError> {
        let version = self.versions.ensure_editable(id).await?;
        let catalog = self.repo.load_catalog(id).await?;
        validate_overrides(&overrides, &catalog)?;

        let draft = ProjectionDraft {
            version_id: id,
            overrides,
            saved_at: Utc::now(),
        };
        self.repo.save_draft(&draft, version.status).await?;
        debug!(version_id = %id, "Projection draft saved");
        Ok(draft)
    }

    /// Replaces the global tier of the draft.
    pub async fn update_global_overrides(
        &self,
        id: VersionId,
        global: FieldOverrides,
    ) -> Result<ProjectionDraft, ProjectionError> {
        self.versions.ensure_editable(id).await?;
        let mut overrides = self.working_overrides(id).await?;
        overrides.global_overrides = global;
        self.save_draft(id, overrides).await
    }

    /// Writes cycle overrides into the draft. An empty entry clears its cycle.
    pub async fn update_level_overrides(
        &self,
        id: VersionId,
        updates: BTreeMap<CycleId, LevelOverride>,
    ) -> Result<ProjectionDraft, ProjectionError> {
        self.versions.ensure_editable(id).await?;
        let mut overrides = self.working_overrides(id).await?;
        for (cycle_id, update) in updates {
            if update.class_size_ceiling.is_none() && update.max_divisions.is_none() {
                overrides.level_overrides.remove(&cycle_id);
            } else {
                overrides.level_overrides.insert(cycle_id, update);
            }
        }
        self.save_draft(id, overrides).await
    }

    /// Writes grade overrides into the draft. An empty entry clears its grade.
    pub async fn update_grade_overrides(
        &self,
        id: VersionId,
        updates: BTreeMap<LevelId, FieldOverrides>,
    ) -> Result<ProjectionDraft, ProjectionError> {
        self.versions.ensure_editable(id).await?;
        let mut overrides = self.working_overrides(id).await?;
        for (level_id, update) in updates {
            if update.is_empty() {
                overrides.grade_overrides.remove(&level_id);
            } else {
                overrides.grade_overrides.insert(level_id, update);
            }
        }
        self.save_draft(id, overrides).await
    }

    /// Commits `updates` (or the stored draft) and recomputes results.
    ///
    /// All-or-nothing: config, results and draft removal commit together.
    /// The committed config comes back unvalidated.
    ///
    /// # Errors
    ///
    /// `ApplyInProgress` when another apply holds the version; `NotEditable`
    /// when the version leaves WORKING before the commit. Validation and
    /// configuration errors from the engine leave everything untouched.
    pub async fn apply_and_calculate(
        &self,
        id: VersionId,
        updates: Option<OverrideSet>,
        horizon_years: Option<u8>,
    ) -> Result<ProjectionResults, ProjectionError> {
        let _guard = self
            .apply_locks
            .try_acquire(id)
            .ok_or(ProjectionError::ApplyInProgress(id))?;
        let version = self.versions.ensure_editable(id).await?;

        let mut config = self.committed_config(id).await?;
        let overrides = match updates {
            Some(overrides) => overrides,
            None => self.working_overrides(id).await?,
        };
        let horizon = horizon_years.unwrap_or(config.horizon_years);

        let catalog = self.repo.load_catalog(id).await?;
        let base = self.repo.load_base_enrollment(id).await?;
        let results = ProjectionEngine::calculate(id, &catalog, &base, &overrides, horizon)?;

        let now = Utc::now();
        config.overrides = overrides;
        config.horizon_years = horizon;
        config.validated = false;
        config.validated_at = None;
        config.updated_at = now;
        self.repo
            .commit_apply(&config, &results, version.status)
            .await?;

        info!(
            version_id = %id,
            grades = catalog.levels.len(),
            horizon_years = horizon,
            unmet_demand = results.total_unmet_demand(),
            "Enrollment projection applied"
        );
        Ok(results)
    }

    /// Marks the committed projection validated and flags downstream
    /// modules for recomputation.
    ///
    /// # Errors
    ///
    /// `ConfirmationRequired` without confirmation, `NoResults` before the
    /// first apply.
    pub async fn validate(
        &self,
        id: VersionId,
        confirmation: bool,
    ) -> Result<ProjectionConfig, ProjectionError> {
        if !confirmation {
            return Err(ProjectionError::ConfirmationRequired);
        }
        let version = self.versions.ensure_editable(id).await?;
        if self.repo.load_results(id).await?.is_none() {
            return Err(ProjectionError::NoResults(id));
        }

        let now = Utc::now();
        let mut stale = self.repo.stale_modules(id).await?;
        for module in DOWNSTREAM_MODULES {
            if !stale.contains(&module) {
                stale.push(module);
            }
        }
        stale.sort();
        self.repo
            .set_validation(id, true, Some(now), &stale, version.status)
            .await?;

        info!(
            version_id = %id,
            stale_modules = ?stale,
            "Enrollment projection validated; downstream modules flagged"
        );
        let mut config = self.committed_config(id).await?;
        config.validated = true;
        config.validated_at = Some(now);
        Ok(config)
    }

    /// Clears the validated flag. Downstream stale flags are kept.
    pub async fn unvalidate(&self, id: VersionId) -> Result<ProjectionConfig, ProjectionError> {
        let version = self.versions.ensure_editable(id).await?;
        let stale = self.repo.stale_modules(id).await?;
        self.repo
            .set_validation(id, false, None, &stale, version.status)
            .await?;
        info!(version_id = %id, "Enrollment projection unvalidated");
        let mut config = self.committed_config(id).await?;
        config.validated = false;
        config.validated_at = None;
        Ok(config)
    }

    /// Lateral-entry recommendations for the overrides being edited.
    pub async fn lateral_optimization(
        &self,
        id: VersionId,
    ) -> Result<Vec<LateralOptimization>, ProjectionError> {
        self.versions.get(id).await?;
        let overrides = self.working_overrides(id).await?;
        let catalog = self.repo.load_catalog(id).await?;
        let base = self.repo.load_base_enrollment(id).await?;
        optimize_lateral_entry(&catalog, &base, &overrides)
    }

    /// Last committed results.
    pub async fn get_results(&self, id: VersionId) -> Result<ProjectionResults, ProjectionError> {
        self.versions.get(id).await?;
        self.repo
            .load_results(id)
            .await?
            .ok_or(ProjectionError::NoResults(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeStore;
    use crate::version::{CreateVersionInput, ScenarioType};
    use crate::workflow::VersionStatus;
    use rust_decimal_macros::dec;

    async fn setup() -> (Arc<FakeStore>, ProjectionService, VersionId) {
        let store = Arc::new(FakeStore::default());
        let versions = VersionService::new(store.clone(), Arc::new(store.adapters()));
        let version = versions
            .create(CreateVersionInput {
                name: "Budget 2026".into(),
                fiscal_year: 2026,
                academic_year: "2025-2026".into(),
                scenario_type: ScenarioType::Budget,
                notes: None,
            })
            .await
            .unwrap();
        store.seed_grades(version.id, &[("6EME", 40), ("5EME", 60)]);
        (store.clone(), ProjectionService::new(versions, store), version.id)
    }

    fn grade(store: &FakeStore, id: VersionId, code: &str) -> LevelId {
        store.level_id(id, code).unwrap()
    }

    fn scenario_override() -> FieldOverrides {
        FieldOverrides {
            retention_rate: Some(dec!(0.9)),
            lateral_entry: Some(5),
            class_size_ceiling: Some(25),
            max_divisions: Some(2),
        }
    }

    #[tokio::test]
    async fn test_apply_two_grade_scenario() {
        let (store, svc, id) = setup().await;
        let a = grade(&store, id, "6EME");
        let b = grade(&store, id, "5EME");

        svc.update_grade_overrides(id, BTreeMap::from([(a, scenario_override()), (b, scenario_override())]))
            .await
            .unwrap();
        let results = svc.apply_and_calculate(id, None, None).await.unwrap();

        let ra = results.grade(a, 1).unwrap();
        assert_eq!(ra.projected, 41);
        assert_eq!(ra.unmet_demand, 0);
        let rb = results.grade(b, 1).unwrap();
        assert_eq!(rb.projected, 50);
        assert_eq!(rb.unmet_demand, 9);
        assert!(rb.warning.is_some());
    }

    #[tokio::test]
    async fn test_draft_never_touches_results() {
        let (store, svc, id) = setup().await;
        let a = grade(&store, id, "6EME");

        let first = svc.apply_and_calculate(id, None, None).await.unwrap();
        for ceiling in [10, 12, 14] {
            svc.update_grade_overrides(
                id,
                BTreeMap::from([(
                    a,
                    FieldOverrides {
                        class_size_ceiling: Some(ceiling),
                        ..FieldOverrides::default()
                    },
                )]),
            )
            .await
            .unwrap();
        }
        assert_eq!(svc.get_results(id).await.unwrap(), first);

        let view = svc.get_config(id).await.unwrap();
        assert!(view.draft.is_some());
        assert!(view.config.overrides.grade_overrides.is_empty());

        let applied = svc.apply_and_calculate(id, None, None).await.unwrap();
        assert_ne!(applied, first);
        assert_eq!(applied.grade(a, 1).unwrap().parameters.class_size_ceiling, 14);

        let view = svc.get_config(id).await.unwrap();
        assert!(view.draft.is_none());
        assert_eq!(
            view.config.overrides.grade_overrides[&a].class_size_ceiling,
            Some(14)
        );
    }

    #[tokio::test]
    async fn test_tier_updates_start_from_committed_config() {
        let (_store, svc, id) = setup().await;
        let mut committed = OverrideSet::default();
        committed.global_overrides.retention_rate = Some(dec!(0.98));
        svc.apply_and_calculate(id, Some(committed), None)
            .await
            .unwrap();

        let draft = svc
            .update_global_overrides(
                id,
                FieldOverrides {
                    retention_rate: Some(dec!(0.98)),
                    max_divisions: Some(3),
                    ..FieldOverrides::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(draft.overrides.global_overrides.max_divisions, Some(3));
        assert_eq!(
            draft.overrides.global_overrides.retention_rate,
            Some(dec!(0.98))
        );
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected() {
        let (_store, svc, id) = setup().await;
        let err = svc
            .update_global_overrides(
                id,
                FieldOverrides {
                    class_size_ceiling: Some(0),
                    ..FieldOverrides::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidOverride { .. }));

        let err = svc
            .update_grade_overrides(id, BTreeMap::from([(LevelId::new(), scenario_override())]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownGrade(_)));
    }

    #[tokio::test]
    async fn test_concurrent_apply_conflicts() {
        let (_store, svc, id) = setup().await;
        let _held = svc.apply_locks.try_acquire(id).unwrap();

        let err = svc.apply_and_calculate(id, None, None).await.unwrap_err();
        assert!(matches!(err, ProjectionError::ApplyInProgress(v) if v == id));
        assert_eq!(err.status_code(), 409);
    }

    #[tokio::test]
    async fn test_validate_requires_confirmation_and_results() {
        let (_store, svc, id) = setup().await;
        assert!(matches!(
            svc.validate(id, false).await,
            Err(ProjectionError::ConfirmationRequired)
        ));
        assert!(matches!(
            svc.validate(id, true).await,
            Err(ProjectionError::NoResults(_))
        ));

        svc.apply_and_calculate(id, None, None).await.unwrap();
        let config = svc.validate(id, true).await.unwrap();
        assert!(config.validated);

        let view = svc.get_config(id).await.unwrap();
        assert!(view.config.validated);
        assert_eq!(
            view.stale_modules,
            vec![PlanningModule::ClassStructure, PlanningModule::Dhg]
        );
    }

    #[tokio::test]
    async fn test_unvalidate_keeps_stale_flags() {
        let (_store, svc, id) = setup().await;
        svc.apply_and_calculate(id, None, None).await.unwrap();
        svc.validate(id, true).await.unwrap();

        let config = svc.unvalidate(id).await.unwrap();
        assert!(!config.validated);
        let view = svc.get_config(id).await.unwrap();
        assert!(!view.config.validated);
        assert_eq!(view.stale_modules.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_resets_validation() {
        let (_store, svc, id) = setup().await;
        svc.apply_and_calculate(id, None, None).await.unwrap();
        svc.validate(id, true).await.unwrap();

        svc.apply_and_calculate(id, None, Some(3)).await.unwrap();
        let view = svc.get_config(id).await.unwrap();
        assert!(!view.config.validated);
        assert_eq!(view.config.horizon_years, 3);
    }

    #[tokio::test]
    async fn test_frozen_version_refuses_writes() {
        let (store, svc, id) = setup().await;
        store.force_status(id, VersionStatus::Submitted);

        assert!(matches!(
            svc.save_draft(id, OverrideSet::default()).await,
            Err(ProjectionError::NotEditable { .. })
        ));
        assert!(matches!(
            svc.apply_and_calculate(id, None, None).await,
            Err(ProjectionError::NotEditable { .. })
        ));
        // Reads still work.
        assert!(svc.get_config(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_before_draft_write_is_refused() {
        let (store, svc, id) = setup().await;
        let a = grade(&store, id, "6EME");
        store.force_status_on_catalog_load(id, VersionStatus::Submitted);

        let err = svc
            .update_grade_overrides(id, BTreeMap::from([(a, scenario_override())]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::NotEditable { status: VersionStatus::Submitted, .. }
        ));
        assert!(svc.get_config(id).await.unwrap().draft.is_none());
    }

    #[tokio::test]
    async fn test_submit_before_apply_commit_keeps_results() {
        let (store, svc, id) = setup().await;
        let first = svc.apply_and_calculate(id, None, None).await.unwrap();

        let mut overrides = OverrideSet::default();
        overrides.global_overrides.retention_rate = Some(dec!(0.5));
        store.force_status_on_catalog_load(id, VersionStatus::Submitted);
        let err = svc
            .apply_and_calculate(id, Some(overrides), Some(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectionError::NotEditable { .. }));
        assert_eq!(err.status_code(), 409);

        assert_eq!(svc.get_results(id).await.unwrap(), first);
        let view = svc.get_config(id).await.unwrap();
        assert!(view.config.overrides.global_overrides.retention_rate.is_none());
        assert_ne!(view.config.horizon_years, 2);
    }

    #[tokio::test]
    async fn test_lateral_optimization_uses_draft() {
        let (store, svc, id) = setup().await;
        let a = grade(&store, id, "6EME");
        svc.update_grade_overrides(id, BTreeMap::from([(a, scenario_override())]))
            .await
            .unwrap();

        let rows = svc.lateral_optimization(id).await.unwrap();
        let row = rows.iter().find(|r| r.level_id == a).unwrap();
        assert_eq!(row.retained, 36);
        assert_eq!(row.recommended_lateral, 14);
    }

    #[tokio::test]
    async fn test_unknown_version() {
        let (_store, svc, _) = setup().await;
        assert!(matches!(
            svc.get_config(VersionId::new()).await,
            Err(ProjectionError::VersionNotFound(_))
        ));
    }
}
