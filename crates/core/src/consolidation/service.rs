//! Consolidation service: status, validation, consolidate and statements.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use schoolplan_shared::types::VersionId;

use crate::consolidation::engine::ConsolidationEngine;
use crate::consolidation::error::ConsolidationError;
use crate::consolidation::repository::ConsolidationRepository;
use crate::consolidation::types::{
    ConsolidatedBudget, ConsolidationRun, ConsolidationStatus, ConsolidationTotals,
    ConsolidationValidation,
};
use crate::locks::VersionLocks;
use crate::planning::ModuleAdapters;
use crate::statements::{
    FinancialStatement, StatementBuilder, StatementCache, StatementFormat, StatementKey,
    StatementPeriod, StatementType,
};
use crate::version::VersionService;

/// Consolidation service.
#[derive(Clone)]
pub struct ConsolidationService {
    versions: VersionService,
    repo: Arc<dyn ConsolidationRepository>,
    adapters: Arc<ModuleAdapters>,
    engine: ConsolidationEngine,
    locks: VersionLocks,
    statements: StatementBuilder,
    cache: StatementCache,
}

impl ConsolidationService {
    /// Create a new consolidation service with default statement settings.
    #[must_use]
    pub fn new(
        versions: VersionService,
        repo: Arc<dyn ConsolidationRepository>,
        adapters: Arc<ModuleAdapters>,
        engine: ConsolidationEngine,
    ) -> Self {
        Self {
            versions,
            repo,
            adapters,
            engine,
            locks: VersionLocks::new(),
            statements: StatementBuilder::default(),
            cache: StatementCache::default(),
        }
    }

    /// Replaces the statement builder and cache.
    #[must_use]
    pub fn with_statements(mut self, builder: StatementBuilder, cache: StatementCache) -> Self {
        self.statements = builder;
        self.cache = cache;
        self
    }

    /// Per-module completeness, recomputed from live module data.
    pub async fn get_status(&self, id: VersionId) -> Result<ConsolidationStatus, ConsolidationError> {
        self.versions.get(id).await?;
        Ok(self.adapters.completeness(id).await?)
    }

    /// Completeness with human-readable errors, warnings and dry-run totals.
    ///
    /// Nothing is written. Mapping problems are reported as errors rather
    /// than returned, so the caller sees every blocking issue at once.
    pub async fn get_validation(
        &self,
        id: VersionId,
    ) -> Result<ConsolidationValidation, ConsolidationError> {
        self.versions.get(id).await?;
        let pulled = self.adapters.pull_all(id).await?;
        let status = ConsolidationStatus::from_records(id, &pulled);

        let mut errors: Vec<String> = status
            .missing_modules()
            .into_iter()
            .map(|module| format!("{} module has no committed records", module.label()))
            .collect();

        let (warnings, totals) = match self.engine.consolidate(id, &pulled) {
            Ok(output) => (ConsolidationEngine::warnings(&output), output.totals),
            Err(err) => {
                errors.push(err.to_string());
                (Vec::new(), ConsolidationTotals::default())
            }
        };

        Ok(ConsolidationValidation {
            version_id: id,
            is_complete: status.is_complete,
            missing_modules: status.missing_modules(),
            errors,
            warnings,
            totals,
        })
    }

    /// Regenerates the version's line items from current module data.
    ///
    /// Runs on one version serialize. Every module is pulled and mapped
    /// before anything is written, so a failing adapter leaves the previous
    /// line items in place. An incomplete version still consolidates, with
    /// partial totals and `is_complete = false`.
    ///
    /// # Errors
    ///
    /// `Frozen` for SUBMITTED, APPROVED and SUPERSEDED versions, including a
    /// version frozen while its modules were being pulled; aggregation
    /// errors from adapters or mapping.
    pub async fn consolidate(&self, id: VersionId) -> Result<ConsolidatedBudget, ConsolidationError> {
        let _guard = self.locks.acquire(id).await;

        let version = self.versions.get(id).await?;
        if version.status.is_frozen() {
            return Err(ConsolidationError::Frozen {
                version_id: id,
                status: version.status,
            });
        }

        info!(version_id = %id, "Consolidation started");
        let pulled = self.adapters.pull_all(id).await.map_err(|e| {
            error!(version_id = %id, error = %e, "Planning adapter failed; consolidation aborted");
            ConsolidationError::from(e)
        })?;
        let output = self.engine.consolidate(id, &pulled).map_err(|e| {
            error!(version_id = %id, error = %e, "Consolidation mapping failed");
            e
        })?;

        let run = ConsolidationRun {
            version_id: id,
            fingerprint: output.fingerprint.clone(),
            is_complete: output.status.is_complete,
            line_item_count: u32::try_from(output.line_items.len()).unwrap_or(u32::MAX),
            consolidated_at: Utc::now(),
        };
        self.repo
            .replace_line_items(&run, &output.line_items, version.status)
            .await
            .map_err(|e| {
                warn!(version_id = %id, error = %e, "Consolidation write refused");
                ConsolidationError::from(e)
            })?;
        self.cache.invalidate_version(id);

        if !run.is_complete {
            warn!(
                version_id = %id,
                missing = ?output.status.missing_modules(),
                "Consolidated an incomplete version"
            );
        }
        info!(
            version_id = %id,
            line_items = run.line_item_count,
            total_revenue = %output.totals.total_revenue,
            operating_result = %output.totals.operating_result,
            net_result = %output.totals.net_result,
            fingerprint = %run.fingerprint,
            "Consolidation finished"
        );

        Ok(ConsolidatedBudget {
            version_id: id,
            is_complete: run.is_complete,
            fingerprint: run.fingerprint,
            consolidated_at: run.consolidated_at,
            line_items: output.line_items,
            totals: output.totals,
        })
    }

    /// Last consolidation of the version.
    pub async fn get_consolidated(
        &self,
        id: VersionId,
    ) -> Result<ConsolidatedBudget, ConsolidationError> {
        self.versions.get(id).await?;
        let (run, items) = self
            .repo
            .load(id)
            .await?
            .ok_or(ConsolidationError::NotConsolidated(id))?;
        Ok(ConsolidatedBudget::from_run(run, items))
    }

    /// Renders a statement over the last consolidation, from cache when possible.
    pub async fn get_statement(
        &self,
        id: VersionId,
        statement_type: StatementType,
        format: StatementFormat,
        period: StatementPeriod,
    ) -> Result<Arc<FinancialStatement>, ConsolidationError> {
        let budget = self.get_consolidated(id).await?;
        let key = StatementKey {
            version_id: id,
            fingerprint: budget.fingerprint.clone(),
            statement_type,
            format,
            period,
        };
        Ok(self.cache.get_or_render(key, || {
            self.statements
                .build(&budget, statement_type, format, period)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::planning::adapter::MockPlanningModuleAdapter;
    use crate::planning::{AdapterError, PlanningModule, PlanningModuleAdapter, PlanningRecord};
    use crate::test_support::FakeStore;
    use crate::version::{CreateVersionInput, ScenarioType};
    use crate::workflow::VersionStatus;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    async fn setup(store: &Arc<FakeStore>, adapters: ModuleAdapters) -> (ConsolidationService, VersionId) {
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
        let svc = ConsolidationService::new(
            versions,
            store.clone(),
            Arc::new(adapters),
            ConsolidationEngine::default(),
        );
        (svc, version.id)
    }

    #[tokio::test]
    async fn test_empty_version_consolidates_to_zero() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;

        let status = svc.get_status(id).await.unwrap();
        assert!(!status.is_complete);
        assert_eq!(status.missing_modules().len(), 6);

        let budget = svc.consolidate(id).await.unwrap();
        assert!(!budget.is_complete);
        assert!(budget.line_items.is_empty());
        assert_eq!(budget.totals, ConsolidationTotals::default());
    }

    #[tokio::test]
    async fn test_consolidate_is_idempotent() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);

        let first = svc.consolidate(id).await.unwrap();
        let second = svc.consolidate(id).await.unwrap();
        assert!(first.is_complete);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.line_items, second.line_items);

        let stored = svc.get_consolidated(id).await.unwrap();
        assert_eq!(stored.line_items, second.line_items);
        assert_eq!(stored.totals, second.totals);
    }

    #[tokio::test]
    async fn test_operating_and_net_result() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.put_records(
            id,
            PlanningModule::Revenue,
            vec![PlanningRecord::financial("70610", "Scolarité", dec!(500_000))],
        );
        store.put_records(
            id,
            PlanningModule::Dhg,
            vec![PlanningRecord::financial("64110", "Salaires", dec!(300_000))],
        );
        store.put_records(
            id,
            PlanningModule::Costs,
            vec![PlanningRecord::financial("61320", "Loyers", dec!(50_000))],
        );
        store.put_records(
            id,
            PlanningModule::Capex,
            vec![PlanningRecord::financial("21830", "Ordinateurs", dec!(40_000)).with_useful_life(4)],
        );

        let budget = svc.consolidate(id).await.unwrap();
        assert_eq!(budget.totals.operating_result, dec!(150_000));
        assert_eq!(budget.totals.total_depreciation, dec!(10_000));
        assert_eq!(budget.totals.total_capex, dec!(50_000));
        // Only depreciation hits the result.
        assert_eq!(budget.totals.net_result, dec!(140_000));
    }

    #[tokio::test]
    async fn test_adapter_failure_keeps_previous_items() {
        let store = Arc::new(FakeStore::default());
        let failing = ModuleAdapters::from_fn(|module| {
            if module == PlanningModule::Costs {
                let mut mock = MockPlanningModuleAdapter::new();
                mock.expect_module().return_const(module);
                mock.expect_list_records().returning(move |_| {
                    Err(AdapterError::Unavailable {
                        module,
                        message: "timeout".into(),
                    })
                });
                Arc::new(mock) as Arc<dyn PlanningModuleAdapter>
            } else {
                store.fake_adapter(module)
            }
        });
        let (good, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);
        let before = good.consolidate(id).await.unwrap();

        let bad = ConsolidationService::new(
            VersionService::new(store.clone(), Arc::new(store.adapters())),
            store.clone(),
            Arc::new(failing),
            ConsolidationEngine::default(),
        );
        let err = bad.consolidate(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Aggregation);

        let after = good.get_consolidated(id).await.unwrap();
        assert_eq!(after.fingerprint, before.fingerprint);
        assert_eq!(after.line_items, before.line_items);
    }

    #[tokio::test]
    async fn test_unmapped_account_aborts() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.put_records(
            id,
            PlanningModule::Costs,
            vec![PlanningRecord::financial("41100", "Clients", dec!(10))],
        );

        let err = svc.consolidate(id).await.unwrap_err();
        assert!(matches!(err, ConsolidationError::UnmappedAccount { .. }));
        assert!(matches!(
            svc.get_consolidated(id).await,
            Err(ConsolidationError::NotConsolidated(_))
        ));

        let validation = svc.get_validation(id).await.unwrap();
        assert!(validation.errors.iter().any(|e| e.contains("41100")));
    }

    #[tokio::test]
    async fn test_frozen_version_refused() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);
        svc.consolidate(id).await.unwrap();

        for status in [
            VersionStatus::Submitted,
            VersionStatus::Approved,
            VersionStatus::Superseded,
        ] {
            store.force_status(id, status);
            let err = svc.consolidate(id).await.unwrap_err();
            assert!(matches!(err, ConsolidationError::Frozen { .. }));
            // Line items are retained for audit.
            assert!(svc.get_consolidated(id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_submit_during_pull_keeps_frozen_items() {
        let store = Arc::new(FakeStore::default());
        let (good, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);
        let before = good.consolidate(id).await.unwrap();

        store.put_records(
            id,
            PlanningModule::Revenue,
            vec![PlanningRecord::financial("70610", "Scolarité", dec!(1))],
        );
        let submitting = {
            let store = store.clone();
            ModuleAdapters::from_fn(move |module| {
                if module == PlanningModule::Capex {
                    let store = store.clone();
                    let mut mock = MockPlanningModuleAdapter::new();
                    mock.expect_module().return_const(module);
                    mock.expect_list_records().returning(move |version_id| {
                        store.force_status(version_id, VersionStatus::Submitted);
                        Ok(vec![
                            PlanningRecord::financial("21830", "Informatique", dec!(60_000))
                                .with_useful_life(3),
                        ])
                    });
                    Arc::new(mock) as Arc<dyn PlanningModuleAdapter>
                } else {
                    store.fake_adapter(module)
                }
            })
        };
        let racing = ConsolidationService::new(
            VersionService::new(store.clone(), Arc::new(store.adapters())),
            store.clone(),
            Arc::new(submitting),
            ConsolidationEngine::default(),
        );

        let err = racing.consolidate(id).await.unwrap_err();
        assert!(matches!(
            err,
            ConsolidationError::Frozen { status: VersionStatus::Submitted, .. }
        ));
        assert_eq!(err.status_code(), 409);

        let after = good.get_consolidated(id).await.unwrap();
        assert_eq!(after.fingerprint, before.fingerprint);
        assert_eq!(after.line_items, before.line_items);
    }

    #[tokio::test]
    async fn test_validation_names_missing_modules_and_warns() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);
        store.clear_module(id, PlanningModule::Enrollment);

        let validation = svc.get_validation(id).await.unwrap();
        assert!(!validation.is_complete);
        assert_eq!(validation.missing_modules, vec![PlanningModule::Enrollment]);
        assert_eq!(validation.errors.len(), 1);
        assert!(validation.errors[0].contains("Enrollment"));
        assert!(validation.totals.total_revenue > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_concurrent_consolidations_serialize() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);

        let (a, b) = tokio::join!(svc.consolidate(id), svc.consolidate(id));
        assert_eq!(a.unwrap().fingerprint, b.unwrap().fingerprint);
    }

    #[tokio::test]
    async fn test_statement_cached_until_reconsolidated() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        store.fill_all_modules(id);
        svc.consolidate(id).await.unwrap();

        let first = svc
            .get_statement(id, StatementType::Income, StatementFormat::Pcg, StatementPeriod::Annual)
            .await
            .unwrap();
        let again = svc
            .get_statement(id, StatementType::Income, StatementFormat::Pcg, StatementPeriod::Annual)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        store.put_records(
            id,
            PlanningModule::Revenue,
            vec![PlanningRecord::financial("70610", "Scolarité", dec!(1))],
        );
        svc.consolidate(id).await.unwrap();
        let fresh = svc
            .get_statement(id, StatementType::Income, StatementFormat::Pcg, StatementPeriod::Annual)
            .await
            .unwrap();
        assert_ne!(fresh.net_result, first.net_result);
    }

    #[tokio::test]
    async fn test_statement_requires_consolidation() {
        let store = Arc::new(FakeStore::default());
        let (svc, id) = setup(&store, store.adapters()).await;
        let err = svc
            .get_statement(id, StatementType::Balance, StatementFormat::Ifrs, StatementPeriod::T1)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
