//! Process-local store.
//!
//! Implements the same repository and adapter traits as [`crate::PgStore`]
//! over mutex-guarded maps. Used by the `memory` backend and by API tests.
//! Every operation takes the single lock, so each one is atomic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use schoolplan_core::consolidation::{
    ConsolidationLineItem, ConsolidationRepository, ConsolidationRun,
};
use schoolplan_core::error::StoreError;
use schoolplan_core::planning::{
    AdapterError, ModuleAdapters, PlanningModule, PlanningModuleAdapter, PlanningRecord,
};
use schoolplan_core::projection::{
    BaseEnrollment, GradeCatalog, ProjectionConfig, ProjectionDraft, ProjectionRepository,
    ProjectionResults,
};
use schoolplan_core::version::{BudgetVersion, VersionFilter, VersionRepository};
use schoolplan_core::workflow::{StatusTransition, VersionStatus};
use schoolplan_shared::types::{PageRequest, VersionId};

use crate::demo::DemoDataset;

#[derive(Default)]
struct State {
    versions: HashMap<VersionId, BudgetVersion>,
    records: HashMap<(VersionId, PlanningModule), Vec<PlanningRecord>>,
    runs: HashMap<VersionId, (ConsolidationRun, Vec<ConsolidationLineItem>)>,
    catalogs: HashMap<VersionId, GradeCatalog>,
    base: HashMap<VersionId, Vec<BaseEnrollment>>,
    configs: HashMap<VersionId, ProjectionConfig>,
    drafts: HashMap<VersionId, ProjectionDraft>,
    results: HashMap<VersionId, ProjectionResults>,
    stale: HashMap<VersionId, Vec<PlanningModule>>,
}

impl State {
    fn check_status(&self, id: VersionId, expected: VersionStatus) -> Result<(), StoreError> {
        let actual = self
            .versions
            .get(&id)
            .ok_or_else(|| StoreError::version_not_found(id))?
            .status;
        if actual == expected {
            Ok(())
        } else {
            Err(StoreError::StatusMismatch {
                version_id: id,
                expected,
                actual,
            })
        }
    }

    fn remove_version_data(&mut self, id: VersionId) {
        self.records.retain(|(v, _), _| *v != id);
        self.runs.remove(&id);
        self.catalogs.remove(&id);
        self.base.remove(&id);
        self.configs.remove(&id);
        self.drafts.remove(&id);
        self.results.remove(&id);
        self.stale.remove(&id);
    }
}

/// In-memory store. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }

    /// One adapter per planning module, reading this store's records.
    #[must_use]
    pub fn adapters(&self) -> ModuleAdapters {
        ModuleAdapters::from_fn(|module| {
            Arc::new(MemoryAdapter {
                module,
                store: self.clone(),
            }) as Arc<dyn PlanningModuleAdapter>
        })
    }

    /// Replaces a module's records for a version.
    pub fn put_records(
        &self,
        version_id: VersionId,
        module: PlanningModule,
        records: Vec<PlanningRecord>,
    ) -> Result<(), StoreError> {
        self.lock()?.records.insert((version_id, module), records);
        Ok(())
    }

    /// Replaces the grade catalogue and base enrollment of a version.
    pub fn put_catalog(
        &self,
        version_id: VersionId,
        catalog: GradeCatalog,
        base: Vec<BaseEnrollment>,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.catalogs.insert(version_id, catalog);
        state.base.insert(version_id, base);
        Ok(())
    }

    /// Creates a version from `data` and loads its catalogue and records.
    pub fn load_dataset(&self, data: DemoDataset) -> Result<BudgetVersion, StoreError> {
        let version = BudgetVersion::new(data.version, Utc::now());
        let mut state = self.lock()?;
        state.versions.insert(version.id, version.clone());
        state.catalogs.insert(version.id, data.catalog);
        state.base.insert(version.id, data.base_enrollment);
        for (module, records) in data.records {
            state.records.insert((version.id, module), records);
        }
        Ok(version)
    }
}

struct MemoryAdapter {
    module: PlanningModule,
    store: MemoryStore,
}

#[async_trait]
impl PlanningModuleAdapter for MemoryAdapter {
    fn module(&self) -> PlanningModule {
        self.module
    }

    async fn list_records(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningRecord>, AdapterError> {
        let state = self.store.lock().map_err(|e| AdapterError::Unavailable {
            module: self.module,
            message: e.to_string(),
        })?;
        Ok(state
            .records
            .get(&(version_id, self.module))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl VersionRepository for MemoryStore {
    async fn insert(&self, version: &BudgetVersion) -> Result<(), StoreError> {
        self.lock()?.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn find(&self, id: VersionId) -> Result<Option<BudgetVersion>, StoreError> {
        Ok(self.lock()?.versions.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: VersionFilter,
        page: PageRequest,
    ) -> Result<(Vec<BudgetVersion>, u64), StoreError> {
        let state = self.lock()?;
        let mut matching: Vec<_> = state
            .versions
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();
        Ok((data, total))
    }

    async fn update(
        &self,
        version: &BudgetVersion,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(version.id, expected)?;
        state.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
    ) -> Result<Vec<BudgetVersion>, StoreError> {
        let mut state = self.lock()?;
        for t in transitions {
            state.check_status(t.version_id, t.expected)?;
        }
        let now = Utc::now();
        let mut updated = Vec::with_capacity(transitions.len());
        for t in transitions {
            if let Some(v) = state.versions.get_mut(&t.version_id) {
                v.apply_action(&t.action, now);
                updated.push(v.clone());
            }
        }
        Ok(updated)
    }

    async fn activate(
        &self,
        id: VersionId,
        expected: VersionStatus,
    ) -> Result<BudgetVersion, StoreError> {
        let mut state = self.lock()?;
        state.check_status(id, expected)?;
        let now = Utc::now();
        let mut activated = None;
        let fiscal_year = state.versions.get(&id).map(|v| v.fiscal_year);
        for v in state.versions.values_mut() {
            if Some(v.fiscal_year) != fiscal_year {
                continue;
            }
            if v.id == id {
                v.is_active = true;
                v.updated_at = now;
                activated = Some(v.clone());
            } else {
                v.is_active = false;
            }
        }
        activated.ok_or_else(|| StoreError::version_not_found(id))
    }

    async fn delete(&self, id: VersionId, expected: VersionStatus) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(id, expected)?;
        state.versions.remove(&id);
        state.remove_version_data(id);
        Ok(())
    }

    async fn clone_version(
        &self,
        source: VersionId,
        clone: &BudgetVersion,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.versions.contains_key(&source) {
            return Err(StoreError::version_not_found(source));
        }
        state.versions.insert(clone.id, clone.clone());

        let records: Vec<_> = state
            .records
            .iter()
            .filter(|((v, _), _)| *v == source)
            .map(|((_, module), r)| ((clone.id, *module), r.clone()))
            .collect();
        state.records.extend(records);

        if let Some(catalog) = state.catalogs.get(&source).cloned() {
            state.catalogs.insert(clone.id, catalog);
        }
        if let Some(base) = state.base.get(&source).cloned() {
            state.base.insert(clone.id, base);
        }
        if let Some(config) = state.configs.get(&source).cloned() {
            state.configs.insert(
                clone.id,
                ProjectionConfig {
                    version_id: clone.id,
                    validated: false,
                    validated_at: None,
                    updated_at: clone.created_at,
                    ..config
                },
            );
        }
        Ok(())
    }
}

#[async_trait]
impl ConsolidationRepository for MemoryStore {
    async fn replace_line_items(
        &self,
        run: &ConsolidationRun,
        items: &[ConsolidationLineItem],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(run.version_id, expected)?;
        state
            .runs
            .insert(run.version_id, (run.clone(), items.to_vec()));
        Ok(())
    }

    async fn load(
        &self,
        version_id: VersionId,
    ) -> Result<Option<(ConsolidationRun, Vec<ConsolidationLineItem>)>, StoreError> {
        Ok(self.lock()?.runs.get(&version_id).cloned())
    }
}

#[async_trait]
impl ProjectionRepository for MemoryStore {
    async fn load_catalog(&self, version_id: VersionId) -> Result<GradeCatalog, StoreError> {
        Ok(self
            .lock()?
            .catalogs
            .get(&version_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_base_enrollment(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<BaseEnrollment>, StoreError> {
        Ok(self.lock()?.base.get(&version_id).cloned().unwrap_or_default())
    }

    async fn load_config(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionConfig>, StoreError> {
        Ok(self.lock()?.configs.get(&version_id).cloned())
    }

    async fn load_draft(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionDraft>, StoreError> {
        Ok(self.lock()?.drafts.get(&version_id).cloned())
    }

    async fn save_draft(
        &self,
        draft: &ProjectionDraft,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(draft.version_id, expected)?;
        state.drafts.insert(draft.version_id, draft.clone());
        Ok(())
    }

    async fn commit_apply(
        &self,
        config: &ProjectionConfig,
        results: &ProjectionResults,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(config.version_id, expected)?;
        state.configs.insert(config.version_id, config.clone());
        state.results.insert(config.version_id, results.clone());
        state.drafts.remove(&config.version_id);
        state.stale.remove(&config.version_id);
        Ok(())
    }

    async fn load_results(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionResults>, StoreError> {
        Ok(self.lock()?.results.get(&version_id).cloned())
    }

    async fn set_validation(
        &self,
        version_id: VersionId,
        validated: bool,
        validated_at: Option<DateTime<Utc>>,
        stale_modules: &[PlanningModule],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_status(version_id, expected)?;
        let config = state
            .configs
            .get_mut(&version_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "projection config",
                id: version_id.to_string(),
            })?;
        config.validated = validated;
        config.validated_at = validated_at;
        state.stale.insert(version_id, stale_modules.to_vec());
        Ok(())
    }

    async fn stale_modules(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningModule>, StoreError> {
        Ok(self.lock()?.stale.get(&version_id).cloned().unwrap_or_default())
    }
}
