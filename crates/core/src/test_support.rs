//! In-process fake of every repository and planning adapter, for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;

use schoolplan_shared::types::{CycleId, LevelId, PageRequest, VersionId};

use crate::consolidation::{ConsolidationLineItem, ConsolidationRepository, ConsolidationRun};
use crate::error::StoreError;
use crate::planning::{
    AdapterError, ModuleAdapters, PlanningModule, PlanningModuleAdapter, PlanningRecord,
};
use crate::projection::{
    BaseEnrollment, Cycle, GradeCatalog, GradeLevel, ProjectionConfig, ProjectionDraft,
    ProjectionRepository, ProjectionResults,
};
use crate::version::{BudgetVersion, VersionFilter, VersionRepository};
use crate::workflow::{StatusTransition, VersionStatus};

#[derive(Default)]
struct FakeState {
    versions: HashMap<VersionId, BudgetVersion>,
    records: HashMap<(VersionId, PlanningModule), Vec<PlanningRecord>>,
    runs: HashMap<VersionId, (ConsolidationRun, Vec<ConsolidationLineItem>)>,
    catalogs: HashMap<VersionId, GradeCatalog>,
    base: HashMap<VersionId, Vec<BaseEnrollment>>,
    configs: HashMap<VersionId, ProjectionConfig>,
    drafts: HashMap<VersionId, ProjectionDraft>,
    results: HashMap<VersionId, ProjectionResults>,
    stale: HashMap<VersionId, Vec<PlanningModule>>,
    status_on_catalog_load: Option<(VersionId, VersionStatus)>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

fn sample_records(module: PlanningModule) -> Vec<PlanningRecord> {
    match module {
        PlanningModule::Enrollment => vec![PlanningRecord::operational("6EME headcount")],
        PlanningModule::ClassStructure => vec![PlanningRecord::operational("6EME divisions")],
        PlanningModule::Dhg => vec![PlanningRecord::financial("64110", "Salaires", dec!(400_000))],
        PlanningModule::Revenue => {
            vec![PlanningRecord::financial("70610", "Scolarité", dec!(900_000))]
        }
        PlanningModule::Costs => vec![PlanningRecord::financial("61320", "Loyers", dec!(150_000))],
        PlanningModule::Capex => vec![
            PlanningRecord::financial("21830", "Informatique", dec!(60_000)).with_useful_life(3),
        ],
    }
}

impl FakeStore {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fake_adapter(&self, module: PlanningModule) -> Arc<dyn PlanningModuleAdapter> {
        Arc::new(FakeAdapter {
            module,
            store: self.clone(),
        })
    }

    pub fn adapters(&self) -> ModuleAdapters {
        ModuleAdapters::from_fn(|module| self.fake_adapter(module))
    }

    pub fn put_records(&self, id: VersionId, module: PlanningModule, records: Vec<PlanningRecord>) {
        self.lock().records.insert((id, module), records);
    }

    pub fn fill_all_modules(&self, id: VersionId) {
        for module in PlanningModule::ALL {
            self.put_records(id, module, sample_records(module));
        }
    }

    pub fn clear_module(&self, id: VersionId, module: PlanningModule) {
        self.lock().records.remove(&(id, module));
    }

    pub fn force_status(&self, id: VersionId, status: VersionStatus) {
        if let Some(v) = self.lock().versions.get_mut(&id) {
            v.status = status;
        }
    }

    /// Moves the version to `status` the next time its catalogue is read,
    /// landing the change between a service's status check and its write.
    pub fn force_status_on_catalog_load(&self, id: VersionId, status: VersionStatus) {
        self.lock().status_on_catalog_load = Some((id, status));
    }

    /// One cycle holding the given grades, in order, with base headcounts.
    pub fn seed_grades(&self, id: VersionId, grades: &[(&str, u32)]) {
        let cycle = CycleId::new();
        let mut catalog = GradeCatalog {
            cycles: vec![Cycle {
                id: cycle,
                code: "CYC".into(),
                name: "Cycle".into(),
                sort_order: 1,
            }],
            levels: Vec::new(),
        };
        let mut base = Vec::new();
        for (order, (code, count)) in (1..).zip(grades) {
            let level = LevelId::new();
            catalog.levels.push(GradeLevel {
                id: level,
                code: (*code).to_string(),
                name: (*code).to_string(),
                cycle_id: Some(cycle),
                sort_order: order,
            });
            base.push(BaseEnrollment {
                level_id: level,
                student_count: *count,
            });
        }
        let mut state = self.lock();
        state.catalogs.insert(id, catalog);
        state.base.insert(id, base);
    }

    pub fn level_id(&self, id: VersionId, code: &str) -> Option<LevelId> {
        self.lock()
            .catalogs
            .get(&id)?
            .levels
            .iter()
            .find(|l| l.code == code)
            .map(|l| l.id)
    }
}

fn check_status(
    state: &FakeState,
    id: VersionId,
    expected: VersionStatus,
) -> Result<(), StoreError> {
    let actual = state
        .versions
        .get(&id)
        .ok_or_else(|| StoreError::version_not_found(id))?
        .status;
    if actual != expected {
        return Err(StoreError::StatusMismatch {
            version_id: id,
            expected,
            actual,
        });
    }
    Ok(())
}

struct FakeAdapter {
    module: PlanningModule,
    store: FakeStore,
}

#[async_trait]
impl PlanningModuleAdapter for FakeAdapter {
    fn module(&self) -> PlanningModule {
        self.module
    }

    async fn list_records(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningRecord>, AdapterError> {
        Ok(self
            .store
            .lock()
            .records
            .get(&(version_id, self.module))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl VersionRepository for FakeStore {
    async fn insert(&self, version: &BudgetVersion) -> Result<(), StoreError> {
        self.lock().versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn find(&self, id: VersionId) -> Result<Option<BudgetVersion>, StoreError> {
        Ok(self.lock().versions.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: VersionFilter,
        page: PageRequest,
    ) -> Result<(Vec<BudgetVersion>, u64), StoreError> {
        let state = self.lock();
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
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((data, total))
    }

    async fn update(
        &self,
        version: &BudgetVersion,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, version.id, expected)?;
        state.versions.insert(version.id, version.clone());
        Ok(())
    }

    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
    ) -> Result<Vec<BudgetVersion>, StoreError> {
        let mut state = self.lock();
        for t in transitions {
            check_status(&state, t.version_id, t.expected)?;
        }
        let now: DateTime<Utc> = Utc::now();
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
        let mut state = self.lock();
        check_status(&state, id, expected)?;
        let fiscal_year = state.versions[&id].fiscal_year;
        for v in state.versions.values_mut() {
            if v.fiscal_year == fiscal_year {
                v.is_active = v.id == id;
            }
        }
        Ok(state.versions[&id].clone())
    }

    async fn delete(&self, id: VersionId, expected: VersionStatus) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, id, expected)?;
        state.versions.remove(&id);
        state.runs.remove(&id);
        state.records.retain(|(v, _), _| *v != id);
        Ok(())
    }

    async fn clone_version(
        &self,
        source: VersionId,
        clone: &BudgetVersion,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        if !state.versions.contains_key(&source) {
            return Err(StoreError::version_not_found(source));
        }
        state.versions.insert(clone.id, clone.clone());
        let copied: Vec<_> = state
            .records
            .iter()
            .filter(|((v, _), _)| *v == source)
            .map(|((_, m), r)| ((clone.id, *m), r.clone()))
            .collect();
        state.records.extend(copied);
        if let Some(catalog) = state.catalogs.get(&source).cloned() {
            state.catalogs.insert(clone.id, catalog);
        }
        if let Some(base) = state.base.get(&source).cloned() {
            state.base.insert(clone.id, base);
        }
        if let Some(mut config) = state.configs.get(&source).cloned() {
            config.version_id = clone.id;
            config.validated = false;
            config.validated_at = None;
            state.configs.insert(clone.id, config);
        }
        Ok(())
    }
}

#[async_trait]
impl ConsolidationRepository for FakeStore {
    async fn replace_line_items(
        &self,
        run: &ConsolidationRun,
        items: &[ConsolidationLineItem],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, run.version_id, expected)?;
        state
            .runs
            .insert(run.version_id, (run.clone(), items.to_vec()));
        Ok(())
    }

    async fn load(
        &self,
        version_id: VersionId,
    ) -> Result<Option<(ConsolidationRun, Vec<ConsolidationLineItem>)>, StoreError> {
        Ok(self.lock().runs.get(&version_id).cloned())
    }
}

#[async_trait]
impl ProjectionRepository for FakeStore {
    async fn load_catalog(&self, version_id: VersionId) -> Result<GradeCatalog, StoreError> {
        let mut state = self.lock();
        if let Some((id, status)) = state.status_on_catalog_load.take()
            && let Some(v) = state.versions.get_mut(&id)
        {
            v.status = status;
        }
        Ok(state
            .catalogs
            .get(&version_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_base_enrollment(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<BaseEnrollment>, StoreError> {
        Ok(self.lock().base.get(&version_id).cloned().unwrap_or_default())
    }

    async fn load_config(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionConfig>, StoreError> {
        Ok(self.lock().configs.get(&version_id).cloned())
    }

    async fn load_draft(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionDraft>, StoreError> {
        Ok(self.lock().drafts.get(&version_id).cloned())
    }

    async fn save_draft(
        &self,
        draft: &ProjectionDraft,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, draft.version_id, expected)?;
        state.drafts.insert(draft.version_id, draft.clone());
        Ok(())
    }

    async fn commit_apply(
        &self,
        config: &ProjectionConfig,
        results: &ProjectionResults,
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, config.version_id, expected)?;
        state.configs.insert(config.version_id, config.clone());
        state.results.insert(config.version_id, results.clone());
        state.drafts.remove(&config.version_id);
        Ok(())
    }

    async fn load_results(
        &self,
        version_id: VersionId,
    ) -> Result<Option<ProjectionResults>, StoreError> {
        Ok(self.lock().results.get(&version_id).cloned())
    }

    async fn set_validation(
        &self,
        version_id: VersionId,
        validated: bool,
        validated_at: Option<DateTime<Utc>>,
        stale_modules: &[PlanningModule],
        expected: VersionStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.lock();
        check_status(&state, version_id, expected)?;
        if let Some(config) = state.configs.get_mut(&version_id) {
            config.validated = validated;
            config.validated_at = validated_at;
        }
        state.stale.insert(version_id, stale_modules.to_vec());
        Ok(())
    }

    async fn stale_modules(
        &self,
        version_id: VersionId,
    ) -> Result<Vec<PlanningModule>, StoreError> {
        Ok(self.lock().stale.get(&version_id).cloned().unwrap_or_default())
    }
}
