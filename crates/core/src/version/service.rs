//! Budget version service: CRUD, clone, activation and workflow commands.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use schoolplan_shared::types::{PageRequest, PageResponse, VersionId};

use crate::planning::ModuleAdapters;
use crate::version::error::VersionError;
use crate::version::repository::VersionRepository;
use crate::version::types::{BudgetVersion, CreateVersionInput, UpdateVersionInput, VersionFilter};
use crate::workflow::{StatusTransition, VersionStatus, WorkflowError, WorkflowService};

const MAX_NAME_LEN: usize = 200;
const FISCAL_YEAR_RANGE: std::ops::RangeInclusive<i32> = 2000..=2100;

/// Version service.
///
/// The single authority other components consult before writing planning
/// data (see [`VersionService::ensure_editable`]).
#[derive(Clone)]
pub struct VersionService {
    repo: Arc<dyn VersionRepository>,
    adapters: Arc<ModuleAdapters>,
}

impl VersionService {
    /// Create a new version service.
    #[must_use]
    pub fn new(repo: Arc<dyn VersionRepository>, adapters: Arc<ModuleAdapters>) -> Self {
        Self { repo, adapters }
    }

    fn validate_name(name: &str) -> Result<(), VersionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VersionError::InvalidInput("name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(VersionError::InvalidInput(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Creates a WORKING version.
    pub async fn create(&self, input: CreateVersionInput) -> Result<BudgetVersion, VersionError> {
        Self::validate_name(&input.name)?;
        if !FISCAL_YEAR_RANGE.contains(&input.fiscal_year) {
            return Err(VersionError::InvalidInput(format!(
                "fiscal_year {} is out of range",
                input.fiscal_year
            )));
        }
        if input.academic_year.trim().is_empty() {
            return Err(VersionError::InvalidInput(
                "academic_year is required".to_string(),
            ));
        }

        let version = BudgetVersion::new(input, Utc::now());
        self.repo.insert(&version).await?;
        info!(version_id = %version.id, fiscal_year = version.fiscal_year, "Budget version created");
        Ok(version)
    }

    /// Fetches a version.
    pub async fn get(&self, id: VersionId) -> Result<BudgetVersion, VersionError> {
        self.repo.find(id).await?.ok_or(VersionError::NotFound(id))
    }

    /// Lists versions, newest first.
    pub async fn list(
        &self,
        filter: VersionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<BudgetVersion>, VersionError> {
        let page = page.normalized();
        let (data, total) = self.repo.list(filter, page).await?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Returns the version if it accepts planning writes.
    ///
    /// # Errors
    ///
    /// `NotFound`, or `NotEditable` for any status other than WORKING.
    pub async fn ensure_editable(&self, id: VersionId) -> Result<BudgetVersion, VersionError> {
        let version = self.get(id).await?;
        if !version.status.is_editable() {
            return Err(VersionError::NotEditable {
                version_id: id,
                status: version.status,
            });
        }
        Ok(version)
    }

    /// Edits name, academic year or notes of a WORKING version.
    pub async fn update(
        &self,
        id: VersionId,
        input: UpdateVersionInput,
    ) -> Result<BudgetVersion, VersionError> {
        if let Some(name) = &input.name {
            Self::validate_name(name)?;
        }
        let mut version = self.ensure_editable(id).await?;
        input.apply_to(&mut version, Utc::now());
        self.repo.update(&version, VersionStatus::Working).await?;
        Ok(version)
    }

    /// Deletes a WORKING or REJECTED version.
    pub async fn delete(&self, id: VersionId) -> Result<(), VersionError> {
        let version = self.get(id).await?;
        if !version.status.is_deletable() {
            return Err(VersionError::NotDeletable {
                version_id: id,
                status: version.status,
            });
        }
        self.repo.delete(id, version.status).await?;
        info!(version_id = %id, "Budget version deleted");
        Ok(())
    }

    /// Clones any version into a new WORKING version.
    ///
    /// The source is not mutated.
    pub async fn clone_version(
        &self,
        source_id: VersionId,
        name: Option<String>,
    ) -> Result<BudgetVersion, VersionError> {
        if let Some(name) = &name
            && !name.trim().is_empty()
        {
            Self::validate_name(name)?;
        }
        let source = self.get(source_id).await?;
        let clone = source.clone_as(name, Utc::now());
        self.repo.clone_version(source_id, &clone).await?;
        info!(source_id = %source_id, version_id = %clone.id, "Budget version cloned");
        Ok(clone)
    }

    /// Makes a WORKING version the active target of its fiscal year.
    pub async fn activate(&self, id: VersionId) -> Result<BudgetVersion, VersionError> {
        self.ensure_editable(id).await?;
        let version = self.repo.activate(id, VersionStatus::Working).await?;
        info!(version_id = %id, fiscal_year = version.fiscal_year, "Budget version activated");
        Ok(version)
    }

    async fn load_for_transition(
        &self,
        id: VersionId,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let version = self
            .repo
            .find(id)
            .await?
            .ok_or(WorkflowError::VersionNotFound(id))?;
        if let Some(expected) = expected
            && expected != version.status
        {
            return Err(WorkflowError::StatusChanged {
                version_id: id,
                expected,
                actual: version.status,
            });
        }
        Ok(version)
    }

    async fn commit(
        &self,
        transitions: Vec<StatusTransition>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let updated = self.repo.apply_transitions(&transitions).await?;
        for t in &transitions {
            info!(
                version_id = %t.version_id,
                from = %t.expected,
                to = %t.action.new_status(),
                command = %t.action.command(),
                "Version status changed"
            );
        }
        updated
            .into_iter()
            .next()
            .ok_or_else(|| WorkflowError::Database("no rows returned".to_string()))
    }

    /// Submits a complete version for approval.
    ///
    /// Completeness is recomputed from live module data.
    pub async fn submit(
        &self,
        id: VersionId,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let version = self.load_for_transition(id, expected).await?;
        let completeness = self
            .adapters
            .completeness(id)
            .await
            .map_err(|e| WorkflowError::Aggregation(e.to_string()))?;
        let action = WorkflowService::submit(version.status, &completeness)?;
        self.commit(vec![StatusTransition {
            version_id: id,
            expected: version.status,
            action,
        }])
        .await
    }

    /// Approves a submitted version.
    ///
    /// When the version was cloned from an APPROVED version, that source is
    /// superseded in the same atomic step.
    pub async fn approve(
        &self,
        id: VersionId,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let version = self.load_for_transition(id, expected).await?;
        let action = WorkflowService::approve(version.status)?;
        let mut transitions = vec![StatusTransition {
            version_id: id,
            expected: version.status,
            action,
        }];

        if let Some(source_id) = version.cloned_from
            && let Some(source) = self.repo.find(source_id).await?
            && source.status == VersionStatus::Approved
        {
            transitions.push(StatusTransition {
                version_id: source_id,
                expected: VersionStatus::Approved,
                action: WorkflowService::supersede(source.status, Some(id))?,
            });
        }

        self.commit(transitions).await
    }

    /// Rejects a submitted version with a reason.
    pub async fn reject(
        &self,
        id: VersionId,
        reason: String,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let version = self.load_for_transition(id, expected).await?;
        let action = WorkflowService::reject(version.status, reason)?;
        self.commit(vec![StatusTransition {
            version_id: id,
            expected: version.status,
            action,
        }])
        .await
    }

    /// Returns a rejected version to WORKING.
    pub async fn reopen(
        &self,
        id: VersionId,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        let version = self.load_for_transition(id, expected).await?;
        let action = WorkflowService::reopen(version.status)?;
        self.commit(vec![StatusTransition {
            version_id: id,
            expected: version.status,
            action,
        }])
        .await
    }

    /// Retires an approved version.
    pub async fn supersede(
        &self,
        id: VersionId,
        superseded_by: Option<VersionId>,
        expected: Option<VersionStatus>,
    ) -> Result<BudgetVersion, WorkflowError> {
        if let Some(successor) = superseded_by
            && self.repo.find(successor).await?.is_none()
        {
            return Err(WorkflowError::VersionNotFound(successor));
        }
        let version = self.load_for_transition(id, expected).await?;
        let action = WorkflowService::supersede(version.status, superseded_by)?;
        self.commit(vec![StatusTransition {
            version_id: id,
            expected: version.status,
            action,
        }])
        .await
    }
}
