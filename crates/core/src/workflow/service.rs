//! Workflow service for budget version state transitions.
//!
//! The state machine is an explicit table of (current status, command) →
//! new status. Every command goes through [`WorkflowService::next_status`];
//! there are no per-status boolean flags.

use chrono::Utc;

use schoolplan_shared::types::VersionId;

use crate::consolidation::ConsolidationStatus;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{VersionStatus, WorkflowAction, WorkflowCommand};

/// Transition table. Anything not listed is an invalid transition.
const TRANSITIONS: &[(VersionStatus, WorkflowCommand, VersionStatus)] = &[
    (
        VersionStatus::Working,
        WorkflowCommand::Submit,
        VersionStatus::Submitted,
    ),
    (
        VersionStatus::Rejected,
        WorkflowCommand::Submit,
        VersionStatus::Submitted,
    ),
    (
        VersionStatus::Submitted,
        WorkflowCommand::Approve,
        VersionStatus::Approved,
    ),
    (
        VersionStatus::Submitted,
        WorkflowCommand::Reject,
        VersionStatus::Rejected,
    ),
    (
        VersionStatus::Rejected,
        WorkflowCommand::Reopen,
        VersionStatus::Working,
    ),
    (
        VersionStatus::Approved,
        WorkflowCommand::Supersede,
        VersionStatus::Superseded,
    ),
];

/// Stateless service validating version workflow transitions.
///
/// All methods are associated functions returning the `WorkflowAction` to
/// persist. Persisting it (with compare-and-swap) is the store's job.
pub struct WorkflowService;

impl WorkflowService {
    /// Looks up the transition table.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::InvalidTransition` when the command is not
    /// allowed from `from`.
    pub fn next_status(
        from: VersionStatus,
        command: WorkflowCommand,
    ) -> Result<VersionStatus, WorkflowError> {
        TRANSITIONS
            .iter()
            .find(|(status, cmd, _)| *status == from && *cmd == command)
            .map(|(_, _, to)| *to)
            .ok_or(WorkflowError::InvalidTransition { from, command })
    }

    /// Submit a version for approval.
    ///
    /// Completeness is checked first: an incomplete version is always a
    /// validation failure naming the missing modules, whatever its status.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Submit)` if the version is complete and the transition is valid
    /// * `Err(WorkflowError::IncompleteModules)` if any module has no records
    /// * `Err(WorkflowError::InvalidTransition)` if not Working or Rejected
    pub fn submit(
        current_status: VersionStatus,
        completeness: &ConsolidationStatus,
    ) -> Result<WorkflowAction, WorkflowError> {
        let missing = completeness.missing_modules();
        if !missing.is_empty() {
            return Err(WorkflowError::IncompleteModules(missing));
        }

        let new_status = Self::next_status(current_status, WorkflowCommand::Submit)?;
        Ok(WorkflowAction::Submit {
            new_status,
            submitted_at: Utc::now(),
        })
    }

    /// Approve a submitted version.
    ///
    /// Authorization is decided by the caller; only the state precondition
    /// is enforced here.
    pub fn approve(current_status: VersionStatus) -> Result<WorkflowAction, WorkflowError> {
        let new_status = Self::next_status(current_status, WorkflowCommand::Approve)?;
        Ok(WorkflowAction::Approve {
            new_status,
            approved_at: Utc::now(),
        })
    }

    /// Reject a submitted version.
    ///
    /// # Returns
    /// * `Err(WorkflowError::RejectionReasonRequired)` if reason is blank
    /// * `Err(WorkflowError::InvalidTransition)` if not Submitted
    pub fn reject(
        current_status: VersionStatus,
        rejection_reason: String,
    ) -> Result<WorkflowAction, WorkflowError> {
        if rejection_reason.trim().is_empty() {
            return Err(WorkflowError::RejectionReasonRequired);
        }

        let new_status = Self::next_status(current_status, WorkflowCommand::Reject)?;
        Ok(WorkflowAction::Reject {
            new_status,
            rejection_reason: rejection_reason.trim().to_string(),
            rejected_at: Utc::now(),
        })
    }

    /// Return a rejected version to planning.
    pub fn reopen(current_status: VersionStatus) -> Result<WorkflowAction, WorkflowError> {
        let new_status = Self::next_status(current_status, WorkflowCommand::Reopen)?;
        Ok(WorkflowAction::Reopen { new_status })
    }

    /// Retire an approved version.
    pub fn supersede(
        current_status: VersionStatus,
        superseded_by: Option<VersionId>,
    ) -> Result<WorkflowAction, WorkflowError> {
        let new_status = Self::next_status(current_status, WorkflowCommand::Supersede)?;
        Ok(WorkflowAction::Supersede {
            new_status,
            superseded_by,
        })
    }

    /// Check if a status transition is reachable by any single command.
    #[must_use]
    pub fn is_valid_transition(from: VersionStatus, to: VersionStatus) -> bool {
        TRANSITIONS
            .iter()
            .any(|(status, _, target)| *status == from && *target == to)
    }
}
