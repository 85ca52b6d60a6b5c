//! Workflow error types for budget version lifecycle management.

use thiserror::Error;

use schoolplan_shared::types::VersionId;

use crate::error::{ErrorKind, StoreError};
use crate::planning::PlanningModule;
use crate::workflow::types::{VersionStatus, WorkflowCommand};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The transition table has no entry for (status, command).
    #[error("Cannot {command} a version that is {from}")]
    InvalidTransition {
        /// The current status.
        from: VersionStatus,
        /// The attempted command.
        command: WorkflowCommand,
    },

    /// The version's status moved since the caller read it.
    #[error("Version {version_id} changed status: expected {expected}, found {actual}")]
    StatusChanged {
        /// The version.
        version_id: VersionId,
        /// The status the caller read.
        expected: VersionStatus,
        /// The status found.
        actual: VersionStatus,
    },

    /// Submit refused because some modules have no committed records.
    #[error("Cannot submit: missing modules: {}", format_modules(.0))]
    IncompleteModules(Vec<PlanningModule>),

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Version not found.
    #[error("Budget version {0} not found")]
    VersionNotFound(VersionId),

    /// Module data could not be read to check completeness.
    #[error("Could not check completeness: {0}")]
    Aggregation(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

fn format_modules(modules: &[PlanningModule]) -> String {
    modules
        .iter()
        .map(PlanningModule::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl WorkflowError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::IncompleteModules(_) | Self::RejectionReasonRequired => ErrorKind::Validation,
            Self::InvalidTransition { .. } | Self::StatusChanged { .. } => {
                ErrorKind::StateConflict
            }
            Self::VersionNotFound(_) => ErrorKind::NotFound,
            Self::Aggregation(_) => ErrorKind::Aggregation,
            Self::Database(_) => ErrorKind::Storage,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::StatusChanged { .. } => "STATUS_CHANGED",
            Self::IncompleteModules(_) => "INCOMPLETE_MODULES",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::VersionNotFound(_) => "VERSION_NOT_FOUND",
            Self::Aggregation(_) => "AGGREGATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StatusMismatch {
                version_id,
                expected,
                actual,
            } => Self::StatusChanged {
                version_id,
                expected,
                actual,
            },
            StoreError::NotFound { id, .. } => match id.parse() {
                Ok(version_id) => Self::VersionNotFound(version_id),
                Err(_) => Self::Database(format!("unknown id {id}")),
            },
            other => Self::Database(other.to_string()),
        }
    }
}
