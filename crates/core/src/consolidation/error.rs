//! Consolidation error types.

use thiserror::Error;

use schoolplan_shared::types::VersionId;

use crate::error::{ErrorKind, StoreError};
use crate::planning::{AdapterError, PlanningModule};
use crate::version::VersionError;
use crate::workflow::VersionStatus;

/// Errors raised while consolidating or rendering a version.
#[derive(Debug, Error)]
pub enum ConsolidationError {
    /// A planning adapter failed. Nothing was written.
    #[error("Aggregation failed: {0}")]
    Adapter(#[from] AdapterError),

    /// A record maps to no category and carries no hint.
    #[error("Account {account_code} from {module} is not in the mapping table and has no category")]
    UnmappedAccount {
        /// Module that produced the record.
        module: PlanningModule,
        /// Offending account.
        account_code: String,
    },

    /// A record is internally inconsistent.
    #[error("Malformed record from {module}: {reason}")]
    MalformedRecord {
        /// Module that produced the record.
        module: PlanningModule,
        /// What is wrong.
        reason: String,
    },

    /// Consolidation is frozen in this status.
    #[error("Version {version_id} is {status}; consolidation is frozen")]
    Frozen {
        /// The version.
        version_id: VersionId,
        /// Its status.
        status: VersionStatus,
    },

    /// Version not found.
    #[error("Budget version {0} not found")]
    VersionNotFound(VersionId),

    /// No consolidation run exists yet.
    #[error("Version {0} has not been consolidated")]
    NotConsolidated(VersionId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ConsolidationError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Adapter(_) | Self::UnmappedAccount { .. } | Self::MalformedRecord { .. } => {
                ErrorKind::Aggregation
            }
            Self::Frozen { .. } => ErrorKind::StateConflict,
            Self::VersionNotFound(_) | Self::NotConsolidated(_) => ErrorKind::NotFound,
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
            Self::Adapter(_) => "ADAPTER_FAILURE",
            Self::UnmappedAccount { .. } => "UNMAPPED_ACCOUNT",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::Frozen { .. } => "CONSOLIDATION_FROZEN",
            Self::VersionNotFound(_) => "VERSION_NOT_FOUND",
            Self::NotConsolidated(_) => "NOT_CONSOLIDATED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<StoreError> for ConsolidationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StatusMismatch {
                version_id,
                actual,
                ..
            } => Self::Frozen {
                version_id,
                status: actual,
            },
            StoreError::NotFound { id, .. } => match id.parse() {
                Ok(version_id) => Self::VersionNotFound(version_id),
                Err(_) => Self::Database(format!("unknown id {id}")),
            },
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<VersionError> for ConsolidationError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::NotFound(id) => Self::VersionNotFound(id),
            other => Self::Database(other.to_string()),
        }
    }
}
