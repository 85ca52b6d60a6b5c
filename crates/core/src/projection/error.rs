//! Enrollment projection error types.

use thiserror::Error;

use schoolplan_shared::types::{CycleId, LevelId, VersionId};

use crate::error::{ErrorKind, StoreError};
use crate::projection::types::OverrideField;
use crate::version::VersionError;
use crate::workflow::VersionStatus;

/// Errors raised by the projection engine and its draft/apply protocol.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// A grade has no cycle, so cycle overrides cannot be resolved.
    #[error("Grade {0} is not mapped to a cycle")]
    UnmappedGrade(LevelId),

    /// An override or enrollment row references an unknown grade.
    #[error("Unknown grade {0}")]
    UnknownGrade(LevelId),

    /// A grade references, or an override targets, an unknown cycle.
    #[error("Unknown cycle {0}")]
    UnknownCycle(CycleId),

    /// An override value is out of range.
    #[error("Invalid {field} for {target}: {reason}")]
    InvalidOverride {
        /// Field.
        field: OverrideField,
        /// Tier and key, e.g. "grade 6EME".
        target: String,
        /// Constraint violated.
        reason: String,
    },

    /// Horizon outside 1..=5.
    #[error("Projection horizon must be between 1 and {max} years, got {got}")]
    InvalidHorizon {
        /// Requested horizon.
        got: u8,
        /// Upper bound.
        max: u8,
    },

    /// Validate was called without explicit confirmation.
    #[error("Validation requires explicit confirmation")]
    ConfirmationRequired,

    /// Validate was called before any calculation.
    #[error("Version {0} has no projection results to validate")]
    NoResults(VersionId),

    /// Another apply is in flight for this version.
    #[error("An apply is already running for version {0}")]
    ApplyInProgress(VersionId),

    /// The version does not accept projection writes.
    #[error("Version {version_id} is {status} and read-only")]
    NotEditable {
        /// Version.
        version_id: VersionId,
        /// Its status.
        status: VersionStatus,
    },

    /// Version not found.
    #[error("Budget version {0} not found")]
    VersionNotFound(VersionId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl ProjectionError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnmappedGrade(_) | Self::UnknownGrade(_) | Self::UnknownCycle(_) => {
                ErrorKind::Configuration
            }
            Self::InvalidOverride { .. }
            | Self::InvalidHorizon { .. }
            | Self::ConfirmationRequired
            | Self::NoResults(_) => ErrorKind::Validation,
            Self::ApplyInProgress(_) | Self::NotEditable { .. } => ErrorKind::StateConflict,
            Self::VersionNotFound(_) => ErrorKind::NotFound,
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
            Self::UnmappedGrade(_) => "UNMAPPED_GRADE",
            Self::UnknownGrade(_) => "UNKNOWN_GRADE",
            Self::UnknownCycle(_) => "UNKNOWN_CYCLE",
            Self::InvalidOverride { .. } => "INVALID_OVERRIDE",
            Self::InvalidHorizon { .. } => "INVALID_HORIZON",
            Self::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            Self::NoResults(_) => "NO_RESULTS",
            Self::ApplyInProgress(_) => "APPLY_IN_PROGRESS",
            Self::NotEditable { .. } => "VERSION_NOT_EDITABLE",
            Self::VersionNotFound(_) => "VERSION_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<StoreError> for ProjectionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StatusMismatch {
                version_id,
                actual,
                ..
            } => Self::NotEditable {
                version_id,
                status: actual,
            },
            StoreError::NotFound {
                entity: "budget version",
                id,
            } => match id.parse() {
                Ok(version_id) => Self::VersionNotFound(version_id),
                Err(_) => Self::Database(format!("unknown id {id}")),
            },
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<VersionError> for ProjectionError {
    fn from(err: VersionError) -> Self {
        match err {
            VersionError::NotFound(id) => Self::VersionNotFound(id),
            VersionError::NotEditable { version_id, status } => {
                Self::NotEditable { version_id, status }
            }
            other => Self::Database(other.to_string()),
        }
    }
}
