//! Budget version store errors.

use thiserror::Error;

use schoolplan_shared::types::VersionId;

use crate::error::{ErrorKind, StoreError};
use crate::workflow::VersionStatus;

/// Errors raised by version CRUD and the editability gate.
#[derive(Debug, Error)]
pub enum VersionError {
    /// Input failed validation.
    #[error("Invalid version: {0}")]
    InvalidInput(String),

    /// Planning writes are only accepted while WORKING.
    #[error("Version {version_id} is {status} and read-only")]
    NotEditable {
        /// The version.
        version_id: VersionId,
        /// Its status.
        status: VersionStatus,
    },

    /// APPROVED and SUPERSEDED versions are kept for audit.
    #[error("Version {version_id} is {status} and cannot be deleted")]
    NotDeletable {
        /// The version.
        version_id: VersionId,
        /// Its status.
        status: VersionStatus,
    },

    /// The version's status moved since it was read.
    #[error("Version {version_id} changed status: expected {expected}, found {actual}")]
    StatusChanged {
        /// The version.
        version_id: VersionId,
        /// The status read.
        expected: VersionStatus,
        /// The status found.
        actual: VersionStatus,
    },

    /// Version not found.
    #[error("Budget version {0} not found")]
    NotFound(VersionId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl VersionError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::Validation,
            Self::NotEditable { .. } | Self::NotDeletable { .. } | Self::StatusChanged { .. } => {
                ErrorKind::StateConflict
            }
            Self::NotFound(_) => ErrorKind::NotFound,
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
            Self::InvalidInput(_) => "INVALID_VERSION",
            Self::NotEditable { .. } => "VERSION_NOT_EDITABLE",
            Self::NotDeletable { .. } => "VERSION_NOT_DELETABLE",
            Self::StatusChanged { .. } => "STATUS_CHANGED",
            Self::NotFound(_) => "VERSION_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<StoreError> for VersionError {
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
                Ok(version_id) => Self::NotFound(version_id),
                Err(_) => Self::Database(format!("unknown id {id}")),
            },
            other => Self::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_editable_is_conflict() {
        let err = VersionError::NotEditable {
            version_id: VersionId::new(),
            status: VersionStatus::Submitted,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "VERSION_NOT_EDITABLE");
        assert!(err.to_string().contains("SUBMITTED"));
    }

    #[test]
    fn test_invalid_input_is_validation() {
        let err = VersionError::InvalidInput("name is required".into());
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
