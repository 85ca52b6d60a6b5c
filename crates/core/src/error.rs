//! Error taxonomy shared by every planning module.
//!
//! Each domain error enum maps onto one [`ErrorKind`]; the API layer only
//! needs the kind to choose a status code.

use serde::Serialize;
use thiserror::Error;

use schoolplan_shared::types::VersionId;

use crate::workflow::types::VersionStatus;

/// Coarse error classification used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caller supplied something invalid or a precondition is unmet.
    Validation,
    /// Wrong workflow state or a concurrent operation collided.
    StateConflict,
    /// A planning module could not be read or returned malformed data.
    Aggregation,
    /// Overrides or catalogue reference grades/cycles that do not exist.
    Configuration,
    /// The addressed resource does not exist.
    NotFound,
    /// The backing store failed.
    Storage,
}

impl ErrorKind {
    /// Returns the HTTP status code conventionally used for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::StateConflict => 409,
            Self::Configuration => 422,
            Self::Aggregation => 502,
            Self::Storage => 500,
        }
    }
}

/// Errors raised by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name (e.g. "budget version").
        entity: &'static str,
        /// Identifier as text.
        id: String,
    },

    /// Compare-and-swap on version status lost the race.
    #[error("Version {version_id} is {actual}, expected {expected}")]
    StatusMismatch {
        /// The version whose status moved.
        version_id: VersionId,
        /// The status the caller read.
        expected: VersionStatus,
        /// The status found in the store.
        actual: VersionStatus,
    },

    /// Stored data could not be decoded.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Shorthand for a missing budget version.
    #[must_use]
    pub fn version_not_found(version_id: VersionId) -> Self {
        Self::NotFound {
            entity: "budget version",
            id: version_id.to_string(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StatusMismatch { .. } => ErrorKind::StateConflict,
            Self::Corrupt(_) | Self::Database(_) => ErrorKind::Storage,
        }
    }
}
