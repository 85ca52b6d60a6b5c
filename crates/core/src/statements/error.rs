//! Statement request errors.

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors raised while interpreting a statement request.
#[derive(Debug, Error)]
pub enum StatementError {
    /// Unknown statement type.
    #[error("Invalid statement type '{0}'; expected income, balance or cashflow")]
    InvalidType(String),

    /// Unknown format.
    #[error("Invalid statement format '{0}'; expected PCG or IFRS")]
    InvalidFormat(String),

    /// Unknown period.
    #[error("Invalid period '{0}'; expected ANNUAL, T1/P1, T2/P2 or T3/SUMMER")]
    InvalidPeriod(String),
}

impl StatementError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
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
            Self::InvalidType(_) => "INVALID_STATEMENT_TYPE",
            Self::InvalidFormat(_) => "INVALID_STATEMENT_FORMAT",
            Self::InvalidPeriod(_) => "INVALID_PERIOD",
        }
    }
}
