//! Domain error to HTTP response conversion.
//!
//! Every domain error folds into [`AppError`] by its [`ErrorKind`]. The
//! domain's own error code is kept so clients can tell, say, an
//! incomplete submit from a malformed override.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use schoolplan_core::consolidation::ConsolidationError;
use schoolplan_core::error::ErrorKind;
use schoolplan_core::projection::ProjectionError;
use schoolplan_core::statements::StatementError;
use schoolplan_core::version::VersionError;
use schoolplan_core::workflow::WorkflowError;
use schoolplan_shared::AppError;

/// An error ready to be rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    code: &'static str,
}

impl ApiError {
    /// The transport-level error.
    #[must_use]
    pub const fn app_error(&self) -> &AppError {
        &self.error
    }

    /// The code rendered in the `error` field.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

fn from_kind(kind: ErrorKind, message: String) -> AppError {
    match kind {
        ErrorKind::Validation => AppError::Validation(message),
        ErrorKind::StateConflict => AppError::Conflict(message),
        ErrorKind::Aggregation => AppError::Aggregation(message),
        ErrorKind::Configuration => AppError::Configuration(message),
        ErrorKind::NotFound => AppError::NotFound(message),
        ErrorKind::Storage => AppError::Database(message),
    }
}

fn message(error: &AppError) -> &str {
    match error {
        AppError::NotFound(m)
        | AppError::Validation(m)
        | AppError::Conflict(m)
        | AppError::Aggregation(m)
        | AppError::Configuration(m)
        | AppError::Database(m)
        | AppError::Internal(m) => m,
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self {
            code: error.error_code(),
            error,
        }
    }
}

/// Unreadable or mistyped request bodies render like any other 400.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            code: "INVALID_REQUEST_BODY",
            error: AppError::Validation(rejection.body_text()),
        }
    }
}

macro_rules! impl_from_domain_error {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for ApiError {
                fn from(err: $ty) -> Self {
                    Self {
                        code: err.error_code(),
                        error: from_kind(err.kind(), err.to_string()),
                    }
                }
            }
        )+
    };
}

impl_from_domain_error!(
    VersionError,
    WorkflowError,
    ConsolidationError,
    ProjectionError,
    StatementError,
);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self.error, code = self.code, "Request failed");
            match self.error {
                AppError::Aggregation(ref m) => m.as_str(),
                _ => "An error occurred",
            }
        } else {
            if self.error.is_retryable() {
                warn!(error = %self.error, code = self.code, "Request rejected");
            }
            message(&self.error)
        };

        (
            status,
            Json(json!({
                "error": self.code,
                "message": message,
            })),
        )
            .into_response()
    }
}
