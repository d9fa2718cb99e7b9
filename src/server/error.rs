//! HTTP mapping of [`Error`].
//!
//! Callers see a status code and, for validation failures and lookups, a short
//! message. Driver and upstream details go to the log only.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn body(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

impl Error {
    /// Status code returned for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::SEE_OTHER,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Constraint { .. } | Self::DuplicateUsername { .. } => StatusCode::CONFLICT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::AccountProvisioning { .. }
            | Self::PasswordHash(_)
            | Self::Config { .. }
            | Self::Database(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Unauthenticated => Redirect::to("/login").into_response(),
            Self::Validation { message } => body(status, message),
            Self::InvalidCredentials | Self::Forbidden | Self::NotFound { .. } => {
                body(status, self.to_string())
            }
            Self::Constraint { .. } | Self::DuplicateUsername { .. } => {
                warn!(error = %self, "Write rejected by a constraint");
                body(status, "The request conflicts with existing data")
            }
            Self::Upstream { .. } => {
                error!(error = %self, "Upstream failure");
                body(status, "A dependent service failed")
            }
            _ => {
                error!(error = %self, "Request failed");
                body(status, "Internal server error")
            }
        }
    }
}
