use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

use crate::web::response::ApiResponse;

/// Failure of a single request, mapped onto an HTTP status at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Access denied. Admin role required.")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{context}")]
    Internal {
        context: &'static str,
        reason: anyhow::Error,
    },
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// `map_err` adapter that tags a store failure with a client-facing message.
    pub fn internal(context: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |reason| Self::Internal { context, reason }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            Self::Internal { context, reason } => error!(error = %format!("{reason:#}"), "{context}"),
            other => warn!(status = %other.status(), error = %other, "request rejected"),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(reason: anyhow::Error) -> Self {
        Self::Internal {
            context: "Server error",
            reason,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let body = match self {
            Self::Internal { context, reason } => {
                // The underlying message is passed through to API clients.
                ApiResponse::failure(context).with_error(format!("{reason:#}"))
            }
            other => ApiResponse::failure(other.to_string()),
        };
        (status, body).into_response()
    }
}

/// [`AppError`] rendered for the form surface: plain text, or a redirect to
/// the login page when the caller is not signed in.
#[derive(Debug)]
pub struct FormError(pub AppError);

impl From<AppError> for FormError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<anyhow::Error> for FormError {
    fn from(err: anyhow::Error) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let err = self.0;
        err.log();
        match err {
            AppError::Unauthenticated => Redirect::to("/users/login").into_response(),
            AppError::Internal { context, reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{context}: {reason:#}"),
            )
                .into_response(),
            other => (other.status(), other.to_string()).into_response(),
        }
    }
}
