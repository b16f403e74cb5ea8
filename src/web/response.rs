use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::dto::SessionUser;

/// JSON envelope shared by every API endpoint:
/// `{ success, data?, message?, error?, count? }`, plus the identity fields
/// used by the auth endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl<T> ApiResponse<T> {
    fn bare(success: bool) -> Self {
        Self {
            success,
            data: None,
            message: None,
            error: None,
            count: None,
            authenticated: None,
            user: None,
        }
    }

    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::bare(true)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_user(mut self, user: Option<SessionUser>) -> Self {
        self.user = user;
        self
    }

    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = Some(authenticated);
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::ok(items)
        }
    }
}

impl ApiResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self::bare(true).with_message(message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::bare(false).with_message(message)
    }

    pub fn empty() -> Self {
        Self::bare(true)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
