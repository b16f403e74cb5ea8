use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, FormError};

/// How a request wants to be answered. Resolved once per request from its
/// headers; handlers branch on this value instead of inspecting headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Json,
    Html,
}

impl ResponseFormat {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let sends_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_mime);
        let accepts_json = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if sends_json || accepts_json {
            Self::Json
        } else {
            Self::Html
        }
    }

    /// Renders a failure the way this client expects it.
    pub fn error(self, err: AppError) -> Response {
        match self {
            Self::Json => err.into_response(),
            Self::Html => FormError(err).into_response(),
        }
    }
}

pub(crate) fn is_json_mime(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseFormat
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
