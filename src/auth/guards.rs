//! Route guards. Each guard is an extractor, so a rejected request never
//! reaches the handler body.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::warn;

use crate::{
    auth::{dto::SessionUser, services::session_user},
    error::AppError,
    web::ResponseFormat,
};

async fn identity<S>(parts: &mut Parts, state: &S) -> Result<Option<SessionUser>, Response>
where
    S: Send + Sync,
{
    let session = Session::from_request_parts(parts, state)
        .await
        .map_err(IntoResponse::into_response)?;
    session_user(&session)
        .await
        .map_err(|e| AppError::from(e).into_response())
}

/// Requires a signed-in user. Browsers are sent to the login page, JSON
/// clients get a 401.
pub struct RequireAuth(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match identity(parts, state).await? {
            Some(user) => Ok(Self(user)),
            None => {
                warn!(path = %parts.uri.path(), "unauthenticated request");
                Err(match ResponseFormat::from_headers(&parts.headers) {
                    ResponseFormat::Json => AppError::Unauthenticated.into_response(),
                    ResponseFormat::Html => Redirect::to("/users/login").into_response(),
                })
            }
        }
    }
}

/// Requires the `admin` role. Anyone else, signed in or not, gets a 403.
pub struct RequireAdmin(pub SessionUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match identity(parts, state).await? {
            Some(user) if user.is_admin() => Ok(Self(user)),
            other => {
                warn!(
                    path = %parts.uri.path(),
                    username = other.as_ref().map(|u| u.username.as_str()),
                    "admin role required"
                );
                Err(ResponseFormat::from_headers(&parts.headers).error(AppError::Forbidden))
            }
        }
    }
}

/// The signed-in user, if any.
pub struct CurrentUser(pub Option<SessionUser>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(identity(parts, state).await.ok().flatten()))
    }
}
