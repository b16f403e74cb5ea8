use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header,
    response::Response,
    Form, Json,
};
use serde::de::DeserializeOwned;

use super::negotiate::{is_json_mime, ResponseFormat};
use crate::error::AppError;

/// Request body accepted either as JSON or as an urlencoded form, depending
/// on the declared content type. A body that cannot be read is a 400 in the
/// format the client negotiated.
#[derive(Debug)]
pub struct Payload<T>(pub T);

pub(crate) fn has_json_body(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_mime)
}

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let format = ResponseFormat::from_headers(req.headers());
        let parsed = if has_json_body(&req) {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| value)
                .map_err(|e| e.body_text())
        } else {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| value)
                .map_err(|e| e.body_text())
        };
        parsed
            .map(Self)
            .map_err(|msg| format.error(AppError::validation(msg)))
    }
}
