use crate::state::AppState;
use axum::{routing::get, Router};

pub mod dto;
pub mod guards;
pub mod handlers;
pub(crate) mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home))
        .merge(handlers::user_routes())
}
