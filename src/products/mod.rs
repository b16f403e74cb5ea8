use axum::Router;

use crate::state::AppState;

pub mod api;
pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::form_routes())
        .merge(api::api_routes())
}
