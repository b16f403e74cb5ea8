//! JSON API for categories.
//!
//! These routes carry no auth guard, unlike the form surface which requires
//! the admin role for every mutation.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    categories::{dto::CategoryForm, repo_types::Category},
    error::AppError,
    state::AppState,
    web::{ApiPath, ApiResponse, ListParams, Payload},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/category/api/categories", get(list).post(create))
        .route(
            "/category/api/categories/:id",
            get(show).put(update).delete(remove),
        )
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<Vec<Category>>, AppError> {
    let filter = params.category_filter()?;
    let categories = state
        .categories
        .list(&filter)
        .await
        .map_err(AppError::internal("Server error"))?;
    Ok(ApiResponse::list(categories))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Category>, AppError> {
    let category = state
        .categories
        .get(id)
        .await
        .map_err(AppError::internal("Server error"))?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(ApiResponse::ok(category))
}

#[instrument(skip(state, form))]
pub async fn create(
    State(state): State<AppState>,
    Payload(form): Payload<CategoryForm>,
) -> Result<(StatusCode, ApiResponse<Category>), AppError> {
    let input = form.into_new()?;
    let category = state
        .categories
        .create(input)
        .await
        .map_err(AppError::internal("Failed to create category"))?;
    info!(category_id = %category.id, "category created via api");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(category).with_message("Category created successfully"),
    ))
}

#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    Payload(form): Payload<CategoryForm>,
) -> Result<ApiResponse<Category>, AppError> {
    let patch = form.into_patch()?;
    let category = state
        .categories
        .update(id, patch)
        .await
        .map_err(AppError::internal("Failed to update category"))?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(ApiResponse::ok(category).with_message("Category updated successfully"))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Category>, AppError> {
    let category = state
        .categories
        .delete(id)
        .await
        .map_err(AppError::internal("Failed to delete category"))?
        .ok_or(AppError::NotFound("Category"))?;
    info!(category_id = %id, "category deleted via api");
    Ok(ApiResponse::ok(category).with_message("Category deleted successfully"))
}
