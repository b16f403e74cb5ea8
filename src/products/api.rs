//! JSON API for products. Unguarded, like the category API.

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::AppError,
    images::{services::resolve_image, upload::MULTIPART_BODY_LIMIT},
    products::{dto::ProductSubmission, repo_types::Product},
    state::AppState,
    web::{ApiPath, ApiResponse, ListParams},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/product/api/products", get(list).post(create))
        .route(
            "/product/api/products/:id",
            get(show).put(update).delete(remove),
        )
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<Vec<Product>>, AppError> {
    let filter = params.product_filter()?;
    let products = state
        .products
        .list(&filter)
        .await
        .map_err(AppError::internal("Server error"))?;
    Ok(ApiResponse::list(products))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = state
        .products
        .get(id)
        .await
        .map_err(AppError::internal("Server error"))?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(ApiResponse::ok(product))
}

#[instrument(skip(state, submission))]
pub async fn create(
    State(state): State<AppState>,
    submission: ProductSubmission,
) -> Result<(StatusCode, ApiResponse<Product>), AppError> {
    let (mut input, image_url) = submission.fields.into_api_new()?;
    input.image = resolve_image(state.images.as_ref(), submission.image, image_url)
        .await
        .map_err(AppError::internal("Failed to create product"))?;

    let product = state
        .products
        .create(input)
        .await
        .map_err(AppError::internal("Failed to create product"))?;
    info!(product_id = %product.id, "product created via api");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(product).with_message("Product created successfully"),
    ))
}

#[instrument(skip(state, submission))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    submission: ProductSubmission,
) -> Result<ApiResponse<Product>, AppError> {
    let (mut patch, image_url) = submission.fields.into_patch()?;
    state
        .products
        .get(id)
        .await
        .map_err(AppError::internal("Failed to update product"))?
        .ok_or(AppError::NotFound("Product"))?;

    patch.image = resolve_image(state.images.as_ref(), submission.image, image_url)
        .await
        .map_err(AppError::internal("Failed to update product"))?;
    let product = state
        .products
        .update(id, patch)
        .await
        .map_err(AppError::internal("Failed to update product"))?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(ApiResponse::ok(product).with_message("Product updated successfully"))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = state
        .products
        .delete(id)
        .await
        .map_err(AppError::internal("Failed to delete product"))?
        .ok_or(AppError::NotFound("Product"))?;
    info!(product_id = %id, "product deleted via api");
    Ok(ApiResponse::ok(product).with_message("Product deleted successfully"))
}
