//! Form surface for products.

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::guards::{RequireAdmin, RequireAuth},
    categories::repo_types::Category,
    error::{AppError, FormError},
    images::{services::resolve_image, upload::MULTIPART_BODY_LIMIT},
    products::dto::{Flash, ProductEditView, ProductFormView, ProductListView, ProductSubmission},
    render::render_page,
    state::AppState,
    web::{ListFilter, ListParams},
};

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/product", get(list_page))
        .route("/product/add", get(add_page).post(add))
        .route("/product/edit/:id", get(edit_page).post(edit))
        .route("/product/delete/:id", get(delete))
        .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT))
}

async fn all_categories(state: &AppState) -> Result<Vec<Category>, AppError> {
    state
        .categories
        .list(&ListFilter::default())
        .await
        .map_err(AppError::internal("Server error"))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn list_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, FormError> {
    let filter = params.product_filter()?;
    let products = state
        .products
        .list(&filter)
        .await
        .map_err(AppError::internal("Server error"))?;
    let categories = all_categories(&state).await?;

    let view = ProductListView::new(products, categories, user.is_admin(), &filter, flash.success);
    Ok(render_page(state.renderer.as_ref(), "product/index", "Products", &view)?)
}

pub async fn add_page(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Html<String>, FormError> {
    let view = ProductFormView {
        category_list: all_categories(&state).await?,
    };
    Ok(render_page(state.renderer.as_ref(), "product/add", "Add product", &view)?)
}

#[instrument(skip(state, admin, submission), fields(admin = %admin.username))]
pub async fn add(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    submission: Result<ProductSubmission, AppError>,
) -> Result<Redirect, FormError> {
    let ProductSubmission { fields, image } = submission?;
    let (mut input, image_url) = fields.into_form_new()?;
    input.image = resolve_image(state.images.as_ref(), image, image_url)
        .await
        .map_err(AppError::internal("Error adding product"))?;

    let product = state
        .products
        .create(input)
        .await
        .map_err(AppError::internal("Error adding product"))?;
    info!(product_id = %product.id, "product created");
    Ok(Redirect::to("/product?success=added"))
}

pub async fn edit_page(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, FormError> {
    let product = state
        .products
        .get(id)
        .await
        .map_err(AppError::internal("Server error"))?
        .ok_or(AppError::NotFound("Product"))?;
    let view = ProductEditView {
        product,
        category_list: all_categories(&state).await?,
    };
    Ok(render_page(state.renderer.as_ref(), "product/edit", "Edit product", &view)?)
}

#[instrument(skip(state, admin, submission), fields(admin = %admin.username))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    submission: Result<ProductSubmission, AppError>,
) -> Result<Redirect, FormError> {
    let ProductSubmission { fields, image } = submission?;
    let (mut patch, image_url) = fields.into_form_patch()?;

    state
        .products
        .get(id)
        .await
        .map_err(AppError::internal("Error updating product"))?
        .ok_or(AppError::NotFound("Product"))?;

    patch.image = resolve_image(state.images.as_ref(), image, image_url)
        .await
        .map_err(AppError::internal("Error updating product"))?;
    state
        .products
        .update(id, patch)
        .await
        .map_err(AppError::internal("Error updating product"))?
        .ok_or(AppError::NotFound("Product"))?;
    info!(product_id = %id, "product updated");
    Ok(Redirect::to("/product?success=updated"))
}

#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Redirect, FormError> {
    let deleted = state
        .products
        .delete(id)
        .await
        .map_err(AppError::internal("Error deleting product"))?;
    info!(product_id = %id, existed = deleted.is_some(), "product deleted");
    Ok(Redirect::to("/product?success=deleted"))
}
