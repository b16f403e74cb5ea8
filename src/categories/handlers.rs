//! Form surface for categories: server-rendered pages and redirects.

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::guards::{RequireAdmin, RequireAuth},
    categories::dto::{CategoryEditView, CategoryForm, CategoryListView},
    error::{AppError, FormError},
    render::render_page,
    state::AppState,
    web::{ListParams, Payload},
};

pub fn form_routes() -> Router<AppState> {
    Router::new()
        .route("/category", get(list_page))
        .route("/category/add", get(add_page).post(add))
        .route("/category/edit/:id", get(edit_page).post(edit))
        // GET-triggered delete, kept for the existing admin pages.
        .route("/category/delete/:id", get(delete))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn list_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, FormError> {
    let filter = params.category_filter()?;
    let categories = state
        .categories
        .list(&filter)
        .await
        .map_err(AppError::internal("Server error"))?;

    let view = CategoryListView::new(categories, user.is_admin(), &filter);
    Ok(render_page(state.renderer.as_ref(), "category/index", "Categories", &view)?)
}

pub async fn add_page(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Html<String>, FormError> {
    Ok(render_page(state.renderer.as_ref(), "category/add", "Add category", &json!({}))?)
}

#[instrument(skip(state, admin, form), fields(admin = %admin.username))]
pub async fn add(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Payload(form): Payload<CategoryForm>,
) -> Result<Redirect, FormError> {
    let input = form.into_new()?;
    let category = state
        .categories
        .create(input)
        .await
        .map_err(AppError::internal("Error adding category"))?;
    info!(category_id = %category.id, "category created");
    Ok(Redirect::to("/category"))
}

pub async fn edit_page(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, FormError> {
    let category = state
        .categories
        .get(id)
        .await
        .map_err(AppError::internal("Server error"))?
        .ok_or(AppError::NotFound("Category"))?;
    Ok(render_page(
        state.renderer.as_ref(),
        "category/edit",
        "Edit category",
        &CategoryEditView { category },
    )?)
}

#[instrument(skip(state, admin, form), fields(admin = %admin.username))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Payload(form): Payload<CategoryForm>,
) -> Result<Redirect, FormError> {
    let patch = form.into_patch()?;
    state
        .categories
        .update(id, patch)
        .await
        .map_err(AppError::internal("Error updating category"))?
        .ok_or(AppError::NotFound("Category"))?;
    info!(category_id = %id, "category updated");
    Ok(Redirect::to("/category"))
}

#[instrument(skip(state, admin), fields(admin = %admin.username))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Redirect, FormError> {
    let deleted = state
        .categories
        .delete(id)
        .await
        .map_err(AppError::internal("Error deleting category"))?;
    info!(category_id = %id, existed = deleted.is_some(), "category deleted");
    Ok(Redirect::to("/category"))
}
