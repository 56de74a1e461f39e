use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::error::{ApiError, AppJson};
use crate::handlers::post_handlers::populate_post;
use crate::query::{self, ListQuery};
use crate::repositories::category_repository::{self, CreateCategoryData, UpdateCategoryData};
use crate::response::{ApiResponse, ListResponse};
use crate::utils::PageParams;
use crate::AppState;

const MAX_NAME_LENGTH: usize = 50;
const MAX_DESCRIPTION_LENGTH: usize = 500;

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("Category name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::validation(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::validation(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

pub async fn list_categories_handler(
    State(state): State<AppState>,
    Query(pagination): Query<PageParams>,
) -> Result<Response, ApiError> {
    let categories = category_repository::get_all_categories(&state.store, &pagination).await;
    Ok(Json(ListResponse::new(categories)).into_response())
}

pub async fn get_category_handler(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let category = category_repository::get_category_by_id(&state.store, category_id)
        .await
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(Json(ApiResponse::new(category)).into_response())
}

pub async fn create_category_handler(
    State(state): State<AppState>,
    AdminUser(_caller): AdminUser,
    AppJson(payload): AppJson<CreateCategoryData>,
) -> Result<Response, ApiError> {
    validate_name(&payload.name)?;
    if let Some(description) = &payload.description {
        validate_description(description)?;
    }
    let category = category_repository::create_category(&state.store, payload).await?;
    info!(category_id = %category.id, slug = %category.slug, "created category");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(category))).into_response())
}

pub async fn update_category_handler(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    AdminUser(_caller): AdminUser,
    AppJson(payload): AppJson<UpdateCategoryData>,
) -> Result<Response, ApiError> {
    if let Some(name) = &payload.name {
        validate_name(name)?;
    }
    if let Some(description) = &payload.description {
        validate_description(description)?;
    }
    let category = category_repository::update_category(&state.store, category_id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    Ok(Json(ApiResponse::new(category)).into_response())
}

pub async fn delete_category_handler(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    AdminUser(_caller): AdminUser,
) -> Result<Response, ApiError> {
    if !category_repository::delete_category(&state.store, category_id).await {
        return Err(ApiError::not_found("Category not found"));
    }
    info!(category_id = %category_id, "deleted category");
    Ok(Json(json!({ "success": true, "data": {} })).into_response())
}

/// `GET /categories/:id/posts`: the post list shaped like `GET /posts` but
/// pinned to one category.
pub async fn list_posts_in_category_handler(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Query(mut query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    category_repository::get_category_by_id(&state.store, category_id)
        .await
        .ok_or_else(|| ApiError::not_found("Category not found"))?;
    query.category = Some(category_id);

    let (page, total) = query::shape(state.store.posts(), &query);
    let mut data = Vec::with_capacity(page.len());
    for post in &page {
        let mut value = populate_post(&state, post)?;
        if let Some(select) = &query.select {
            value = query::select_fields(value, select);
        }
        data.push(value);
    }
    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "data": data,
    }))
    .into_response())
}
