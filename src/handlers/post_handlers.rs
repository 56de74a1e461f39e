use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, PublisherUser};
use crate::blocks::BlockInput;
use crate::error::{ApiError, AppJson};
use crate::models::{BlockContent, CommentSettings, Post};
use crate::query::{self, ListQuery};
use crate::repositories::{
    comment_repository,
    post_repository::{self, CreatePostData, UpdatePostData},
};
use crate::response::ApiResponse;
use crate::AppState;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_EXCERPT_LENGTH: usize = 500;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InitCommentSectionData {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub require_auth: Option<bool>,
    #[serde(default)]
    pub is_nested: Option<bool>,
}

/// Serializes a post with its author and category references expanded into
/// display objects, the shape list and detail endpoints respond with.
pub(crate) fn populate_post(state: &AppState, post: &Post) -> Result<Value, ApiError> {
    let mut value =
        serde_json::to_value(post).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        if let Some(author) = state.store.get_user(post.author) {
            map.insert(
                "author".to_string(),
                json!({ "id": author.id, "name": author.name, "email": author.email }),
            );
        }
        let categories: Vec<Value> = post
            .categories
            .iter()
            .filter_map(|id| state.store.get_category(*id))
            .map(|c| json!({ "id": c.id, "name": c.name, "slug": c.slug }))
            .collect();
        map.insert("categories".to_string(), Value::Array(categories));
    }
    Ok(value)
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::validation("Title cannot be empty"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::validation(format!(
            "Title cannot exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_excerpt(excerpt: &str) -> Result<(), ApiError> {
    if excerpt.chars().count() > MAX_EXCERPT_LENGTH {
        return Err(ApiError::validation(format!(
            "Excerpt cannot exceed {MAX_EXCERPT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Owner-or-admin gate shared by every post mutation. Ownership failures are
/// `Unauthorized`, not `Forbidden`.
pub(crate) fn require_post_access(post: &Post, caller: &AuthenticatedUser) -> Result<(), ApiError> {
    if post.author == caller.id || caller.is_admin() {
        Ok(())
    } else {
        Err(ApiError::unauthorized("Not authorized to modify this post"))
    }
}

pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
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

pub async fn get_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    // bump first so the response carries the incremented counter
    post_repository::increment_view_count(&state.store, post_id).await;
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    debug!(post_id = %post_id, view_count = post.view_count, "fetched post");
    Ok(Json(ApiResponse::new(populate_post(&state, &post)?)).into_response())
}

pub async fn create_post_handler(
    State(state): State<AppState>,
    PublisherUser(caller): PublisherUser,
    AppJson(payload): AppJson<CreatePostData>,
) -> Result<Response, ApiError> {
    validate_title(&payload.title)?;
    if let Some(excerpt) = &payload.excerpt {
        validate_excerpt(excerpt)?;
    }
    let post = post_repository::create_post(&state.store, caller.id, payload).await?;
    info!(post_id = %post.id, slug = %post.slug, author_id = %caller.id, "created post");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(populate_post(&state, &post)?)),
    )
        .into_response())
}

pub async fn update_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
    AppJson(payload): AppJson<UpdatePostData>,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    if let Some(excerpt) = &payload.excerpt {
        validate_excerpt(excerpt)?;
    }
    let post = post_repository::update_post(&state.store, post_id, payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(Json(ApiResponse::new(populate_post(&state, &post)?)).into_response())
}

/// Fixed deletion order: ownership, then the post's comments, then the post.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;

    let deleted_comments = comment_repository::delete_for_post(&state.store, post_id).await;
    post_repository::delete_post(&state.store, post_id).await;
    for block in &post.content_blocks {
        if let Some(url) = block.content.media_url() {
            if let Err(e) = state.media.delete_media(url).await {
                warn!(url = %url, error = %e, "failed to remove stored media file");
            }
        }
    }
    info!(post_id = %post_id, deleted_comments, "deleted post");
    Ok(Json(json!({ "success": true, "data": {} })).into_response())
}

pub async fn toggle_comments_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;
    let enabled = post_repository::toggle_comments(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    Ok(Json(json!({ "success": true, "data": { "isCommentEnabled": enabled } })).into_response())
}

/// Appends a fresh `commentSection` block with the requested settings.
pub async fn init_comment_section_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
    AppJson(payload): AppJson<InitCommentSectionData>,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;

    let mut settings = CommentSettings::default();
    if let Some(require_auth) = payload.require_auth {
        settings.require_auth = require_auth;
    }
    if let Some(is_nested) = payload.is_nested {
        settings.is_nested = is_nested;
    }
    let (block, _) = post_repository::upsert_block(
        &state.store,
        post_id,
        BlockInput {
            block_id: None,
            content: BlockContent::CommentSection {
                comment_settings: settings,
            },
            position: payload.position,
        },
    )
    .await?;
    info!(post_id = %post_id, block_id = %block.block_id, "initialized comment section");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(block))).into_response())
}

pub async fn comment_stats_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;
    let stats = comment_repository::stats_for_post(&state.store, post_id).await;
    Ok(Json(json!({ "success": true, "count": stats.len(), "data": stats })).into_response())
}
