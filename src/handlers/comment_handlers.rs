use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, AppJson};
use crate::models::Post;
use crate::repositories::{comment_repository, post_repository};
use crate::response::ApiResponse;
use crate::store::Store;
use crate::utils::PageParams;
use crate::AppState;

const MAX_COMMENT_LENGTH: usize = 1000;
const MAX_REASON_LENGTH: usize = 500;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentData {
    pub text: String,
    #[serde(default)]
    pub parent_comment: Option<Uuid>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCommentData {
    pub text: String,
}

#[derive(Deserialize, Debug)]
pub struct ReportCommentData {
    pub reason: String,
}

fn validate_text(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::validation("Comment text cannot be empty"));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::validation(format!(
            "Comment cannot exceed {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Resolves the post and the `commentSection` block every comment route hangs
/// off, enforcing the shared precondition order: post exists, comments
/// enabled, block exists and is a comment section.
async fn resolve_comment_block(
    store: &Store,
    post_id: Uuid,
    block_id: &str,
) -> Result<Post, ApiError> {
    let post = post_repository::get_post_by_id(store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    if !post.is_comment_enabled {
        return Err(ApiError::forbidden("Comments are disabled for this post"));
    }
    post.find_comment_section(block_id)
        .ok_or_else(|| ApiError::not_found("Comment section not found"))?;
    Ok(post)
}

pub async fn list_comments_handler(
    State(state): State<AppState>,
    Path((post_id, block_id)): Path<(Uuid, String)>,
    Query(pagination): Query<PageParams>,
) -> Result<Response, ApiError> {
    resolve_comment_block(&state.store, post_id, &block_id).await?;
    let page =
        comment_repository::list_comment_tree(&state.store, post_id, &block_id, &pagination).await;
    Ok(Json(page).into_response())
}

pub async fn add_comment_handler(
    State(state): State<AppState>,
    Path((post_id, block_id)): Path<(Uuid, String)>,
    caller: AuthenticatedUser,
    AppJson(payload): AppJson<AddCommentData>,
) -> Result<Response, ApiError> {
    let post = resolve_comment_block(&state.store, post_id, &block_id).await?;
    validate_text(&payload.text)?;
    if let Some(parent_id) = payload.parent_comment {
        let parent = comment_repository::get_comment_by_id(&state.store, parent_id)
            .await
            .ok_or_else(|| ApiError::not_found("Parent comment not found"))?;
        if parent.post != post.id || parent.block_id != block_id {
            return Err(ApiError::not_found("Parent comment not found"));
        }
    }
    let node = comment_repository::create_comment(
        &state.store,
        post_id,
        block_id,
        caller.id,
        payload.text,
        payload.parent_comment,
    )
    .await;
    info!(comment_id = %node.id, post_id = %post_id, "added comment");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(node))).into_response())
}

/// Owner or admin may edit. Blank replacement text keeps the old text.
pub async fn update_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    caller: AuthenticatedUser,
    AppJson(payload): AppJson<UpdateCommentData>,
) -> Result<Response, ApiError> {
    let comment = comment_repository::get_comment_by_id(&state.store, comment_id)
        .await
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    if comment.user != caller.id && !caller.is_admin() {
        return Err(ApiError::unauthorized("Not authorized to update this comment"));
    }
    let text = if payload.text.trim().is_empty() {
        comment.text.clone()
    } else {
        validate_text(&payload.text)?;
        payload.text
    };
    let node = comment_repository::update_text(&state.store, comment_id, text)
        .await
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    Ok(Json(ApiResponse::new(node)).into_response())
}

/// One-level cascade: the comment and its direct replies, nothing deeper.
/// Allowed for the comment's author, an admin, or the post's author.
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    caller: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let comment = comment_repository::get_comment_by_id(&state.store, comment_id)
        .await
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    let post_author = post_repository::get_post_by_id(&state.store, comment.post)
        .await
        .map(|p| p.author);
    let allowed =
        comment.user == caller.id || caller.is_admin() || post_author == Some(caller.id);
    if !allowed {
        return Err(ApiError::unauthorized("Not authorized to delete this comment"));
    }
    let deleted = comment_repository::delete_one_level(&state.store, comment_id)
        .await
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;
    info!(comment_id = %comment_id, deleted, "deleted comment");
    Ok(Json(json!({ "success": true, "data": { "deletedCount": deleted } })).into_response())
}

pub async fn report_comment_handler(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    caller: AuthenticatedUser,
    AppJson(payload): AppJson<ReportCommentData>,
) -> Result<Response, ApiError> {
    let reason = payload.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::validation("A report reason is required"));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(ApiError::validation(format!(
            "Reason cannot exceed {MAX_REASON_LENGTH} characters"
        )));
    }
    let report_count =
        comment_repository::report_comment(&state.store, comment_id, caller.id, reason).await?;
    Ok(Json(json!({ "success": true, "data": { "reportCount": report_count } })).into_response())
}
