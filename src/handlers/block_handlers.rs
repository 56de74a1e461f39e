use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::PublisherUser;
use crate::blocks::BlockInput;
use crate::error::{ApiError, AppJson};
use crate::handlers::post_handlers::require_post_access;
use crate::repositories::{comment_repository, post_repository};
use crate::AppState;

/// `PUT /posts/:id/blocks`: upsert one content block. Responds with the
/// affected block and the post's full re-sorted block list.
pub async fn upsert_block_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    PublisherUser(caller): PublisherUser,
    AppJson(payload): AppJson<BlockInput>,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;

    let (block, content_blocks) =
        post_repository::upsert_block(&state.store, post_id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "data": { "block": block, "contentBlocks": content_blocks },
    }))
    .into_response())
}

/// `DELETE /posts/:id/blocks/:blockId`: remove one content block and respond
/// with the updated list. Removing a `commentSection` block cascade-deletes
/// the comments anchored to it.
pub async fn delete_block_handler(
    State(state): State<AppState>,
    Path((post_id, block_id)): Path<(Uuid, String)>,
    PublisherUser(caller): PublisherUser,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;

    let (removed, content_blocks) =
        post_repository::remove_block(&state.store, post_id, &block_id).await?;
    if removed.content.is_comment_section() {
        let deleted =
            comment_repository::delete_for_block(&state.store, post_id, &block_id).await;
        info!(post_id = %post_id, block_id = %block_id, deleted, "cascade-deleted block comments");
    }
    if let Some(url) = removed.content.media_url() {
        if let Err(e) = state.media.delete_media(url).await {
            warn!(url = %url, error = %e, "failed to remove stored media file");
        }
    }
    Ok(Json(json!({ "success": true, "data": content_blocks })).into_response())
}

/// `PUT /posts/:id/blocks/:blockId/media`: multipart upload attaching a media
/// file to an `image` or `video` block. Fields: `media` (the file, required),
/// `altText`, `caption`.
pub async fn upload_block_media_handler(
    State(state): State<AppState>,
    Path((post_id, block_id)): Path<(Uuid, String)>,
    PublisherUser(caller): PublisherUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let post = post_repository::get_post_by_id(&state.store, post_id)
        .await
        .ok_or_else(|| ApiError::not_found("Post not found"))?;
    require_post_access(&post, &caller)?;
    // reject early so rejected uploads never hit the disk
    post.find_block(&block_id)
        .ok_or_else(|| ApiError::not_found("Content block not found"))?;

    let mut media: Option<(axum::body::Bytes, Option<String>)> = None;
    let mut alt_text: Option<String> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "media" => {
                if let Some(content_type) = field.content_type() {
                    let ok = content_type
                        .parse::<mime::Mime>()
                        .map(|m| m.type_() == mime::IMAGE || m.type_() == mime::VIDEO)
                        .unwrap_or(false);
                    if !ok {
                        return Err(ApiError::validation(
                            "Media must be an image or video file",
                        ));
                    }
                }
                let filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read media field: {e}")))?;
                media = Some((bytes, filename));
            }
            "altText" => {
                alt_text = field.text().await.ok().filter(|t| !t.is_empty());
            }
            "caption" => {
                caption = field.text().await.ok().filter(|t| !t.is_empty());
            }
            other => {
                warn!(field = %other, "ignoring unknown multipart field");
            }
        }
    }

    let (bytes, filename) =
        media.ok_or_else(|| ApiError::validation("A media file is required"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation("Media file is empty"));
    }

    let url = state
        .media
        .save_media(bytes, filename)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store media: {e}")))?;
    let block =
        post_repository::set_block_media(&state.store, post_id, &block_id, url.clone(), alt_text, caption)
            .await?;
    info!(post_id = %post_id, block_id = %block_id, url = %url, "attached block media");
    Ok(Json(json!({ "success": true, "data": { "url": url, "block": block } })).into_response())
}
