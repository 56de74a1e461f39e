use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use crate::blocks::{self, BlockInput};
use crate::error::ApiError;
use crate::models::{BlockContent, ContentBlock, Post, PostStatus};
use crate::slug;
use crate::store::Store;

// Excerpts derived from content are capped at this many characters.
const DERIVED_EXCERPT_LEN: usize = 160;

/// Input data for creating a new post. The author comes from the
/// authenticated caller, never the payload.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostData {
    pub title: String,
    #[serde(default)]
    pub content_blocks: Option<Vec<BlockInput>>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub categories: Option<Vec<Uuid>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_comment_enabled: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content_blocks: Option<Vec<BlockInput>>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub categories: Option<Vec<Uuid>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub is_comment_enabled: Option<bool>,
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>?").expect("static regex"))
}

/// Derives an excerpt from the first `text` block: HTML tags stripped, first
/// 160 characters, `...` appended when truncated.
pub fn derive_excerpt(content_blocks: &[ContentBlock]) -> Option<String> {
    let text = content_blocks.iter().find_map(|b| match &b.content {
        BlockContent::Text { text } => Some(text.as_str()),
        _ => None,
    })?;
    let plain = tag_pattern().replace_all(text, "");
    let plain = plain.trim();
    if plain.is_empty() {
        return None;
    }
    let truncated: String = plain.chars().take(DERIVED_EXCERPT_LEN).collect();
    if plain.chars().count() > DERIVED_EXCERPT_LEN {
        Some(format!("{truncated}..."))
    } else {
        Some(truncated)
    }
}

/// Derives a collision-free slug for `title` among the author's posts,
/// optionally excluding one post (the one being updated).
fn assign_slug(store: &Store, author: Uuid, title: &str, exclude: Option<Uuid>) -> String {
    let base = slug::slugify(title);
    let base = if base.is_empty() { "post".to_string() } else { base };
    let existing: Vec<String> = store
        .posts_by_author(author)
        .into_iter()
        .filter(|p| Some(p.id) != exclude)
        .map(|p| p.slug)
        .collect();
    slug::dedupe(&base, existing.iter().map(String::as_str))
}

/// Builds and inserts a new post: blocks normalized to contiguous positions,
/// slug de-duplicated per author, `published_at` set when created already
/// published. The storage-level (author, slug) unique index remains the
/// authoritative check; a lost race surfaces as `Conflict`.
pub async fn create_post(
    store: &Store,
    author: Uuid,
    data: CreatePostData,
) -> Result<Post, ApiError> {
    let now = Utc::now();
    let status = data.status.unwrap_or_default();
    let content_blocks = blocks::normalize_blocks(data.content_blocks.unwrap_or_default());
    let excerpt = data
        .excerpt
        .filter(|e| !e.trim().is_empty())
        .or_else(|| derive_excerpt(&content_blocks));

    let post = Post {
        id: Uuid::new_v4(),
        slug: assign_slug(store, author, &data.title, None),
        title: data.title,
        content_blocks,
        excerpt,
        status,
        categories: data.categories.unwrap_or_default(),
        tags: data.tags.unwrap_or_default(),
        author,
        published_at: (status == PostStatus::Published).then_some(now),
        view_count: 0,
        is_comment_enabled: data.is_comment_enabled.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    store.insert_post(post.clone())?;
    Ok(post)
}

pub async fn get_post_by_id(store: &Store, post_id: Uuid) -> Option<Post> {
    store.get_post(post_id)
}

pub async fn list_posts(store: &Store) -> Vec<Post> {
    store.posts()
}

/// Applies a partial update. The slug is regenerated only when the title
/// actually changes, with the post itself excluded from the collision scan;
/// `published_at` is set once, on the first transition into `published`.
pub async fn update_post(
    store: &Store,
    post_id: Uuid,
    data: UpdatePostData,
) -> Result<Option<Post>, ApiError> {
    let Some(mut post) = store.get_post(post_id) else {
        return Ok(None);
    };

    if let Some(title) = data.title {
        if title != post.title {
            post.slug = assign_slug(store, post.author, &title, Some(post.id));
            post.title = title;
        }
    }
    if let Some(inputs) = data.content_blocks {
        post.content_blocks = blocks::normalize_blocks(inputs);
    }
    if let Some(excerpt) = data.excerpt {
        post.excerpt = Some(excerpt);
    }
    if let Some(status) = data.status {
        if status == PostStatus::Published && post.published_at.is_none() {
            post.published_at = Some(Utc::now());
        }
        post.status = status;
    }
    if let Some(categories) = data.categories {
        post.categories = categories;
    }
    if let Some(tags) = data.tags {
        post.tags = tags;
    }
    if let Some(enabled) = data.is_comment_enabled {
        post.is_comment_enabled = enabled;
    }
    post.updated_at = Utc::now();

    store.replace_post(post.clone())?;
    Ok(Some(post))
}

pub async fn delete_post(store: &Store, post_id: Uuid) -> Option<Post> {
    store.remove_post(post_id)
}

/// Best-effort view counter bump on single-post fetches; lost updates under
/// concurrency are accepted.
pub async fn increment_view_count(store: &Store, post_id: Uuid) {
    store.update_post(post_id, |post| {
        post.view_count += 1;
    });
}

pub async fn toggle_comments(store: &Store, post_id: Uuid) -> Option<bool> {
    store.update_post(post_id, |post| {
        post.is_comment_enabled = !post.is_comment_enabled;
        post.updated_at = Utc::now();
        post.is_comment_enabled
    })
}

/// Upserts one content block (see [`Post::set_block`]) and returns the block
/// plus the post's full re-sorted block list.
pub async fn upsert_block(
    store: &Store,
    post_id: Uuid,
    input: BlockInput,
) -> Result<(ContentBlock, Vec<ContentBlock>), ApiError> {
    store
        .update_post(post_id, |post| {
            let block = post.set_block(input.block_id, input.content, input.position)?;
            post.updated_at = Utc::now();
            Ok((block, post.content_blocks.clone()))
        })
        .ok_or_else(|| ApiError::not_found("Post not found"))?
}

/// Removes a block, returning the removed block and the surviving list
/// (positions keep their gaps).
pub async fn remove_block(
    store: &Store,
    post_id: Uuid,
    block_id: &str,
) -> Result<(ContentBlock, Vec<ContentBlock>), ApiError> {
    store
        .update_post(post_id, |post| {
            let removed = post
                .remove_block(block_id)
                .ok_or_else(|| ApiError::not_found("Content block not found"))?;
            post.updated_at = Utc::now();
            Ok((removed, post.content_blocks.clone()))
        })
        .ok_or_else(|| ApiError::not_found("Post not found"))?
}

/// Attaches an uploaded media URL (plus caption/alt text) to an `image` or
/// `video` block.
pub async fn set_block_media(
    store: &Store,
    post_id: Uuid,
    block_id: &str,
    url: String,
    alt_text: Option<String>,
    caption: Option<String>,
) -> Result<ContentBlock, ApiError> {
    store
        .update_post(post_id, |post| {
            post.updated_at = Utc::now();
            let block = post
                .find_block_mut(block_id)
                .ok_or_else(|| ApiError::not_found("Content block not found"))?;
            match &mut block.content {
                BlockContent::Image {
                    media_url,
                    alt_text: block_alt,
                    caption: block_caption,
                } => {
                    *media_url = url;
                    *block_alt = alt_text;
                    *block_caption = caption;
                }
                BlockContent::Video {
                    media_url,
                    caption: block_caption,
                } => {
                    *media_url = url;
                    *block_caption = caption;
                }
                _ => {
                    return Err(ApiError::validation(
                        "Content block does not hold media",
                    ))
                }
            }
            Ok(block.clone())
        })
        .ok_or_else(|| ApiError::not_found("Post not found"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockContent;

    fn text_block(body: &str, position: u32) -> ContentBlock {
        ContentBlock {
            block_id: blocks::new_block_id(),
            content: BlockContent::Text { text: body.into() },
            position,
        }
    }

    #[test]
    fn derive_excerpt_strips_tags_and_truncates() {
        let long = format!("<p>{}</p>", "word ".repeat(100));
        let blocks = vec![text_block(&long, 0)];
        let excerpt = derive_excerpt(&blocks).unwrap();
        assert!(excerpt.ends_with("..."));
        assert!(!excerpt.contains('<'));
        assert_eq!(excerpt.chars().count(), DERIVED_EXCERPT_LEN + 3);
    }

    #[test]
    fn derive_excerpt_short_text_kept_verbatim() {
        let blocks = vec![text_block("<b>short</b> body", 0)];
        assert_eq!(derive_excerpt(&blocks).unwrap(), "short body");
    }

    #[test]
    fn derive_excerpt_skips_non_text_blocks() {
        let blocks = vec![
            ContentBlock {
                block_id: "d".into(),
                content: BlockContent::Divider,
                position: 0,
            },
            text_block("from the text block", 1),
        ];
        assert_eq!(derive_excerpt(&blocks).unwrap(), "from the text block");
    }

    #[test]
    fn derive_excerpt_none_without_text() {
        assert_eq!(derive_excerpt(&[]), None);
    }

    #[tokio::test]
    async fn create_assigns_sequential_slugs_per_author() {
        let store = Store::new();
        let author = Uuid::new_v4();
        let data = |title: &str| CreatePostData {
            title: title.into(),
            content_blocks: None,
            excerpt: None,
            status: None,
            categories: None,
            tags: None,
            is_comment_enabled: None,
        };

        let first = create_post(&store, author, data("Hello World")).await.unwrap();
        let second = create_post(&store, author, data("Hello World")).await.unwrap();
        let third = create_post(&store, author, data("Hello World")).await.unwrap();
        assert_eq!(first.slug, "hello-world");
        assert_eq!(second.slug, "hello-world-2");
        assert_eq!(third.slug, "hello-world-3");

        // a different author is unaffected
        let other = create_post(&store, Uuid::new_v4(), data("Hello World"))
            .await
            .unwrap();
        assert_eq!(other.slug, "hello-world");
    }

    #[tokio::test]
    async fn update_keeps_slug_when_title_unchanged() {
        let store = Store::new();
        let author = Uuid::new_v4();
        let post = create_post(
            &store,
            author,
            CreatePostData {
                title: "Stable".into(),
                content_blocks: None,
                excerpt: None,
                status: None,
                categories: None,
                tags: None,
                is_comment_enabled: None,
            },
        )
        .await
        .unwrap();

        let updated = update_post(
            &store,
            post.id,
            UpdatePostData {
                title: Some("Stable".into()),
                content_blocks: None,
                excerpt: None,
                status: None,
                categories: None,
                tags: Some(vec!["x".into()]),
                is_comment_enabled: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.slug, "stable");
    }

    #[tokio::test]
    async fn publish_timestamp_set_once() {
        let store = Store::new();
        let author = Uuid::new_v4();
        let post = create_post(
            &store,
            author,
            CreatePostData {
                title: "Draft first".into(),
                content_blocks: None,
                excerpt: None,
                status: None,
                categories: None,
                tags: None,
                is_comment_enabled: None,
            },
        )
        .await
        .unwrap();
        assert!(post.published_at.is_none());

        let publish = |status| UpdatePostData {
            title: None,
            content_blocks: None,
            excerpt: None,
            status: Some(status),
            categories: None,
            tags: None,
            is_comment_enabled: None,
        };
        let published = update_post(&store, post.id, publish(PostStatus::Published))
            .await
            .unwrap()
            .unwrap();
        let first_publish = published.published_at.unwrap();

        // archive then republish: timestamp does not move
        update_post(&store, post.id, publish(PostStatus::Archived))
            .await
            .unwrap();
        let republished = update_post(&store, post.id, publish(PostStatus::Published))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(republished.published_at.unwrap(), first_publish);
    }

    #[tokio::test]
    async fn media_assignment_updates_block_and_timestamp() {
        let store = Store::new();
        let post = create_post(
            &store,
            Uuid::new_v4(),
            CreatePostData {
                title: "With image".into(),
                content_blocks: Some(vec![BlockInput {
                    block_id: Some("img".into()),
                    content: BlockContent::Image {
                        media_url: String::new(),
                        alt_text: None,
                        caption: None,
                    },
                    position: None,
                }]),
                excerpt: None,
                status: None,
                categories: None,
                tags: None,
                is_comment_enabled: None,
            },
        )
        .await
        .unwrap();

        let block = set_block_media(
            &store,
            post.id,
            "img",
            "/uploads/pic.png".into(),
            Some("a picture".into()),
            None,
        )
        .await
        .unwrap();
        match block.content {
            BlockContent::Image {
                media_url,
                alt_text,
                ..
            } => {
                assert_eq!(media_url, "/uploads/pic.png");
                assert_eq!(alt_text.as_deref(), Some("a picture"));
            }
            other => panic!("unexpected block content: {other:?}"),
        }
        let stored = store.get_post(post.id).unwrap();
        assert!(stored.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn media_assignment_rejects_text_blocks() {
        let store = Store::new();
        let post = create_post(
            &store,
            Uuid::new_v4(),
            CreatePostData {
                title: "Text only".into(),
                content_blocks: Some(vec![BlockInput {
                    block_id: Some("t1".into()),
                    content: BlockContent::Text { text: "body".into() },
                    position: None,
                }]),
                excerpt: None,
                status: None,
                categories: None,
                tags: None,
                is_comment_enabled: None,
            },
        )
        .await
        .unwrap();

        let err = set_block_media(&store, post.id, "t1", "/uploads/x.png".into(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
