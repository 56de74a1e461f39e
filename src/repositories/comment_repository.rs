use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Comment, CommentAuthor, CommentReport, ReplyDepth};
use crate::store::Store;
use crate::utils::PageParams;

/// One comment with its author populated and its replies materialized.
/// Replies nest to arbitrary depth; only the `depth` flag is shallow.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: Uuid,
    pub post: Uuid,
    pub block_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<CommentAuthor>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<Uuid>,
    pub depth: ReplyDepth,
    pub is_approved: bool,
    pub report_count: u32,
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentNode>,
}

/// One page of top-level comments with their full reply trees. `count` is the
/// number of roots on this page, `total` the number of roots overall.
#[derive(Serialize, Debug)]
pub struct CommentTreePage {
    pub success: bool,
    pub count: usize,
    pub total: usize,
    pub page: u64,
    pub pages: u64,
    pub data: Vec<CommentNode>,
}

/// Per-block comment totals for a post's stats endpoint.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BlockCommentStats {
    pub block_id: String,
    pub total_comments: usize,
    pub reported_comments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_comment_date: Option<DateTime<Utc>>,
}

fn node_from(comment: Comment, author: Option<CommentAuthor>) -> CommentNode {
    CommentNode {
        id: comment.id,
        post: comment.post,
        block_id: comment.block_id,
        user: author,
        text: comment.text,
        parent_comment: comment.parent_comment,
        depth: comment.depth,
        is_approved: comment.is_approved,
        report_count: comment.report_count,
        created_at: comment.created_at,
        replies: Vec::new(),
    }
}

fn author_for(store: &Store, user: Uuid) -> Option<CommentAuthor> {
    store.get_user(user).map(|u| CommentAuthor::from(&u))
}

/// Builds the paginated comment tree for one `commentSection` block.
///
/// Top-level comments are paginated newest-first; replies are fetched level by
/// level (oldest-first within each parent) and stitched together bottom-up.
/// The whole walk is iterative, so reply chains of any depth cannot blow the
/// stack.
pub async fn list_comment_tree(
    store: &Store,
    post_id: Uuid,
    block_id: &str,
    page: &PageParams,
) -> CommentTreePage {
    let mut roots: Vec<Comment> = store.comments_where(|c| {
        c.post == post_id && c.block_id == block_id && c.parent_comment.is_none()
    });
    roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = roots.len();
    let page_no = page.page();
    let roots: Vec<Comment> = roots
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();

    // Collect every descendant of the paged roots, one level at a time.
    let mut levels: Vec<Vec<Comment>> = vec![roots];
    loop {
        let parents: Vec<Uuid> = levels
            .last()
            .map(|level| level.iter().map(|c| c.id).collect())
            .unwrap_or_default();
        if parents.is_empty() {
            break;
        }
        let mut replies: Vec<Comment> = store.comments_where(|c| {
            c.parent_comment.map(|p| parents.contains(&p)).unwrap_or(false)
        });
        if replies.is_empty() {
            break;
        }
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        levels.push(replies);
    }

    // Assemble bottom-up: each level's nodes adopt the children built from
    // the level below before being grouped for their own parents.
    let mut children_of: HashMap<Uuid, Vec<CommentNode>> = HashMap::new();
    let mut data = Vec::new();
    while let Some(level) = levels.pop() {
        let is_root_level = levels.is_empty();
        let mut grouped: HashMap<Uuid, Vec<CommentNode>> = HashMap::new();
        for comment in level {
            let mut node = node_from(comment.clone(), author_for(store, comment.user));
            node.replies = children_of.remove(&node.id).unwrap_or_default();
            match comment.parent_comment {
                Some(parent) if !is_root_level => {
                    grouped.entry(parent).or_default().push(node)
                }
                _ => data.push(node),
            }
        }
        children_of = grouped;
    }

    CommentTreePage {
        success: true,
        count: data.len(),
        total,
        page: page_no,
        pages: page.pages(total as u64),
        data,
    }
}

/// Inserts a new comment. The depth flag only records whether the comment has
/// a parent at all; callers validate the post, block, and parent beforehand.
pub async fn create_comment(
    store: &Store,
    post_id: Uuid,
    block_id: String,
    user: Uuid,
    text: String,
    parent_comment: Option<Uuid>,
) -> CommentNode {
    let comment = Comment {
        id: Uuid::new_v4(),
        post: post_id,
        block_id,
        user,
        text,
        parent_comment,
        depth: if parent_comment.is_some() {
            ReplyDepth::Reply
        } else {
            ReplyDepth::Top
        },
        is_approved: true,
        report_count: 0,
        reports: Vec::new(),
        created_at: Utc::now(),
    };
    store.insert_comment(comment.clone());
    let author = author_for(store, comment.user);
    node_from(comment, author)
}

pub async fn get_comment_by_id(store: &Store, comment_id: Uuid) -> Option<Comment> {
    store.get_comment(comment_id)
}

pub async fn update_text(store: &Store, comment_id: Uuid, text: String) -> Option<CommentNode> {
    let updated = store.update_comment(comment_id, |comment| {
        comment.text = text;
    })?;
    let author = author_for(store, updated.user);
    Some(node_from(updated, author))
}

/// Deletes a comment and its direct replies only. Grandchildren and deeper
/// descendants are left in place (orphaned), never removed. Returns how many
/// comments were deleted, or `None` when the comment does not exist.
pub async fn delete_one_level(store: &Store, comment_id: Uuid) -> Option<u64> {
    let comment = store.remove_comment(comment_id)?;
    let children = store.remove_comments_where(|c| c.parent_comment == Some(comment.id));
    Some(1 + children)
}

/// Removes every comment on a post, across all of its blocks.
pub async fn delete_for_post(store: &Store, post_id: Uuid) -> u64 {
    store.remove_comments_where(|c| c.post == post_id)
}

/// Removes every comment anchored to one block of a post.
pub async fn delete_for_block(store: &Store, post_id: Uuid, block_id: &str) -> u64 {
    store.remove_comments_where(|c| c.post == post_id && c.block_id == block_id)
}

/// Files a report against a comment. Reports are not de-duplicated per user;
/// every call bumps the counter, appends the report, and clears approval.
pub async fn report_comment(
    store: &Store,
    comment_id: Uuid,
    user: Uuid,
    reason: String,
) -> Result<u32, ApiError> {
    store
        .update_comment(comment_id, |comment| {
            comment.report_count += 1;
            comment.is_approved = false;
            comment.reports.push(CommentReport {
                user,
                reason,
                reported_at: Utc::now(),
            });
        })
        .map(|c| c.report_count)
        .ok_or_else(|| ApiError::not_found("Comment not found"))
}

/// Aggregates per-block comment stats for a post, keyed by block id.
pub async fn stats_for_post(store: &Store, post_id: Uuid) -> Vec<BlockCommentStats> {
    let comments = store.comments_where(|c| c.post == post_id);
    let mut by_block: HashMap<String, BlockCommentStats> = HashMap::new();
    for comment in comments {
        let entry = by_block
            .entry(comment.block_id.clone())
            .or_insert_with(|| BlockCommentStats {
                block_id: comment.block_id.clone(),
                total_comments: 0,
                reported_comments: 0,
                last_comment_date: None,
            });
        entry.total_comments += 1;
        if comment.report_count > 0 {
            entry.reported_comments += 1;
        }
        if entry
            .last_comment_date
            .map(|d| comment.created_at > d)
            .unwrap_or(true)
        {
            entry.last_comment_date = Some(comment.created_at);
        }
    }
    let mut stats: Vec<BlockCommentStats> = by_block.into_values().collect();
    stats.sort_by(|a, b| a.block_id.cmp(&b.block_id));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_comment(
        store: &Store,
        post: Uuid,
        block: &str,
        parent: Option<Uuid>,
        text: &str,
    ) -> CommentNode {
        // keep created_at strictly increasing so ordering assertions hold
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        create_comment(store, post, block.into(), Uuid::new_v4(), text.into(), parent).await
    }

    #[tokio::test]
    async fn empty_block_yields_empty_page() {
        let store = Store::new();
        let page = list_comment_tree(&store, Uuid::new_v4(), "b1", &PageParams::default()).await;
        assert_eq!(page.count, 0);
        assert_eq!(page.total, 0);
        assert!(page.data.is_empty());
    }

    #[tokio::test]
    async fn replies_nest_beyond_the_depth_flag() {
        let store = Store::new();
        let post = Uuid::new_v4();
        let root = seed_comment(&store, post, "b1", None, "root").await;
        let child = seed_comment(&store, post, "b1", Some(root.id), "child").await;
        let grandchild = seed_comment(&store, post, "b1", Some(child.id), "grandchild").await;

        // the flag stays 1 past the first level
        assert_eq!(child.depth, ReplyDepth::Reply);
        assert_eq!(grandchild.depth, ReplyDepth::Reply);

        let page = list_comment_tree(&store, post, "b1", &PageParams::default()).await;
        assert_eq!(page.total, 1);
        let tree_root = &page.data[0];
        assert_eq!(tree_root.text, "root");
        assert_eq!(tree_root.replies.len(), 1);
        assert_eq!(tree_root.replies[0].text, "child");
        assert_eq!(tree_root.replies[0].replies[0].text, "grandchild");
    }

    #[tokio::test]
    async fn roots_newest_first_replies_oldest_first() {
        let store = Store::new();
        let post = Uuid::new_v4();
        let first = seed_comment(&store, post, "b1", None, "older root").await;
        seed_comment(&store, post, "b1", None, "newer root").await;
        seed_comment(&store, post, "b1", Some(first.id), "first reply").await;
        seed_comment(&store, post, "b1", Some(first.id), "second reply").await;

        let page = list_comment_tree(&store, post, "b1", &PageParams::default()).await;
        assert_eq!(page.data[0].text, "newer root");
        assert_eq!(page.data[1].text, "older root");
        let replies = &page.data[1].replies;
        assert_eq!(replies[0].text, "first reply");
        assert_eq!(replies[1].text, "second reply");
    }

    #[tokio::test]
    async fn pagination_counts_only_roots() {
        let store = Store::new();
        let post = Uuid::new_v4();
        for i in 0..5 {
            let root = seed_comment(&store, post, "b1", None, &format!("root {i}")).await;
            seed_comment(&store, post, "b1", Some(root.id), "reply").await;
        }

        let params = PageParams::new(1, 2);
        let page = list_comment_tree(&store, post, "b1", &params).await;
        assert_eq!(page.count, 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        // replies ride along without affecting the page size
        assert!(page.data.iter().all(|n| n.replies.len() == 1));
    }

    #[tokio::test]
    async fn blocks_are_isolated() {
        let store = Store::new();
        let post = Uuid::new_v4();
        seed_comment(&store, post, "b1", None, "on b1").await;
        seed_comment(&store, post, "b2", None, "on b2").await;

        let page = list_comment_tree(&store, post, "b1", &PageParams::default()).await;
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].text, "on b1");
    }

    #[tokio::test]
    async fn cascade_stops_after_one_level() {
        let store = Store::new();
        let post = Uuid::new_v4();
        let root = seed_comment(&store, post, "b1", None, "root").await;
        let child = seed_comment(&store, post, "b1", Some(root.id), "child").await;
        let grandchild = seed_comment(&store, post, "b1", Some(child.id), "grandchild").await;

        let deleted = delete_one_level(&store, root.id).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_comment(root.id).is_none());
        assert!(store.get_comment(child.id).is_none());
        // the grandchild survives as an orphan
        assert!(store.get_comment(grandchild.id).is_some());
    }

    #[tokio::test]
    async fn reports_accumulate_without_dedup() {
        let store = Store::new();
        let post = Uuid::new_v4();
        let comment = seed_comment(&store, post, "b1", None, "spam?").await;
        let reporter = Uuid::new_v4();

        report_comment(&store, comment.id, reporter, "spam".into())
            .await
            .unwrap();
        let count = report_comment(&store, comment.id, reporter, "still spam".into())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let stored = store.get_comment(comment.id).unwrap();
        assert!(!stored.is_approved);
        assert_eq!(stored.reports.len(), 2);
    }

    #[tokio::test]
    async fn stats_aggregate_per_block() {
        let store = Store::new();
        let post = Uuid::new_v4();
        seed_comment(&store, post, "b1", None, "one").await;
        let reported = seed_comment(&store, post, "b1", None, "two").await;
        seed_comment(&store, post, "b2", None, "three").await;
        report_comment(&store, reported.id, Uuid::new_v4(), "rude".into())
            .await
            .unwrap();

        let stats = stats_for_post(&store, post).await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].block_id, "b1");
        assert_eq!(stats[0].total_comments, 2);
        assert_eq!(stats[0].reported_comments, 1);
        assert_eq!(stats[1].block_id, "b2");
        assert_eq!(stats[1].total_comments, 1);
        assert!(stats[1].last_comment_date.is_some());
    }
}
