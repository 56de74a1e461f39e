//! Generic list-query shaper for `GET /posts`: filter, sort, field
//! selection, and pagination over a snapshot of post documents.

use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Post, PostStatus};
use crate::utils::PageParams;

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub author: Option<Uuid>,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Comma-separated sort keys; `-` prefix for descending. Default
    /// `-createdAt`.
    #[serde(default)]
    pub sort: Option<String>,
    /// Comma-separated field names to retain in each serialized document.
    #[serde(default)]
    pub select: Option<String>,
    #[serde(flatten)]
    pub page: PageParams,
}

impl ListQuery {
    fn matches(&self, post: &Post) -> bool {
        if let Some(status) = self.status {
            if post.status != status {
                return false;
            }
        }
        if let Some(author) = self.author {
            if post.author != author {
                return false;
            }
        }
        if let Some(category) = self.category {
            if !post.categories.contains(&category) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !post.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}

fn compare_by(post_a: &Post, post_b: &Post, key: &str) -> Ordering {
    match key {
        "createdAt" => post_a.created_at.cmp(&post_b.created_at),
        "publishedAt" => post_a.published_at.cmp(&post_b.published_at),
        "updatedAt" => post_a.updated_at.cmp(&post_b.updated_at),
        "title" => post_a.title.cmp(&post_b.title),
        "slug" => post_a.slug.cmp(&post_b.slug),
        "viewCount" => post_a.view_count.cmp(&post_b.view_count),
        // unknown keys do not affect ordering
        _ => Ordering::Equal,
    }
}

/// Applies filter, sort, and pagination; returns the page plus the total
/// number of matching posts before pagination.
pub fn shape(mut posts: Vec<Post>, query: &ListQuery) -> (Vec<Post>, u64) {
    posts.retain(|p| query.matches(p));

    let sort_spec = query.sort.as_deref().unwrap_or("-createdAt");
    let keys: Vec<(&str, bool)> = sort_spec
        .split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| match k.strip_prefix('-') {
            Some(field) => (field, true),
            None => (k, false),
        })
        .collect();
    posts.sort_by(|a, b| {
        for (field, descending) in &keys {
            let ord = compare_by(a, b, field);
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let total = posts.len() as u64;
    let offset = query.page.offset() as usize;
    let limit = query.page.limit() as usize;
    let page = posts.into_iter().skip(offset).take(limit).collect();
    (page, total)
}

/// Projects a serialized document down to the selected top-level fields.
/// `id` is always retained.
pub fn select_fields(mut value: Value, select: &str) -> Value {
    let keep: Vec<&str> = select
        .split(',')
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if keep.is_empty() {
        return value;
    }
    if let Value::Object(map) = &mut value {
        map.retain(|key, _| key == "id" || keep.contains(&key.as_str()));
    }
    value
}
