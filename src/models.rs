use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Publication state of a post. `published_at` is set once, on the first
/// transition into `Published`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    #[default]
    Primary,
    Secondary,
    Outline,
}

/// Settings carried by a `commentSection` block.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentSettings {
    #[serde(default = "default_true")]
    pub is_nested: bool,
    #[serde(default)]
    pub require_auth: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CommentSettings {
    fn default() -> Self {
        Self {
            is_nested: true,
            require_auth: false,
        }
    }
}

/// Type-dependent payload of a content block. Each variant's shape enforces
/// its required fields at deserialization time, so there is no runtime
/// "required when blockType == ..." check anywhere.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(
    tag = "blockType",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum BlockContent {
    Text {
        text: String,
    },
    Image {
        media_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        media_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Button {
        button_text: String,
        button_link: String,
        #[serde(default)]
        button_style: ButtonStyle,
    },
    CommentSection {
        #[serde(default)]
        comment_settings: CommentSettings,
    },
    Divider,
}

impl BlockContent {
    pub fn is_comment_section(&self) -> bool {
        matches!(self, BlockContent::CommentSection { .. })
    }

    pub fn comment_settings(&self) -> Option<CommentSettings> {
        match self {
            BlockContent::CommentSection { comment_settings } => Some(*comment_settings),
            _ => None,
        }
    }

    /// Stored media URL for `image` and `video` blocks, if one has been set.
    pub fn media_url(&self) -> Option<&str> {
        match self {
            BlockContent::Image { media_url, .. } | BlockContent::Video { media_url, .. } => {
                (!media_url.is_empty()).then_some(media_url.as_str())
            }
            _ => None,
        }
    }
}

/// One ordered unit of a post's body. `block_id` is generated once and is
/// stable across edits; `position` defines display order within the post.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub block_id: String,
    #[serde(flatten)]
    pub content: BlockContent,
    pub position: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// URL-safe identifier, unique within (author, slug) pairs.
    pub slug: String,
    pub content_blocks: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    pub status: PostStatus,
    pub categories: Vec<Uuid>,
    pub tags: Vec<String>,
    pub author: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub is_comment_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Shallow depth flag on a comment: 0 for top-level, 1 for any reply
/// regardless of actual ancestor depth. This matches the externally visible
/// data and is deliberately not a true depth counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ReplyDepth {
    Top,
    Reply,
}

impl From<ReplyDepth> for u8 {
    fn from(depth: ReplyDepth) -> u8 {
        match depth {
            ReplyDepth::Top => 0,
            ReplyDepth::Reply => 1,
        }
    }
}

impl TryFrom<u8> for ReplyDepth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ReplyDepth::Top),
            1 => Ok(ReplyDepth::Reply),
            other => Err(format!("invalid reply depth: {other}")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentReport {
    pub user: Uuid,
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

/// A comment anchored to a `commentSection` block of a post. `parent_comment`
/// is `None` for top-level comments; comments form a forest per (post, block).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post: Uuid,
    pub block_id: String,
    pub user: Uuid,
    pub text: String,
    pub parent_comment: Option<Uuid>,
    pub depth: ReplyDepth,
    pub is_approved: bool,
    pub report_count: u32,
    pub reports: Vec<CommentReport>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    /// Unique (case-insensitive) name; the slug is derived from it.
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 hash. Never serialized to clients.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_expire: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expire: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing projection of a user.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

/// Display fields resolved onto each comment node.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar: Option<String>,
}

impl From<&User> for CommentAuthor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}
