//! Content block list maintenance: upsert, removal, lookup, and position
//! normalization for a post's ordered body.

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{BlockContent, ContentBlock, Post};

/// Incoming block as supplied by clients on post create/update. The block id
/// is optional; a missing id gets a freshly generated one.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    #[serde(default)]
    pub block_id: Option<String>,
    #[serde(flatten)]
    pub content: BlockContent,
    #[serde(default)]
    pub position: Option<u32>,
}

pub fn new_block_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Rewrites an incoming block list for persistence: positions become the list
/// index (contiguous, order-consistent) and missing block ids are generated.
/// Supplied positions are intentionally overridden here; per-block position
/// control goes through [`Post::set_block`] instead.
pub fn normalize_blocks(inputs: Vec<BlockInput>) -> Vec<ContentBlock> {
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| ContentBlock {
            block_id: input.block_id.unwrap_or_else(new_block_id),
            content: input.content,
            position: index as u32,
        })
        .collect()
}

impl Post {
    /// Upserts a content block. With a known `block_id` the block is replaced
    /// in place at its list index (falling back to that index when no position
    /// is given); without one a new block is appended at `position` or the
    /// current list length. The list is re-sorted by position afterwards, so
    /// stored order always matches display order.
    pub fn set_block(
        &mut self,
        block_id: Option<String>,
        content: BlockContent,
        position: Option<u32>,
    ) -> Result<ContentBlock, ApiError> {
        let block = match block_id {
            Some(id) => {
                let index = self
                    .content_blocks
                    .iter()
                    .position(|b| b.block_id == id)
                    .ok_or_else(|| ApiError::not_found("Content block not found"))?;
                let replacement = ContentBlock {
                    block_id: id,
                    content,
                    position: position.unwrap_or(index as u32),
                };
                self.content_blocks[index] = replacement.clone();
                replacement
            }
            None => {
                let appended = ContentBlock {
                    block_id: new_block_id(),
                    content,
                    position: position.unwrap_or(self.content_blocks.len() as u32),
                };
                self.content_blocks.push(appended.clone());
                appended
            }
        };
        self.sort_blocks();
        Ok(block)
    }

    /// Removes a block by id. Surviving positions are not renumbered; gaps are
    /// permitted and ordering is by comparison, not contiguity.
    pub fn remove_block(&mut self, block_id: &str) -> Option<ContentBlock> {
        let index = self
            .content_blocks
            .iter()
            .position(|b| b.block_id == block_id)?;
        Some(self.content_blocks.remove(index))
    }

    pub fn find_block(&self, block_id: &str) -> Option<&ContentBlock> {
        self.content_blocks.iter().find(|b| b.block_id == block_id)
    }

    pub fn find_block_mut(&mut self, block_id: &str) -> Option<&mut ContentBlock> {
        self.content_blocks
            .iter_mut()
            .find(|b| b.block_id == block_id)
    }

    /// Finds a block only if it is a `commentSection`.
    pub fn find_comment_section(&self, block_id: &str) -> Option<&ContentBlock> {
        self.find_block(block_id)
            .filter(|b| b.content.is_comment_section())
    }

    /// Stable sort by position; equal positions keep their relative order.
    pub fn sort_blocks(&mut self) {
        self.content_blocks.sort_by_key(|b| b.position);
    }
}
