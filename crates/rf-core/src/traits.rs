//! # Core Traits (Ports)
//!
//! Storage plugins implement these traits to feed the query engine. Both are
//! read-only: writes belong to the adapters' own APIs.

use async_trait::async_trait;

use crate::models::{Board, Club, Comment, Post, PostId, VoteEvent, VoteTarget};

/// Read contract for forum content.
///
/// The `search_*` methods receive an already-trimmed, non-empty query and must
/// return every row that contains it case-insensitively in one of the searched
/// fields. Returning extra rows is fine (the ranker re-checks), dropping a true
/// match is not.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Posts matching on title or content.
    async fn search_posts(&self, query: &str) -> anyhow::Result<Vec<Post>>;
    /// Boards matching on title, slug or description.
    async fn search_boards(&self, query: &str) -> anyhow::Result<Vec<Board>>;
    /// Clubs matching on name, topic or description.
    async fn search_clubs(&self, query: &str) -> anyhow::Result<Vec<Club>>;

    async fn get_post(&self, id: PostId) -> anyhow::Result<Option<Post>>;

    /// Every comment of a post, in no particular order.
    async fn comments_for_post(&self, post_id: PostId) -> anyhow::Result<Vec<Comment>>;
}

/// Read contract for vote events.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Live events for one target. Empty for a target nobody voted on, or that
    /// does not exist.
    async fn votes_for_target(&self, target: VoteTarget) -> anyhow::Result<Vec<VoteEvent>>;
}
