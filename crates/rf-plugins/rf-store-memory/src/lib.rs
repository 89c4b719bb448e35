//! # rf-store-memory
//!
//! In-process implementation of `ContentRepo` and `VoteStore`.
//! Used by the test suites and by the binary's `store-memory` feature.
//! Rows live in `DashMap`s so concurrent readers never block each other.
//! A store can be preloaded from a JSON [`Fixture`].

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rf_core::models::{
    Board, BoardId, Club, ClubId, Comment, CommentId, Post, PostId, UserId, VoteEvent, VoteTarget,
    VoteValue,
};
use rf_core::traits::{ContentRepo, VoteStore};
use serde::Deserialize;

#[derive(Default)]
pub struct MemoryStore {
    boards: DashMap<BoardId, Board>,
    clubs: DashMap<ClubId, Club>,
    posts: DashMap<PostId, Post>,
    comments: DashMap<CommentId, Comment>,
    /// Keyed by (voter, target): a second vote replaces the first.
    votes: DashMap<(UserId, VoteTarget), VoteEvent>,
}

/// A forum snapshot to preload. Every section is optional. Comments are
/// inserted in file order, so a reply must come after its parent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub boards: Vec<Board>,
    pub clubs: Vec<Club>,
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub votes: Vec<FixtureVote>,
}

/// A vote as written in a fixture, e.g.
/// `{"voter_id": 4, "target": {"kind": "post", "id": 1}, "value": -1}`.
#[derive(Debug, Deserialize)]
pub struct FixtureVote {
    pub voter_id: UserId,
    pub target: VoteTarget,
    pub value: VoteValue,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from fixture JSON.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let fixture: Fixture = serde_json::from_str(json).context("parsing fixture")?;
        let store = Self::new();
        store.load_fixture(fixture)?;
        Ok(store)
    }

    pub fn load_fixture(&self, fixture: Fixture) -> anyhow::Result<()> {
        log::info!(
            "loading fixture: {} boards, {} clubs, {} posts, {} comments, {} votes",
            fixture.boards.len(),
            fixture.clubs.len(),
            fixture.posts.len(),
            fixture.comments.len(),
            fixture.votes.len()
        );
        fixture.boards.into_iter().for_each(|b| self.insert_board(b));
        fixture.clubs.into_iter().for_each(|c| self.insert_club(c));
        fixture.posts.into_iter().for_each(|p| self.insert_post(p));
        for comment in fixture.comments {
            let id = comment.id;
            self.insert_comment(comment)
                .with_context(|| format!("loading comment {id}"))?;
        }
        for vote in fixture.votes {
            self.cast_vote(vote.voter_id, vote.target, vote.value);
        }
        Ok(())
    }

    pub fn insert_board(&self, board: Board) {
        self.boards.insert(board.id, board);
    }

    pub fn insert_club(&self, club: Club) {
        self.clubs.insert(club.id, club);
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// Stores a comment. A reply must point at an existing comment of the same
    /// post, which is what keeps parent links acyclic.
    pub fn insert_comment(&self, comment: Comment) -> anyhow::Result<()> {
        if let Some(parent_id) = comment.parent_id {
            // Copy the field out so the shard guard is released before the insert.
            let parent_post = self
                .comments
                .get(&parent_id)
                .map(|parent| parent.post_id)
                .ok_or_else(|| anyhow::anyhow!("parent comment {parent_id} does not exist"))?;
            anyhow::ensure!(
                parent_post == comment.post_id,
                "parent comment {parent_id} belongs to post {parent_post}, not {}",
                comment.post_id
            );
        }
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    /// Removes a comment without touching its replies, which become orphans.
    pub fn delete_comment(&self, id: CommentId) -> Option<Comment> {
        self.comments.remove(&id).map(|(_, c)| c)
    }

    /// Records `voter`'s vote on `target`, replacing any earlier one.
    pub fn cast_vote(&self, voter_id: UserId, target: VoteTarget, value: VoteValue) -> VoteEvent {
        let event = VoteEvent {
            voter_id,
            target,
            value,
            cast_at: Utc::now(),
        };
        if let Some(previous) = self.votes.insert((voter_id, target), event.clone()) {
            log::debug!("vote by {voter_id} on {target} superseded {:?}", previous.value);
        }
        event
    }

    /// Withdraws `voter`'s vote on `target`. Returns whether one existed.
    pub fn retract_vote(&self, voter_id: UserId, target: VoteTarget) -> bool {
        self.votes.remove(&(voter_id, target)).is_some()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl ContentRepo for MemoryStore {
    async fn search_posts(&self, query: &str) -> anyhow::Result<Vec<Post>> {
        let needle = query.to_lowercase();
        Ok(self
            .posts
            .iter()
            .filter(|p| contains_ci(&p.title, &needle) || contains_ci(&p.content, &needle))
            .map(|p| p.value().clone())
            .collect())
    }

    async fn search_boards(&self, query: &str) -> anyhow::Result<Vec<Board>> {
        let needle = query.to_lowercase();
        Ok(self
            .boards
            .iter()
            .filter(|b| {
                contains_ci(&b.title, &needle)
                    || contains_ci(&b.slug, &needle)
                    || contains_ci(&b.description, &needle)
            })
            .map(|b| b.value().clone())
            .collect())
    }

    async fn search_clubs(&self, query: &str) -> anyhow::Result<Vec<Club>> {
        let needle = query.to_lowercase();
        Ok(self
            .clubs
            .iter()
            .filter(|c| {
                contains_ci(&c.name, &needle)
                    || contains_ci(&c.topic, &needle)
                    || contains_ci(&c.description, &needle)
            })
            .map(|c| c.value().clone())
            .collect())
    }

    async fn get_post(&self, id: PostId) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn comments_for_post(&self, post_id: PostId) -> anyhow::Result<Vec<Comment>> {
        Ok(self
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.value().clone())
            .collect())
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn votes_for_target(&self, target: VoteTarget) -> anyhow::Result<Vec<VoteEvent>> {
        Ok(self
            .votes
            .iter()
            .filter(|v| v.key().1 == target)
            .map(|v| v.value().clone())
            .collect())
    }
}
