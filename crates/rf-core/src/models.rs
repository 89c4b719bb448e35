//! # Domain Models
//!
//! These structs represent the persisted forum rows and the derived views the
//! query engine builds on top of them. Rows never carry vote counts; counts
//! only exist on [`Tallied`] and [`CommentNode`], which are rebuilt on every read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PostId = i64;
pub type CommentId = i64;
pub type BoardId = i64;
pub type ClubId = i64;
pub type UserId = i64;

/// A forum board (e.g. "rust", "golang").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    /// The URL slug (e.g. "rust" for /board/rust)
    pub slug: String,
    pub title: String,
    pub description: String,
    /// Owning club, if the board was created inside one.
    pub club_id: Option<ClubId>,
}

/// A club groups boards around a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    pub topic: String,
    pub description: String,
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
}

/// A post as stored: no likes/dislikes on the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub board_id: BoardId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment under a post. `parent_id == None` means top-level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

/// The kind half of a [`VoteTarget`], as it appears in URLs and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteTargetKind {
    Post,
    Comment,
}

impl VoteTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteTargetKind::Post => "post",
            VoteTargetKind::Comment => "comment",
        }
    }

    pub fn target(self, id: i64) -> VoteTarget {
        match self {
            VoteTargetKind::Post => VoteTarget::Post(id),
            VoteTargetKind::Comment => VoteTarget::Comment(id),
        }
    }
}

impl fmt::Display for VoteTargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vote target kind: {0}")]
pub struct UnknownTargetKind(pub String);

impl FromStr for VoteTargetKind {
    type Err = UnknownTargetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(VoteTargetKind::Post),
            "comment" => Ok(VoteTargetKind::Comment),
            other => Err(UnknownTargetKind(other.to_string())),
        }
    }
}

/// Anything that can receive votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    Post(PostId),
    Comment(CommentId),
}

impl VoteTarget {
    pub fn kind(self) -> VoteTargetKind {
        match self {
            VoteTarget::Post(_) => VoteTargetKind::Post,
            VoteTarget::Comment(_) => VoteTargetKind::Comment,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind(), self.id())
    }
}

/// +1 or -1. Nothing else is a valid vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum VoteValue {
    Up,
    Down,
}

impl From<VoteValue> for i64 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vote value must be +1 or -1, got {0}")]
pub struct InvalidVoteValue(pub i64);

impl TryFrom<i64> for VoteValue {
    type Error = InvalidVoteValue;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            other => Err(InvalidVoteValue(other)),
        }
    }
}

/// One live vote. At most one exists per (voter, target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    pub voter_id: UserId,
    pub target: VoteTarget,
    pub value: VoteValue,
    pub cast_at: DateTime<Utc>,
}

/// Aggregated like/dislike counts for a single target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub likes: u64,
    pub dislikes: u64,
}

impl VoteTally {
    pub fn new(likes: u64, dislikes: u64) -> Self {
        Self { likes, dislikes }
    }
}

/// A row paired with the vote tally computed for it at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tallied<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(flatten)]
    pub votes: VoteTally,
}

impl<T> Tallied<T> {
    pub fn new(item: T, votes: VoteTally) -> Self {
        Self { item, votes }
    }
}

/// A comment in a reply tree, with its own tally and ordered replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(flatten)]
    pub votes: VoteTally,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, including this one.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }

    /// Pre-order walk over this subtree.
    pub fn walk(&self) -> Vec<&CommentNode> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.replies.iter().rev());
        }
        out
    }
}

/// Flattens a forest into pre-order, the order a thread is read in.
pub fn flatten_tree(roots: &[CommentNode]) -> Vec<&CommentNode> {
    roots.iter().flat_map(CommentNode::walk).collect()
}

/// The envelope returned by one search call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub posts: Vec<Tallied<Post>>,
    pub boards: Vec<Board>,
    pub clubs: Vec<Club>,
}

impl SearchResults {
    /// The defined "no results" envelope for a blank query.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.boards.is_empty() && self.clubs.is_empty()
    }
}

/// A post with its tally and full comment tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadView {
    pub post: Tallied<Post>,
    pub comments: Vec<CommentNode>,
}
