//! # Comment Trees
//!
//! Turns the flat comment rows of one post into an ordered reply tree.
//! Siblings (and roots) are ordered by `created_at` ascending, then id
//! ascending, so the same rows always give the same tree.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{QueryError, Result};
use crate::models::{Comment, CommentId, CommentNode, PostId, VoteTally, VoteTarget};
use crate::traits::ContentRepo;
use crate::votes::VoteAggregator;

pub struct CommentTreeBuilder {
    content: Arc<dyn ContentRepo>,
    votes: VoteAggregator,
}

impl CommentTreeBuilder {
    pub fn new(content: Arc<dyn ContentRepo>, votes: VoteAggregator) -> Self {
        Self { content, votes }
    }

    /// Fetches the comments of `post_id`, tallies each one and assembles the tree.
    /// A post without comments (or one that does not exist) yields an empty tree.
    pub async fn build_tree(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        let comments = self
            .content
            .comments_for_post(post_id)
            .await
            .map_err(|e| QueryError::retrieval(e.context(format!("loading comments of post {post_id}"))))?;

        let comments: Vec<Comment> = comments.into_iter().filter(|c| c.post_id == post_id).collect();
        log::debug!("post {post_id}: {} comments fetched", comments.len());

        let tallies = self
            .votes
            .tally_many(comments.iter().map(|c| VoteTarget::Comment(c.id)))
            .await?;

        Ok(assemble_tree(comments.into_iter().zip(tallies)))
    }
}

/// Deepest level a reply is shown at, counting roots as level 0. Replies
/// nested further are attached to their ancestor at level
/// `MAX_REPLY_DEPTH - 1`, next to the reply at the cap.
pub const MAX_REPLY_DEPTH: usize = 32;

type SortKey = (DateTime<Utc>, CommentId);

/// Pure tree assembly over already-tallied rows.
///
/// Every distinct comment id in the input appears exactly once in the output,
/// and no node is nested deeper than [`MAX_REPLY_DEPTH`].
/// A comment whose parent is missing from the input is promoted to a root.
/// So is the earliest member of any parent cycle, which only corrupt data can
/// produce.
pub fn assemble_tree<I>(rows: I) -> Vec<CommentNode>
where
    I: IntoIterator<Item = (Comment, VoteTally)>,
{
    let mut rows_by_id: HashMap<CommentId, (Comment, VoteTally)> = HashMap::new();
    for (comment, votes) in rows {
        rows_by_id.entry(comment.id).or_insert((comment, votes));
    }

    let mut roots: Vec<SortKey> = Vec::new();
    let mut children: HashMap<CommentId, Vec<SortKey>> = HashMap::new();

    for (comment, _) in rows_by_id.values() {
        let key = (comment.created_at, comment.id);
        match comment.parent_id {
            None => roots.push(key),
            Some(parent) if parent != comment.id && rows_by_id.contains_key(&parent) => {
                children.entry(parent).or_default().push(key);
            }
            Some(parent) => {
                log::warn!(
                    "comment {} of post {} points at missing parent {parent}, promoting to root",
                    comment.id,
                    comment.post_id
                );
                roots.push(key);
            }
        }
    }

    let mut reached = reachable(&roots, &children);
    if reached.len() < rows_by_id.len() {
        let mut stranded: Vec<SortKey> = rows_by_id
            .values()
            .map(|(c, _)| (c.created_at, c.id))
            .filter(|(_, id)| !reached.contains(id))
            .collect();
        stranded.sort_unstable();

        for key in stranded {
            let id = key.1;
            if reached.contains(&id) {
                continue;
            }
            log::warn!("comment {id} sits in a parent cycle, promoting to root");
            if let Some(parent) = rows_by_id.get(&id).and_then(|(c, _)| c.parent_id) {
                if let Some(siblings) = children.get_mut(&parent) {
                    siblings.retain(|(_, child)| *child != id);
                }
            }
            roots.push(key);
            reached.extend(reachable(&[key], &children));
        }
    }

    roots.sort_unstable();
    let layout = cap_depth(&roots, &children);
    build_forest(&roots, layout, rows_by_id)
}

/// Re-parents replies nested deeper than [`MAX_REPLY_DEPTH`] onto their
/// deepest allowed ancestor, where they sit as siblings in posting order.
/// Returns the final child lists (sorted) and a parent-before-child order.
fn cap_depth(roots: &[SortKey], children: &HashMap<CommentId, Vec<SortKey>>) -> Layout {
    let mut layout = Layout::default();
    // (comment, final parent, depth); roots sit at depth 0.
    let mut queue: VecDeque<(SortKey, Option<CommentId>, usize)> =
        roots.iter().map(|&key| (key, None, 0)).collect();
    let mut seen = HashSet::new();

    while let Some((key, parent, depth)) = queue.pop_front() {
        let id = key.1;
        if !seen.insert(id) {
            continue;
        }
        if let Some(parent) = parent {
            layout.children.entry(parent).or_default().push(key);
        }
        layout.order.push(id);

        for &kid in children.get(&id).into_iter().flatten() {
            if depth < MAX_REPLY_DEPTH {
                queue.push_back((kid, Some(id), depth + 1));
            } else {
                log::debug!("comment {} nested past {MAX_REPLY_DEPTH} levels, flattening", kid.1);
                queue.push_back((kid, parent, depth));
            }
        }
    }

    for siblings in layout.children.values_mut() {
        siblings.sort_unstable();
    }
    layout
}

fn reachable(from: &[SortKey], children: &HashMap<CommentId, Vec<SortKey>>) -> HashSet<CommentId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<CommentId> = from.iter().map(|&(_, id)| id).collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(&id) {
            stack.extend(kids.iter().map(|&(_, kid)| kid));
        }
    }
    seen
}

#[derive(Default)]
struct Layout {
    children: HashMap<CommentId, Vec<SortKey>>,
    order: Vec<CommentId>,
}

/// Builds nodes leaves-first, so no step recurses into the tree.
fn build_forest(
    roots: &[SortKey],
    layout: Layout,
    mut rows_by_id: HashMap<CommentId, (Comment, VoteTally)>,
) -> Vec<CommentNode> {
    let mut built: HashMap<CommentId, CommentNode> = HashMap::with_capacity(layout.order.len());

    for &id in layout.order.iter().rev() {
        let Some((comment, votes)) = rows_by_id.remove(&id) else {
            continue;
        };
        let replies = layout
            .children
            .get(&id)
            .map(|kids| kids.iter().filter_map(|(_, kid)| built.remove(kid)).collect())
            .unwrap_or_default();
        built.insert(id, CommentNode { comment, votes, replies });
    }

    roots.iter().filter_map(|(_, id)| built.remove(id)).collect()
}
