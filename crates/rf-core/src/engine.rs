//! # QueryEngine
//!
//! The single entry point the HTTP layer talks to. Storage is injected once at
//! start-up; the engine holds no mutable state, so one instance is shared by
//! every worker.
//!
//! Reads are not snapshot-isolated across sub-fetches. A vote cast between the
//! comment fetch and the tally fetch of one `build_tree` call may or may not be
//! reflected in that call's result.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{select, Either};

use crate::error::{QueryError, Result};
use crate::models::{CommentNode, PostId, SearchResults, Tallied, ThreadView, VoteTally, VoteTarget};
use crate::search::SearchOrchestrator;
use crate::thread::CommentTreeBuilder;
use crate::traits::{ContentRepo, VoteStore};
use crate::votes::VoteAggregator;

pub struct QueryEngine {
    content: Arc<dyn ContentRepo>,
    votes: VoteAggregator,
    comments: CommentTreeBuilder,
    search: SearchOrchestrator,
}

impl QueryEngine {
    pub fn new(content: Arc<dyn ContentRepo>, votes: Arc<dyn VoteStore>) -> Self {
        let votes = VoteAggregator::new(votes);
        Self {
            comments: CommentTreeBuilder::new(content.clone(), votes.clone()),
            search: SearchOrchestrator::new(content.clone(), votes.clone()),
            content,
            votes,
        }
    }

    /// Builds an engine over a single adapter that implements both ports.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ContentRepo + VoteStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults> {
        self.search.search(query).await
    }

    pub async fn build_tree(&self, post_id: PostId) -> Result<Vec<CommentNode>> {
        self.comments.build_tree(post_id).await
    }

    pub async fn tally(&self, target: VoteTarget) -> Result<VoteTally> {
        self.votes.tally(target).await
    }

    /// The post with its tally and comment tree, or `None` if the post does
    /// not exist.
    pub async fn thread(&self, post_id: PostId) -> Result<Option<ThreadView>> {
        let post = self
            .content
            .get_post(post_id)
            .await
            .map_err(|e| QueryError::retrieval(e.context(format!("loading post {post_id}"))))?;
        let Some(post) = post else {
            return Ok(None);
        };

        let (votes, comments) = futures_util::future::try_join(
            self.votes.tally(VoteTarget::Post(post.id)),
            self.comments.build_tree(post.id),
        )
        .await?;

        Ok(Some(ThreadView {
            post: Tallied::new(post, votes),
            comments,
        }))
    }

    /// [`search`](Self::search) that gives up as soon as `cancel` resolves.
    pub async fn search_until<C>(&self, query: &str, cancel: C) -> Result<SearchResults>
    where
        C: Future<Output = ()>,
    {
        until_cancelled(self.search(query), cancel).await
    }

    /// [`build_tree`](Self::build_tree) that gives up as soon as `cancel` resolves.
    pub async fn build_tree_until<C>(&self, post_id: PostId, cancel: C) -> Result<Vec<CommentNode>>
    where
        C: Future<Output = ()>,
    {
        until_cancelled(self.build_tree(post_id), cancel).await
    }
}

/// Races `work` against `cancel`. When `cancel` wins, `work` is dropped, which
/// drops every storage fetch it still has in flight; nothing partial escapes.
pub async fn until_cancelled<T, W, C>(work: W, cancel: C) -> Result<T>
where
    W: Future<Output = Result<T>>,
    C: Future<Output = ()>,
{
    let work = Box::pin(work);
    let cancel = Box::pin(cancel);
    match select(work, cancel).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _abandoned)) => {
            log::debug!("query cancelled by caller");
            Err(QueryError::Cancelled)
        }
    }
}
