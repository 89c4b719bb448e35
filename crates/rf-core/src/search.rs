//! # Cross-entity Search
//!
//! One query fans out to posts, boards and clubs at once. Each candidate set
//! is re-ranked in process, then posts get their live vote tallies. If any
//! leg fails the whole search fails: a caller must never mistake a failed
//! category for an empty one.

use std::sync::Arc;

use futures_util::future::try_join3;

use crate::error::{QueryError, Result};
use crate::models::{SearchResults, Tallied, VoteTarget};
use crate::ranking::{rank, FieldSelectors};
use crate::traits::ContentRepo;
use crate::votes::VoteAggregator;

pub struct SearchOrchestrator {
    content: Arc<dyn ContentRepo>,
    votes: VoteAggregator,
}

impl SearchOrchestrator {
    pub fn new(content: Arc<dyn ContentRepo>, votes: VoteAggregator) -> Self {
        Self { content, votes }
    }

    /// Searches all three entity kinds. A blank query returns the empty
    /// envelope without touching storage.
    pub async fn search(&self, raw_query: &str) -> Result<SearchResults> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Ok(SearchResults::empty());
        }

        let (posts, boards, clubs) = try_join3(
            async {
                self.content
                    .search_posts(query)
                    .await
                    .map_err(|e| QueryError::retrieval(e.context("searching posts")))
            },
            async {
                self.content
                    .search_boards(query)
                    .await
                    .map_err(|e| QueryError::retrieval(e.context("searching boards")))
            },
            async {
                self.content
                    .search_clubs(query)
                    .await
                    .map_err(|e| QueryError::retrieval(e.context("searching clubs")))
            },
        )
        .await?;

        log::debug!(
            "search {query:?}: {} post, {} board, {} club candidates",
            posts.len(),
            boards.len(),
            clubs.len()
        );

        let posts = rank(query, posts, &FieldSelectors::posts());
        let boards = rank(query, boards, &FieldSelectors::boards());
        let clubs = rank(query, clubs, &FieldSelectors::clubs());

        let tallies = self
            .votes
            .tally_many(posts.iter().map(|p| VoteTarget::Post(p.id)))
            .await?;
        let posts = posts
            .into_iter()
            .zip(tallies)
            .map(|(post, votes)| Tallied::new(post, votes))
            .collect();

        Ok(SearchResults {
            query: query.to_string(),
            posts,
            boards,
            clubs,
        })
    }
}
