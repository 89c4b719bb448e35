//! # Vote Aggregation
//!
//! Likes and dislikes are derived from the live vote events on every read.
//! There are no stored counters to keep in sync.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};

use crate::error::{QueryError, Result};
use crate::models::{UserId, VoteEvent, VoteTally, VoteTarget, VoteValue};
use crate::traits::VoteStore;

impl VoteTally {
    /// Counts live events. If a store hands back more than one event for the
    /// same voter, only the latest one (by `cast_at`, then by position) counts.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = &'a VoteEvent>,
    {
        let mut live: HashMap<UserId, &VoteEvent> = HashMap::new();
        for event in events {
            live.entry(event.voter_id)
                .and_modify(|current| {
                    if event.cast_at >= current.cast_at {
                        *current = event;
                    }
                })
                .or_insert(event);
        }

        live.values().fold(VoteTally::default(), |mut tally, event| {
            match event.value {
                VoteValue::Up => tally.likes += 1,
                VoteValue::Down => tally.dislikes += 1,
            }
            tally
        })
    }
}

/// Upper bound on vote fetches in flight for one `tally_many` call.
pub const MAX_CONCURRENT_TALLIES: usize = 16;

/// Computes like/dislike totals for posts and comments.
#[derive(Clone)]
pub struct VoteAggregator {
    store: Arc<dyn VoteStore>,
}

impl VoteAggregator {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Tally for one target. A target with no events, including one that does
    /// not exist, is `(0, 0)`. Only a failing storage call is an error.
    pub async fn tally(&self, target: VoteTarget) -> Result<VoteTally> {
        let events = self
            .store
            .votes_for_target(target)
            .await
            .map_err(|e| QueryError::retrieval(e.context(format!("loading votes for {target}"))))?;

        // A store that ignores the target filter must not leak foreign votes.
        let tally = VoteTally::from_events(events.iter().filter(|e| e.target == target));
        log::trace!("tally {target}: {}/{}", tally.likes, tally.dislikes);
        Ok(tally)
    }

    /// Tallies several targets concurrently. The output is in input order no
    /// matter which fetch finishes first, and the first failure fails the lot.
    pub async fn tally_many<I>(&self, targets: I) -> Result<Vec<VoteTally>>
    where
        I: IntoIterator<Item = VoteTarget>,
    {
        stream::iter(targets)
            .map(|target| self.tally(target))
            .buffered(MAX_CONCURRENT_TALLIES)
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockVoteStore;
    use chrono::{Duration, TimeZone, Utc};

    fn event(voter: UserId, target: VoteTarget, value: VoteValue, minute: i64) -> VoteEvent {
        VoteEvent {
            voter_id: voter,
            target,
            value,
            cast_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minute),
        }
    }

    #[test]
    fn test_from_events_empty_is_zero() {
        let events: Vec<VoteEvent> = Vec::new();
        assert_eq!(VoteTally::from_events(&events), VoteTally::new(0, 0));
    }

    #[test]
    fn test_from_events_later_vote_supersedes_earlier() {
        let t = VoteTarget::Post(1);
        let events = vec![
            event(1, t, VoteValue::Down, 0),
            event(2, t, VoteValue::Up, 1),
            event(3, t, VoteValue::Up, 2),
            event(4, t, VoteValue::Down, 3),
            // voter 1 changes their mind
            event(1, t, VoteValue::Up, 4),
        ];
        assert_eq!(VoteTally::from_events(&events), VoteTally::new(3, 1));
    }

    #[test]
    fn test_from_events_out_of_order_input() {
        let t = VoteTarget::Comment(9);
        let events = vec![event(7, t, VoteValue::Down, 10), event(7, t, VoteValue::Up, 5)];
        assert_eq!(VoteTally::from_events(&events), VoteTally::new(0, 1));
    }

    #[tokio::test]
    async fn test_tally_without_votes_is_zero() {
        let mut store = MockVoteStore::new();
        store.expect_votes_for_target().returning(|_| Ok(vec![]));

        let votes = VoteAggregator::new(Arc::new(store));
        let tally = votes.tally(VoteTarget::Comment(404)).await.unwrap();
        assert_eq!(tally, VoteTally::default());
    }

    #[tokio::test]
    async fn test_tally_ignores_events_for_other_targets() {
        let mut store = MockVoteStore::new();
        store.expect_votes_for_target().returning(|t| {
            Ok(vec![
                event(1, t, VoteValue::Up, 0),
                event(2, VoteTarget::Comment(t.id()), VoteValue::Up, 0),
            ])
        });

        let votes = VoteAggregator::new(Arc::new(store));
        assert_eq!(votes.tally(VoteTarget::Post(5)).await.unwrap(), VoteTally::new(1, 0));
    }

    #[tokio::test]
    async fn test_tally_many_keeps_input_order() {
        let mut store = MockVoteStore::new();
        store.expect_votes_for_target().returning(|t| {
            // target id n gets n upvotes
            Ok((0..t.id()).map(|voter| event(voter, t, VoteValue::Up, 0)).collect())
        });

        let votes = VoteAggregator::new(Arc::new(store));
        let tallies = votes
            .tally_many([3, 1, 2].map(VoteTarget::Comment))
            .await
            .unwrap();
        let likes: Vec<u64> = tallies.iter().map(|t| t.likes).collect();
        assert_eq!(likes, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_tally_propagates_storage_failure() {
        let mut store = MockVoteStore::new();
        store
            .expect_votes_for_target()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));

        let votes = VoteAggregator::new(Arc::new(store));
        let err = votes.tally(VoteTarget::Post(1)).await.unwrap_err();
        assert!(matches!(err, QueryError::Retrieval(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
