//! Vote aggregation.
//!
//! Reduces a flat vote list to per-target [`VoteCount`]s. A target is
//! either the thread id (a vote on the thread) or a reply id.
//!
//! ## Exactness
//!
//! Every vote contributes to exactly one target: the one named by its
//! `reply_id`. Duplicate votes from one account are counted as given;
//! one-vote-per-account is the backing store's constraint to enforce.

use std::collections::HashMap;

use crate::types::{NodeId, Vote, VoteCount};

/// Aggregate the votes naming one target.
///
/// Scans the whole list; use [`VoteTally`] when counts for many targets
/// are needed.
pub fn aggregate(votes: &[Vote], target: &NodeId) -> VoteCount {
    votes
        .iter()
        .filter(|vote| vote.reply_id == *target)
        .fold(VoteCount::zero(), |mut count, vote| {
            count.record(vote.direction);
            count
        })
}

/// Precomputed vote counts for every target in a vote list.
///
/// Built in a single pass, so composing a thread costs O(votes + nodes)
/// instead of O(votes * nodes).
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    counts: HashMap<NodeId, VoteCount>,
    vote_count: usize,
}

impl VoteTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tally a vote list in one pass.
    pub fn from_votes(votes: &[Vote]) -> Self {
        votes.iter().collect()
    }

    /// Record one vote.
    pub fn record(&mut self, vote: &Vote) {
        self.counts
            .entry(vote.reply_id)
            .or_default()
            .record(vote.direction);
        self.vote_count += 1;
    }

    /// Count for a target, `{0, 0, 0}` if nothing voted on it.
    pub fn get(&self, target: &NodeId) -> VoteCount {
        self.counts.get(target).copied().unwrap_or_default()
    }

    /// Number of votes tallied.
    pub fn vote_count(&self) -> usize {
        self.vote_count
    }

    /// Distinct targets with at least one vote, in no particular order.
    pub fn targets(&self) -> impl Iterator<Item = &NodeId> {
        self.counts.keys()
    }

    /// Number of distinct targets.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no vote has been tallied.
    pub fn is_empty(&self) -> bool {
        self.vote_count == 0
    }

    /// Sum of all counts.
    pub fn totals(&self) -> VoteCount {
        self.counts
            .values()
            .fold(VoteCount::zero(), |acc, count| acc + *count)
    }

    /// Fold another tally into this one.
    ///
    /// Tallies of disjoint slices of a vote list merge into the tally of
    /// the whole list.
    pub fn merge(&mut self, other: VoteTally) {
        for (target, count) in other.counts {
            *self.counts.entry(target).or_default() += count;
        }
        self.vote_count += other.vote_count;
    }

    /// Votes whose target fails `is_known`, i.e. votes that cannot be
    /// attached to any composed node.
    pub fn unattached<F>(&self, is_known: F) -> usize
    where
        F: Fn(&NodeId) -> bool,
    {
        self.counts
            .iter()
            .filter(|(target, _)| !is_known(target))
            .map(|(_, count)| count.votes() as usize)
            .sum()
    }
}

impl<'a> FromIterator<&'a Vote> for VoteTally {
    fn from_iter<I: IntoIterator<Item = &'a Vote>>(iter: I) -> Self {
        let mut tally = VoteTally::new();
        for vote in iter {
            tally.record(vote);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, VoteDirection, VoteId};
    use chrono::DateTime;
    use uuid::Uuid;

    const THREAD: u128 = 100;

    fn nid(n: u128) -> NodeId {
        NodeId::new(Uuid::from_u128(n))
    }

    fn vote(id: u128, account: u128, target: u128, direction: VoteDirection) -> Vote {
        Vote::new(
            VoteId::new(Uuid::from_u128(id)),
            nid(THREAD),
            AccountId::new(Uuid::from_u128(account)),
            nid(target),
            direction,
            DateTime::from_timestamp(1000, 0).unwrap(),
        )
    }

    fn sample() -> Vec<Vote> {
        vec![
            vote(1, 1, THREAD, VoteDirection::Up),
            vote(2, 2, 1, VoteDirection::Up),
            vote(3, 3, 1, VoteDirection::Down),
            vote(4, 1, 2, VoteDirection::Down),
            vote(5, 2, 2, VoteDirection::Down),
        ]
    }

    #[test]
    fn test_aggregate_single_target() {
        let votes = sample();
        assert_eq!(aggregate(&votes, &nid(THREAD)), VoteCount::new(1, 0));
        assert_eq!(aggregate(&votes, &nid(1)), VoteCount::new(1, 1));
        assert_eq!(aggregate(&votes, &nid(2)), VoteCount { upvotes: 0, downvotes: 2, total: -2 });
    }

    #[test]
    fn test_no_votes_is_zero() {
        assert_eq!(aggregate(&[], &nid(1)), VoteCount::zero());
        assert_eq!(VoteTally::new().get(&nid(1)), VoteCount::zero());
    }

    #[test]
    fn test_tally_matches_per_target_scan() {
        let votes = sample();
        let tally = VoteTally::from_votes(&votes);

        for target in [THREAD, 1, 2, 3] {
            assert_eq!(tally.get(&nid(target)), aggregate(&votes, &nid(target)));
        }
        assert_eq!(tally.vote_count(), 5);
        assert_eq!(tally.len(), 3);
        assert_eq!(tally.totals().votes(), 5);
    }

    #[test]
    fn test_duplicate_votes_counted_as_given() {
        let votes = vec![
            vote(1, 7, 1, VoteDirection::Up),
            vote(2, 7, 1, VoteDirection::Up),
        ];
        assert_eq!(VoteTally::from_votes(&votes).get(&nid(1)), VoteCount::new(2, 0));
    }

    #[test]
    fn test_merge_of_partitions_equals_whole() {
        let votes = sample();
        let (left, right) = votes.split_at(2);

        let mut merged = VoteTally::from_votes(left);
        merged.merge(VoteTally::from_votes(right));
        let whole = VoteTally::from_votes(&votes);

        assert_eq!(merged.vote_count(), whole.vote_count());
        for target in whole.targets() {
            assert_eq!(merged.get(target), whole.get(target));
        }
    }

    #[test]
    fn test_unattached_counts_votes_on_unknown_targets() {
        let mut votes = sample();
        votes.push(vote(6, 1, 999, VoteDirection::Up));
        votes.push(vote(7, 2, 999, VoteDirection::Down));

        let tally = VoteTally::from_votes(&votes);
        let known = [nid(THREAD), nid(1), nid(2)];
        assert_eq!(tally.unattached(|id| known.contains(id)), 2);
    }
}
