//! Vote records and vote aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

use super::ids::{AccountId, NodeId, VoteId};

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    /// Endorsement.
    Up,
    /// Disapproval.
    Down,
}

impl VoteDirection {
    /// Parse direction from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A directional vote cast by one account on a thread or a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Unique vote identifier.
    pub id: VoteId,
    /// Owning thread.
    pub thread_id: NodeId,
    /// Voting account.
    pub account_id: AccountId,
    /// Target node: the thread id for a thread vote, otherwise a reply id.
    pub reply_id: NodeId,
    /// Up or down.
    pub direction: VoteDirection,
    /// Time the vote was cast.
    pub created_at: DateTime<Utc>,
}

impl Vote {
    /// Create a vote.
    pub fn new(
        id: VoteId,
        thread_id: NodeId,
        account_id: AccountId,
        reply_id: NodeId,
        direction: VoteDirection,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            account_id,
            reply_id,
            direction,
            created_at,
        }
    }

    /// Whether this vote targets the thread itself rather than a reply.
    pub fn is_thread_vote(&self) -> bool {
        self.reply_id == self.thread_id
    }
}

/// Aggregate vote count for one target.
///
/// `total` is always `upvotes - downvotes`. [`VoteCount::new`],
/// [`VoteCount::record`] and [`Add`] all maintain it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteCount {
    /// Number of upvotes.
    pub upvotes: u64,
    /// Number of downvotes.
    pub downvotes: u64,
    /// Net score.
    pub total: i64,
}

impl VoteCount {
    /// Build a count from raw up/down numbers.
    pub fn new(upvotes: u64, downvotes: u64) -> Self {
        Self {
            upvotes,
            downvotes,
            total: upvotes as i64 - downvotes as i64,
        }
    }

    /// Count with no votes.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Record one vote.
    pub fn record(&mut self, direction: VoteDirection) {
        match direction {
            VoteDirection::Up => {
                self.upvotes += 1;
                self.total += 1;
            }
            VoteDirection::Down => {
                self.downvotes += 1;
                self.total -= 1;
            }
        }
    }

    /// Number of votes behind this count.
    pub fn votes(&self) -> u64 {
        self.upvotes + self.downvotes
    }

    /// True when no vote has been recorded.
    pub fn is_zero(&self) -> bool {
        self.votes() == 0
    }
}

impl Add for VoteCount {
    type Output = VoteCount;

    fn add(self, rhs: VoteCount) -> VoteCount {
        VoteCount::new(self.upvotes + rhs.upvotes, self.downvotes + rhs.downvotes)
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        *self = *self + rhs;
    }
}
