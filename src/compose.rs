//! Thread composition.
//!
//! Combines a thread, its author, the vote tally and the reply forest into
//! one immutable [`ThreadComplete`].
//!
//! ```text
//! ThreadSnapshot ──┬── VoteTally::from_votes ─────────┐
//!                  └── ReplyTreeBuilder::build ──────┴── hydrate ── ThreadComplete
//! ```
//!
//! The tally and the forest are independent; above
//! [`ComposeConfig::parallel_threshold`] rows they are computed on scoped
//! threads. The output does not depend on which path ran.

use std::collections::BTreeMap;

use crate::aggregate::VoteTally;
use crate::forest::{ReplyForest, ReplyTreeBuilder, StructuralError};
use crate::types::{Account, AccountId, NodeId, Reply, Thread, ThreadComplete, ThreadSnapshot, Vote};

/// Default row count at which tally and forest are built in parallel.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

/// Error type for composition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    /// The requested thread does not exist.
    #[error("Thread not found: {0}")]
    NotFound(NodeId),
    /// The rows do not form a valid reply forest.
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),
}

/// Composition settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeConfig {
    /// Minimum `replies + votes` for which the vote tally runs on its own
    /// thread alongside forest construction.
    pub parallel_threshold: usize,
}

impl ComposeConfig {
    /// Load configuration from environment variables.
    ///
    /// - `THREAD_KERNEL_PARALLEL_THRESHOLD` (default: 4096)
    pub fn from_env() -> Self {
        Self {
            parallel_threshold: std::env::var("THREAD_KERNEL_PARALLEL_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
        }
    }

    /// Never spawn threads.
    pub fn sequential() -> Self {
        Self { parallel_threshold: usize::MAX }
    }

    /// Always tally votes on a separate thread.
    pub fn parallel() -> Self {
        Self { parallel_threshold: 0 }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self { parallel_threshold: DEFAULT_PARALLEL_THRESHOLD }
    }
}

/// Composes hydrated threads from row snapshots.
///
/// Stateless apart from its configuration; one composer can serve any
/// number of concurrent compositions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadComposer {
    config: ComposeConfig,
}

impl ThreadComposer {
    /// Create a composer.
    pub fn new(config: ComposeConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    /// Compose a thread from its rows.
    ///
    /// Fails on the first structural defect; a partial tree is never
    /// returned.
    pub fn compose(
        &self,
        thread: &Thread,
        thread_account: &Account,
        replies: &[Reply],
        reply_accounts: &BTreeMap<AccountId, Account>,
        votes: &[Vote],
    ) -> Result<ThreadComplete, CompositionError> {
        if thread_account.id != thread.account_id {
            return Err(missing_thread_author(thread));
        }

        let builder = ReplyTreeBuilder::new(thread.id, reply_accounts);
        let parallel = replies.len() + votes.len() >= self.config.parallel_threshold;

        let (tally, forest) = if parallel {
            std::thread::scope(|s| {
                let tally = s.spawn(|| VoteTally::from_votes(votes));
                let forest = builder.build(replies);
                let tally = tally
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                (tally, forest)
            })
        } else {
            (VoteTally::from_votes(votes), builder.build(replies))
        };

        let forest: ReplyForest<'_> = forest.map_err(|err| {
            tracing::warn!(thread_id = %thread.id, error = %err, "Thread composition failed");
            err
        })?;

        let unattached = tally.unattached(|id| *id == thread.id || forest.contains(id));
        if unattached > 0 {
            tracing::warn!(
                thread_id = %thread.id,
                unattached,
                "Votes target nodes outside the thread and were not attached"
            );
        }

        let complete = ThreadComplete {
            thread: thread.clone(),
            account: thread_account.clone(),
            votes: tally.get(&thread.id),
            replies: forest.hydrate(&tally),
        };

        tracing::debug!(
            thread_id = %thread.id,
            reply_count = forest.len(),
            vote_count = tally.vote_count(),
            depth = forest.depth(),
            parallel,
            "Thread composed"
        );

        Ok(complete)
    }

    /// Compose a thread from a snapshot.
    ///
    /// A snapshot without a thread author fails with
    /// [`StructuralError::MissingAuthor`] for the thread.
    pub fn compose_snapshot(&self, snapshot: &ThreadSnapshot) -> Result<ThreadComplete, CompositionError> {
        let Some(thread_account) = snapshot.thread_account.as_ref() else {
            return Err(missing_thread_author(&snapshot.thread));
        };
        self.compose(
            &snapshot.thread,
            thread_account,
            &snapshot.replies,
            &snapshot.reply_accounts,
            &snapshot.votes,
        )
    }
}

fn missing_thread_author(thread: &Thread) -> CompositionError {
    let err = StructuralError::MissingAuthor {
        node_id: thread.id,
        account_id: thread.account_id,
    };
    tracing::warn!(thread_id = %thread.id, error = %err, "Thread composition failed");
    err.into()
}

/// Compose a thread with the default configuration.
pub fn compose(
    thread: &Thread,
    thread_account: &Account,
    replies: &[Reply],
    reply_accounts: &BTreeMap<AccountId, Account>,
    votes: &[Vote],
) -> Result<ThreadComplete, CompositionError> {
    ThreadComposer::default().compose(thread, thread_account, replies, reply_accounts, votes)
}

impl ThreadSnapshot {
    /// Compose this snapshot with the default configuration.
    pub fn compose(&self) -> Result<ThreadComplete, CompositionError> {
        ThreadComposer::default().compose_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{VoteCount, VoteDirection, VoteId};
    use chrono::DateTime;
    use uuid::Uuid;

    const THREAD: u128 = 100;

    fn nid(n: u128) -> NodeId {
        NodeId::new(Uuid::from_u128(n))
    }

    fn aid(n: u128) -> AccountId {
        AccountId::new(Uuid::from_u128(n))
    }

    fn account(n: u128) -> Account {
        Account::new(
            aid(n),
            format!("up-{}", n),
            format!("user{}", n),
            format!("user{}@example.com", n),
            DateTime::from_timestamp(1000, 0).unwrap(),
        )
    }

    fn reply(id: u128, parent: u128, author: u128) -> Reply {
        Reply::new(
            nid(id),
            nid(THREAD),
            aid(author),
            nid(parent),
            format!("reply {}", id),
            DateTime::from_timestamp(1000 + id as i64, 0).unwrap(),
        )
    }

    fn vote(id: u128, voter: u128, target: u128, direction: VoteDirection) -> Vote {
        Vote::new(
            VoteId::new(Uuid::from_u128(id)),
            nid(THREAD),
            aid(voter),
            nid(target),
            direction,
            DateTime::from_timestamp(2000, 0).unwrap(),
        )
    }

    fn snapshot() -> ThreadSnapshot {
        let thread = Thread::new(
            nid(THREAD),
            aid(1),
            "t-1",
            "Title",
            "Body",
            DateTime::from_timestamp(1000, 0).unwrap(),
        );
        ThreadSnapshot::new(thread, account(1))
            .with_account(account(1))
            .with_account(account(2))
            .with_reply(reply(1, THREAD, 2))
            .with_reply(reply(2, 1, 1))
            .with_reply(reply(3, THREAD, 1))
            .with_vote(vote(1, 2, THREAD, VoteDirection::Up))
            .with_vote(vote(2, 1, 1, VoteDirection::Up))
            .with_vote(vote(3, 2, 2, VoteDirection::Down))
            .with_vote(vote(4, 1, 2, VoteDirection::Down))
    }

    #[test]
    fn test_compose_attaches_votes_everywhere() {
        let complete = snapshot().compose().unwrap();

        assert_eq!(complete.votes, VoteCount::new(1, 0));
        assert_eq!(complete.replies.len(), 2);
        assert_eq!(complete.replies[0].votes, VoteCount::new(1, 0));
        assert_eq!(complete.replies[0].children[0].votes, VoteCount::new(0, 2));
        assert_eq!(complete.replies[1].votes, VoteCount::zero());
        assert_eq!(complete.reply_count(), 3);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let snapshot = snapshot();
        let sequential = ThreadComposer::new(ComposeConfig::sequential())
            .compose_snapshot(&snapshot)
            .unwrap();
        let parallel = ThreadComposer::new(ComposeConfig::parallel())
            .compose_snapshot(&snapshot)
            .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(sequential.fingerprint().unwrap(), parallel.fingerprint().unwrap());
    }

    #[test]
    fn test_structural_error_wrapped() {
        let snapshot = snapshot().with_reply(reply(9, 77, 1));

        let err = snapshot.compose().unwrap_err();
        assert_eq!(
            err,
            CompositionError::Structural(StructuralError::OrphanedReply {
                reply_id: nid(9),
                reply_to_id: nid(77),
            })
        );
    }

    #[test]
    fn test_mismatched_thread_author_rejected() {
        let mut snapshot = snapshot();
        snapshot.thread_account = Some(account(2));

        let err = snapshot.compose().unwrap_err();
        assert_eq!(
            err,
            CompositionError::Structural(StructuralError::MissingAuthor {
                node_id: nid(THREAD),
                account_id: aid(1),
            })
        );
    }

    #[test]
    fn test_absent_thread_author_rejected() {
        let mut snapshot = snapshot();
        snapshot.thread_account = None;

        let err = snapshot.compose().unwrap_err();
        assert_eq!(
            err,
            CompositionError::Structural(StructuralError::MissingAuthor {
                node_id: nid(THREAD),
                account_id: aid(1),
            })
        );
    }

    #[test]
    fn test_votes_on_unknown_targets_do_not_leak() {
        let snapshot = snapshot().with_vote(vote(9, 1, 555, VoteDirection::Up));
        let complete = snapshot.compose().unwrap();

        assert_eq!(complete.votes, VoteCount::new(1, 0));
        let attached: u64 = complete.iter_preorder().map(|v| v.node.votes.votes()).sum();
        assert_eq!(attached, 3);
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(ComposeConfig::default().parallel_threshold, DEFAULT_PARALLEL_THRESHOLD);
        assert_eq!(ComposeConfig::sequential().parallel_threshold, usize::MAX);
        assert_eq!(ComposeConfig::parallel().parallel_threshold, 0);
    }
}
