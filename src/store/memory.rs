//! In-memory snapshot provider.

use std::collections::BTreeMap;
use std::convert::Infallible;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{Account, AccountId, NodeId, Reply, Thread, ThreadSnapshot, Vote};
use super::SnapshotProvider;

#[derive(Debug, Default)]
struct Rows {
    accounts: BTreeMap<AccountId, Account>,
    threads: BTreeMap<NodeId, Thread>,
    /// Insertion order is the sibling order handed to the composer.
    replies: Vec<Reply>,
    votes: Vec<Vote>,
}

/// In-memory row store.
///
/// Records are keyed in BTreeMaps; replies and votes keep insertion order.
/// Rows can be added through a shared reference, so one store can be
/// populated while readers hold it in an `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryThreadStore {
    rows: RwLock<Rows>,
}

impl InMemoryThreadStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding every row of a snapshot.
    pub fn from_snapshot(snapshot: ThreadSnapshot) -> Self {
        let store = Self::new();
        store.insert_snapshot(snapshot);
        store
    }

    /// Add an account, replacing any account with the same id.
    pub fn add_account(&self, account: Account) {
        self.rows.write().accounts.insert(account.id, account);
    }

    /// Add a thread, replacing any thread with the same id.
    pub fn add_thread(&self, thread: Thread) {
        self.rows.write().threads.insert(thread.id, thread);
    }

    /// Append a reply.
    pub fn add_reply(&self, reply: Reply) {
        self.rows.write().replies.push(reply);
    }

    /// Append a vote.
    pub fn add_vote(&self, vote: Vote) {
        self.rows.write().votes.push(vote);
    }

    /// Add every row of a snapshot.
    pub fn insert_snapshot(&self, snapshot: ThreadSnapshot) {
        let mut rows = self.rows.write();
        if let Some(account) = snapshot.thread_account {
            rows.accounts.insert(account.id, account);
        }
        rows.accounts.extend(snapshot.reply_accounts);
        rows.threads.insert(snapshot.thread.id, snapshot.thread);
        rows.replies.extend(snapshot.replies);
        rows.votes.extend(snapshot.votes);
    }

    /// Remove a thread with its replies and votes. Accounts are kept.
    ///
    /// Returns whether the thread existed.
    pub fn remove_thread(&self, thread_id: &NodeId) -> bool {
        let mut rows = self.rows.write();
        rows.replies.retain(|r| r.thread_id != *thread_id);
        rows.votes.retain(|v| v.thread_id != *thread_id);
        rows.threads.remove(thread_id).is_some()
    }

    /// Remove every row.
    pub fn clear(&self) {
        *self.rows.write() = Rows::default();
    }

    /// Get number of accounts.
    pub fn num_accounts(&self) -> usize {
        self.rows.read().accounts.len()
    }

    /// Get number of threads.
    pub fn num_threads(&self) -> usize {
        self.rows.read().threads.len()
    }

    /// Get number of replies.
    pub fn num_replies(&self) -> usize {
        self.rows.read().replies.len()
    }

    /// Get number of votes.
    pub fn num_votes(&self) -> usize {
        self.rows.read().votes.len()
    }

    fn snapshot(&self, thread_id: &NodeId) -> Option<ThreadSnapshot> {
        let rows = self.rows.read();
        let thread = rows.threads.get(thread_id)?;

        let replies: Vec<Reply> = rows
            .replies
            .iter()
            .filter(|r| r.thread_id == *thread_id)
            .cloned()
            .collect();

        // Unknown authors are left out; the composer reports them.
        let reply_accounts: BTreeMap<AccountId, Account> = replies
            .iter()
            .filter_map(|r| rows.accounts.get(&r.account_id))
            .map(|a| (a.id, a.clone()))
            .collect();

        let votes: Vec<Vote> = rows
            .votes
            .iter()
            .filter(|v| v.thread_id == *thread_id)
            .cloned()
            .collect();

        Some(ThreadSnapshot {
            thread: thread.clone(),
            thread_account: rows.accounts.get(&thread.account_id).cloned(),
            replies,
            reply_accounts,
            votes,
        })
    }
}

#[async_trait]
impl SnapshotProvider for InMemoryThreadStore {
    // Reads cannot fail; missing rows are left for the composer to report.
    type Error = Infallible;

    async fn fetch_thread_composition(&self, thread_id: &NodeId) -> Result<Option<ThreadSnapshot>, Self::Error> {
        Ok(self.snapshot(thread_id))
    }
}
