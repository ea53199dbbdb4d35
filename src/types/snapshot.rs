//! Point-in-time row snapshot for one thread.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use super::account::Account;
use super::ids::{AccountId, NodeId};
use super::thread::{Reply, Thread};
use super::vote::Vote;

/// Every row needed to compose one thread, as fetched in a single
/// consistent read.
///
/// `replies` and `votes` keep the provider's order; that order decides
/// sibling order in the composed forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    /// The thread row.
    pub thread: Thread,
    /// Author of the thread, `None` when the provider has no such account.
    #[serde(default)]
    pub thread_account: Option<Account>,
    /// All replies of the thread.
    #[serde(default)]
    pub replies: Vec<Reply>,
    /// Authors of the replies, by id.
    #[serde(default)]
    pub reply_accounts: BTreeMap<AccountId, Account>,
    /// All votes on the thread or its replies.
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl ThreadSnapshot {
    /// Snapshot of a thread with no replies and no votes.
    pub fn new(thread: Thread, thread_account: Account) -> Self {
        Self {
            thread,
            thread_account: Some(thread_account),
            replies: Vec::new(),
            reply_accounts: BTreeMap::new(),
            votes: Vec::new(),
        }
    }

    /// Thread identifier.
    pub fn thread_id(&self) -> NodeId {
        self.thread.id
    }

    /// Append a reply.
    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    /// Register a reply author.
    pub fn with_account(mut self, account: Account) -> Self {
        self.reply_accounts.insert(account.id, account);
        self
    }

    /// Append a vote.
    pub fn with_vote(mut self, vote: Vote) -> Self {
        self.votes.push(vote);
        self
    }
}
