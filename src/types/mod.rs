//! Record and composite types for the thread kernel.

pub mod ids;
pub mod account;
pub mod thread;
pub mod vote;
pub mod snapshot;
pub mod complete;

use std::collections::BTreeMap;

pub use ids::{AccountId, NodeId, VoteId};
pub use account::Account;
pub use thread::{Thread, Reply};
pub use vote::{Vote, VoteDirection, VoteCount};
pub use snapshot::ThreadSnapshot;
pub use complete::{HydratedReply, ThreadComplete, Visit, Preorder};

/// Opaque extension data carried on accounts, threads and replies.
///
/// Passed through untouched; BTreeMap keeps serialization order stable.
pub type Extras = BTreeMap<String, serde_json::Value>;
