//! Hydrated composite types produced by composition.
//!
//! These are constructed fresh for every composition call and hold no
//! references into store state, so they are `Send + Sync` and serialize
//! directly for any downstream consumer.
//!
//! Reply forests have no depth bound. Every trait impl that walks
//! `children` (`Clone`, `PartialEq`, `Debug`, `Drop`) is iterative, and
//! [`ThreadComplete`] serializes on a growable stack through
//! `serde_stacker`. Use [`ThreadComplete::from_json`] to read one back;
//! plain `serde_json::from_str` stops at its 128-level recursion limit.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::canonical::canonical_hash_hex;
use super::account::Account;
use super::ids::NodeId;
use super::thread::{Reply, Thread};
use super::vote::VoteCount;

/// A reply with its author, vote aggregate and nested replies.
///
/// The derived `Serialize` recurses per level; serialize deep subtrees as
/// part of a [`ThreadComplete`].
#[derive(Serialize, Deserialize)]
pub struct HydratedReply {
    /// The reply row.
    pub reply: Reply,
    /// Resolved author.
    pub account: Account,
    /// Votes cast on this reply.
    pub votes: VoteCount,
    /// Direct children in stable input order.
    pub children: Vec<HydratedReply>,
}

impl HydratedReply {
    /// Reply identifier.
    pub fn id(&self) -> NodeId {
        self.reply.id
    }

    /// Number of replies nested below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&HydratedReply> = self.children.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    fn shallow_clone(&self) -> Self {
        Self {
            reply: self.reply.clone(),
            account: self.account.clone(),
            votes: self.votes,
            children: Vec::with_capacity(self.children.len()),
        }
    }
}

impl Clone for HydratedReply {
    fn clone(&self) -> Self {
        // Depth-first copy: a frame is finished once it holds as many
        // children as its source, then it moves into its parent frame.
        let mut stack: Vec<(&HydratedReply, HydratedReply)> = Vec::new();
        let mut current = (self, self.shallow_clone());
        loop {
            let source = current.0;
            if let Some(child) = source.children.get(current.1.children.len()) {
                stack.push(current);
                current = (child, child.shallow_clone());
                continue;
            }
            match stack.pop() {
                Some((parent_source, mut parent)) => {
                    parent.children.push(current.1);
                    current = (parent_source, parent);
                }
                None => return current.1,
            }
        }
    }
}

impl PartialEq for HydratedReply {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.reply != b.reply
                || a.account != b.account
                || a.votes != b.votes
                || a.children.len() != b.children.len()
            {
                return false;
            }
            stack.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl fmt::Debug for HydratedReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let children: Vec<NodeId> = self.children.iter().map(HydratedReply::id).collect();
        f.debug_struct("HydratedReply")
            .field("reply", &self.reply)
            .field("account", &self.account)
            .field("votes", &self.votes)
            .field("children", &children)
            .finish()
    }
}

// Deep reply chains would otherwise be dropped recursively, one stack
// frame per level.
impl Drop for HydratedReply {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A fully hydrated thread: the thread, its author, its votes and its
/// entire reply forest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThreadComplete {
    /// The thread row.
    pub thread: Thread,
    /// Resolved thread author.
    pub account: Account,
    /// Votes cast on the thread itself.
    pub votes: VoteCount,
    /// Top-level replies, each carrying its nested subtree.
    pub replies: Vec<HydratedReply>,
}

impl Serialize for ThreadComplete {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename = "ThreadComplete")]
        struct Fields<'a> {
            thread: &'a Thread,
            account: &'a Account,
            votes: &'a VoteCount,
            replies: &'a [HydratedReply],
        }

        let fields = Fields {
            thread: &self.thread,
            account: &self.account,
            votes: &self.votes,
            replies: &self.replies,
        };
        fields.serialize(serde_stacker::Serializer::new(serializer))
    }
}

/// One step of a pre-order walk over a reply forest.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    /// The visited reply.
    pub node: &'a HydratedReply,
    /// The node it is structurally nested under (the thread id at the top level).
    pub parent: NodeId,
    /// Nesting depth, 1 for top-level replies.
    pub depth: usize,
}

/// Iterative pre-order traversal of a reply forest.
pub struct Preorder<'a> {
    stack: Vec<Visit<'a>>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let visit = self.stack.pop()?;
        let parent = visit.node.id();
        // Reverse so the first child is popped first.
        for child in visit.node.children.iter().rev() {
            self.stack.push(Visit {
                node: child,
                parent,
                depth: visit.depth + 1,
            });
        }
        Some(visit)
    }
}

impl ThreadComplete {
    /// Thread identifier.
    pub fn id(&self) -> NodeId {
        self.thread.id
    }

    /// Walk every reply in pre-order (parents before children, siblings in order).
    pub fn iter_preorder(&self) -> Preorder<'_> {
        let root = self.thread.id;
        Preorder {
            stack: self
                .replies
                .iter()
                .rev()
                .map(|node| Visit { node, parent: root, depth: 1 })
                .collect(),
        }
    }

    /// Total number of replies in the forest.
    pub fn reply_count(&self) -> usize {
        self.replies.len()
            + self.replies.iter().map(HydratedReply::descendant_count).sum::<usize>()
    }

    /// Depth of the deepest reply, 0 for a thread with no replies.
    pub fn depth(&self) -> usize {
        self.iter_preorder().map(|v| v.depth).max().unwrap_or(0)
    }

    /// Find a reply anywhere in the forest.
    pub fn find(&self, id: &NodeId) -> Option<&HydratedReply> {
        self.iter_preorder().map(|v| v.node).find(|n| n.id() == *id)
    }

    /// Deterministic fingerprint of the whole composite.
    ///
    /// Two compositions of the same snapshot always share a fingerprint.
    pub fn fingerprint(&self) -> serde_json::Result<String> {
        canonical_hash_hex(self)
    }

    /// Parse a composite from JSON, at any nesting depth.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut de = serde_json::Deserializer::from_str(json);
        de.disable_recursion_limit();
        let complete = Self::deserialize(serde_stacker::Deserializer::new(&mut de))?;
        de.end()?;
        Ok(complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, VoteCount};
    use chrono::DateTime;
    use uuid::Uuid;

    fn nid(n: u128) -> NodeId {
        NodeId::new(Uuid::from_u128(n))
    }

    fn account() -> Account {
        Account::new(
            AccountId::new(Uuid::from_u128(1)),
            "up-1",
            "user1",
            "u1@example.com",
            DateTime::from_timestamp(1000, 0).unwrap(),
        )
    }

    fn node(id: u128, parent: u128, children: Vec<HydratedReply>) -> HydratedReply {
        HydratedReply {
            reply: Reply::new(
                nid(id),
                nid(100),
                AccountId::new(Uuid::from_u128(1)),
                nid(parent),
                format!("reply {}", id),
                DateTime::from_timestamp(1000 + id as i64, 0).unwrap(),
            ),
            account: account(),
            votes: VoteCount::zero(),
            children,
        }
    }

    fn sample() -> ThreadComplete {
        //  100
        //  ├── 1
        //  │   ├── 2
        //  │   │   └── 4
        //  │   └── 3
        //  └── 5
        ThreadComplete {
            thread: Thread::new(
                nid(100),
                AccountId::new(Uuid::from_u128(1)),
                "t-1",
                "Title",
                "Body",
                DateTime::from_timestamp(1000, 0).unwrap(),
            ),
            account: account(),
            votes: VoteCount::zero(),
            replies: vec![
                node(1, 100, vec![node(2, 1, vec![node(4, 2, vec![])]), node(3, 1, vec![])]),
                node(5, 100, vec![]),
            ],
        }
    }

    #[test]
    fn test_preorder_order_and_parents() {
        let complete = sample();
        let visits: Vec<(NodeId, NodeId, usize)> = complete
            .iter_preorder()
            .map(|v| (v.node.id(), v.parent, v.depth))
            .collect();

        assert_eq!(
            visits,
            vec![
                (nid(1), nid(100), 1),
                (nid(2), nid(1), 2),
                (nid(4), nid(2), 3),
                (nid(3), nid(1), 2),
                (nid(5), nid(100), 1),
            ]
        );
    }

    #[test]
    fn test_counts_and_lookup() {
        let complete = sample();
        assert_eq!(complete.reply_count(), 5);
        assert_eq!(complete.depth(), 3);
        assert_eq!(complete.replies[0].descendant_count(), 3);
        assert_eq!(complete.find(&nid(4)).map(|n| n.reply.body.as_str()), Some("reply 4"));
        assert!(complete.find(&nid(42)).is_none());
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.replies[1].votes = VoteCount::new(1, 0);
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    /// Thread 100 with a single chain of replies 1001..=1000 + depth.
    fn chain(depth: u128) -> ThreadComplete {
        let base = 1_000;
        let mut current = node(base + depth, base + depth - 1, vec![]);
        for k in (1..depth).rev() {
            let parent = if k == 1 { 100 } else { base + k - 1 };
            current = node(base + k, parent, vec![current]);
        }
        let mut complete = sample();
        complete.replies = vec![current];
        complete
    }

    #[test]
    fn test_deep_chain_fingerprint_and_json() {
        let complete = chain(20_000);
        assert_eq!(complete.depth(), 20_000);

        let fingerprint = complete.fingerprint().unwrap();
        assert_eq!(fingerprint, complete.fingerprint().unwrap());

        let json = serde_json::to_string(&complete).unwrap();
        assert!(json.starts_with("{\"thread\":"));
        assert_eq!(json.matches("\"children\":[]").count(), 1);
    }

    #[test]
    fn test_deep_chain_json_round_trip() {
        let complete = chain(1_000);
        let json = serde_json::to_string(&complete).unwrap();

        let back = ThreadComplete::from_json(&json).unwrap();
        assert_eq!(back.depth(), 1_000);
        assert_eq!(back, complete);
        assert_eq!(back.fingerprint().unwrap(), complete.fingerprint().unwrap());
    }

    #[test]
    fn test_deep_chain_clone_eq_debug() {
        let complete = chain(50_000);
        let copy = complete.clone();
        assert_eq!(copy, complete);
        assert_eq!(copy.reply_count(), 50_000);

        assert_eq!(copy.iter_preorder().last().map(|v| v.node.id()), Some(nid(51_000)));

        let mut changed = complete.clone();
        changed.replies[0].votes = VoteCount::new(0, 1);
        assert_ne!(changed, complete);

        let debug = format!("{:?}", complete.replies[0]);
        assert!(debug.contains("HydratedReply"));
    }

    #[test]
    fn test_json_round_trip_shallow() {
        let complete = sample();
        let back = ThreadComplete::from_json(&serde_json::to_string(&complete).unwrap()).unwrap();
        assert_eq!(back, complete);

        let trailing = format!("{} {{}}", serde_json::to_string(&complete).unwrap());
        assert!(ThreadComplete::from_json(&trailing).is_err());
    }

    #[test]
    fn test_deep_chain_drops_without_overflow() {
        let mut current = node(1_000_000, 999_999, vec![]);
        for id in (1..50_000u128).rev() {
            current = node(id, id.saturating_sub(1), vec![current]);
        }
        assert_eq!(current.descendant_count(), 49_999);
        drop(current);
    }
}
