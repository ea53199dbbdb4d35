//! Reply forest construction.
//!
//! Turns the flat reply rows of one thread into a validated forest rooted
//! at the thread, then hydrates it into owned [`HydratedReply`] trees.
//!
//! ## Algorithm
//!
//! 1. Index replies by id into an arena (rejecting duplicates, replies of
//!    other threads and replies whose author is missing)
//! 2. Group children under their `reply_to_id` in one pass, keeping input
//!    order within every group (rejecting unresolvable parents)
//! 3. Walk from the root with an explicit stack, recording pre-order
//! 4. Any reply the walk never reached sits on a parent cycle; follow its
//!    parent chain with an on-path set to name the reply that repeats
//! 5. Hydrate bottom-up in reverse pre-order so every child is finished
//!    before its parent
//!
//! No step recurses, so depth is bounded by memory rather than the call stack.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::aggregate::VoteTally;
use crate::types::{Account, AccountId, HydratedReply, NodeId, Reply};

/// Structural defect in a thread's rows.
///
/// Any of these fails composition outright; a partially built tree would
/// misrepresent the discussion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A reply's parent is neither the thread nor a reply in the snapshot.
    #[error("Orphaned reply {reply_id}: parent {reply_to_id} not found in thread")]
    OrphanedReply {
        /// The reply with the dangling parent reference.
        reply_id: NodeId,
        /// The unresolved parent id.
        reply_to_id: NodeId,
    },
    /// A reply's parent chain revisits itself.
    #[error("Cycle detected: reply {reply_id} is its own ancestor")]
    CycleDetected {
        /// The reply at which the parent chain repeats.
        reply_id: NodeId,
    },
    /// A thread or reply references an account absent from the snapshot.
    #[error("Missing author {account_id} for node {node_id}")]
    MissingAuthor {
        /// The thread or reply whose author is missing.
        node_id: NodeId,
        /// The unresolved account id.
        account_id: AccountId,
    },
    /// Two reply rows share an id, or a reply reuses the thread id.
    #[error("Duplicate reply id {reply_id}")]
    DuplicateReply {
        /// The repeated id.
        reply_id: NodeId,
    },
    /// A reply row belongs to a different thread.
    #[error("Reply {reply_id} belongs to thread {thread_id}, not the thread being built")]
    ForeignReply {
        /// The misplaced reply.
        reply_id: NodeId,
        /// The thread it claims to belong to.
        thread_id: NodeId,
    },
}

/// Builds reply forests for one thread.
#[derive(Debug, Clone, Copy)]
pub struct ReplyTreeBuilder<'a> {
    root_id: NodeId,
    accounts: &'a BTreeMap<AccountId, Account>,
}

impl<'a> ReplyTreeBuilder<'a> {
    /// Create a builder rooted at `root_id` (the thread id), resolving
    /// authors from `accounts`.
    pub fn new(root_id: NodeId, accounts: &'a BTreeMap<AccountId, Account>) -> Self {
        Self { root_id, accounts }
    }

    /// Validate `replies` and arrange them into a forest.
    pub fn build<'r>(&self, replies: &'r [Reply]) -> Result<ReplyForest<'r>, StructuralError>
    where
        'a: 'r,
    {
        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(replies.len());
        let mut authors: Vec<&'r Account> = Vec::with_capacity(replies.len());

        for (i, reply) in replies.iter().enumerate() {
            if reply.id == self.root_id || index.insert(reply.id, i).is_some() {
                return Err(StructuralError::DuplicateReply { reply_id: reply.id });
            }
            if reply.thread_id != self.root_id {
                return Err(StructuralError::ForeignReply {
                    reply_id: reply.id,
                    thread_id: reply.thread_id,
                });
            }
            let author = self.accounts.get(&reply.account_id).ok_or(
                StructuralError::MissingAuthor {
                    node_id: reply.id,
                    account_id: reply.account_id,
                },
            )?;
            authors.push(author);
        }

        // Stable grouping: pushing in input order keeps sibling order.
        let mut roots: Vec<usize> = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); replies.len()];
        let mut parents: Vec<Option<usize>> = vec![None; replies.len()];

        for (i, reply) in replies.iter().enumerate() {
            if reply.reply_to_id == self.root_id {
                roots.push(i);
            } else if let Some(&parent) = index.get(&reply.reply_to_id) {
                children[parent].push(i);
                parents[i] = Some(parent);
            } else {
                return Err(StructuralError::OrphanedReply {
                    reply_id: reply.id,
                    reply_to_id: reply.reply_to_id,
                });
            }
        }

        let mut order: Vec<usize> = Vec::with_capacity(replies.len());
        let mut depths: Vec<usize> = vec![0; replies.len()];
        let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&i| (i, 1)).collect();

        while let Some((i, depth)) = stack.pop() {
            order.push(i);
            depths[i] = depth;
            stack.extend(children[i].iter().rev().map(|&c| (c, depth + 1)));
        }

        if order.len() < replies.len() {
            return Err(find_cycle(replies, &depths, &parents));
        }

        Ok(ReplyForest {
            root_id: self.root_id,
            replies,
            index,
            authors,
            roots,
            children,
            parents,
            order,
            depth: depths.iter().copied().max().unwrap_or(0),
        })
    }
}

/// Name the first reply (in input order of the unreached ones) whose
/// parent chain repeats.
///
/// Only called when some reply was unreachable from the root. Every
/// parent resolved during grouping, so an unreached chain can neither
/// end at the root nor join a reached reply; it must loop.
fn find_cycle(replies: &[Reply], depths: &[usize], parents: &[Option<usize>]) -> StructuralError {
    // Depth 0 marks a reply the root walk never reached.
    let start = depths.iter().position(|&d| d == 0).unwrap_or(0);

    let mut on_path: HashSet<usize> = HashSet::new();
    let mut current = start;
    while on_path.insert(current) {
        match parents[current] {
            Some(parent) => current = parent,
            None => break,
        }
    }

    StructuralError::CycleDetected {
        reply_id: replies[current].id,
    }
}

/// A validated reply forest borrowing its rows.
///
/// Every reply is reachable from the root exactly once, every author is
/// resolved and sibling order equals input order.
#[derive(Debug, Clone)]
pub struct ReplyForest<'r> {
    root_id: NodeId,
    replies: &'r [Reply],
    index: HashMap<NodeId, usize>,
    authors: Vec<&'r Account>,
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    order: Vec<usize>,
    depth: usize,
}

impl<'r> ReplyForest<'r> {
    /// The root key (thread id).
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Number of replies in the forest.
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    /// Whether the forest has no replies.
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Depth of the deepest reply, 0 when empty.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Ids of the top-level replies, in order.
    pub fn top_level(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots.iter().map(|&i| self.replies[i].id)
    }

    /// Reply ids in pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().map(|&i| self.replies[i].id)
    }

    /// Whether `id` is a reply of this forest.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Structural parent of a reply: the thread id for top-level replies.
    pub fn parent_of(&self, id: &NodeId) -> Option<NodeId> {
        let i = self.position(id)?;
        Some(match self.parents[i] {
            Some(parent) => self.replies[parent].id,
            None => self.root_id,
        })
    }

    fn position(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Materialize owned trees, attaching each reply's vote count.
    pub fn hydrate(&self, votes: &VoteTally) -> Vec<HydratedReply> {
        let mut built: Vec<Option<HydratedReply>> = Vec::with_capacity(self.replies.len());
        built.resize_with(self.replies.len(), || None);

        // Reverse pre-order finishes every child before its parent.
        for &i in self.order.iter().rev() {
            let reply = &self.replies[i];
            let children = self.children[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[i] = Some(HydratedReply {
                reply: reply.clone(),
                account: self.authors[i].clone(),
                votes: votes.get(&reply.id),
                children,
            });
        }

        self.roots
            .iter()
            .filter_map(|&i| built[i].take())
            .collect()
    }
}

/// Build the hydrated forest of one thread without vote counts.
pub fn build_forest(
    replies: &[Reply],
    root_id: NodeId,
    accounts: &BTreeMap<AccountId, Account>,
) -> Result<Vec<HydratedReply>, StructuralError> {
    let forest = ReplyTreeBuilder::new(root_id, accounts).build(replies)?;
    Ok(forest.hydrate(&VoteTally::new()))
}
