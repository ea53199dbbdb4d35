//! # thread-kernel
//!
//! Deterministic composition of threaded discussions.
//!
//! The kernel answers one question:
//!
//! > Given the flat rows of a thread, what does the fully hydrated
//! > discussion look like?
//!
//! ## Core Contract
//!
//! 1. Tally votes per target (thread or reply) in one pass
//! 2. Rebuild the reply forest from `reply_to_id` references, rejecting
//!    orphans, cycles and missing authors
//! 3. Return one immutable [`ThreadComplete`] or a named failure
//!
//! ## Architecture
//!
//! ```text
//! SnapshotProvider → ThreadSnapshot → ThreadComposer → ThreadComplete
//!  (Memory, ...)                        ├── VoteTally
//!                                       └── ReplyTreeBuilder → ReplyForest
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Sibling order is the input order of the reply rows, never re-sorted
//! - Same snapshot → identical [`ThreadComplete`] and fingerprint
//! - Traversals are iterative; depth is bounded by memory, not stack

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod aggregate;
pub mod forest;
pub mod compose;
pub mod store;
pub mod loader;
pub mod canonical;

// Re-exports
pub use types::{
    AccountId, NodeId, VoteId, Account, Thread, Reply, Vote, VoteDirection, VoteCount,
    ThreadSnapshot, HydratedReply, ThreadComplete, Extras,
};
pub use aggregate::{aggregate, VoteTally};
pub use forest::{build_forest, ReplyForest, ReplyTreeBuilder, StructuralError};
pub use compose::{compose, ComposeConfig, CompositionError, ThreadComposer};
pub use store::{SnapshotProvider, InMemoryThreadStore};
pub use loader::{LoadError, LoaderConfig, ThreadLoader, ThreadOutcome};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

/// Schema version for the composite output types.
/// Increment on breaking changes to any serialized type.
pub const THREAD_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
