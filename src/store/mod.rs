//! Row snapshot providers.

pub mod memory;

use async_trait::async_trait;
use crate::types::{NodeId, ThreadSnapshot};

/// Trait for sources of thread row snapshots.
///
/// Implementations must return all rows of a thread from one consistent
/// read, with a stable order for replies and votes.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Error type for provider operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch every row needed to compose a thread, or `None` if the thread
    /// does not exist.
    async fn fetch_thread_composition(&self, thread_id: &NodeId) -> Result<Option<ThreadSnapshot>, Self::Error>;
}

pub use memory::InMemoryThreadStore;
