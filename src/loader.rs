//! Fetch-and-compose over a snapshot provider.
//!
//! The loader is the seam between I/O-bound providers and the pure
//! composer: it bounds how long a fetch may take, composes the snapshot
//! and reports the result as a [`ThreadOutcome`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::compose::{ComposeConfig, CompositionError, ThreadComposer};
use crate::store::SnapshotProvider;
use crate::types::{NodeId, ThreadComplete};

/// Default provider fetch timeout in milliseconds.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5000;

/// Error type for loading a thread.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The provider failed.
    #[error("Provider error: {0}")]
    Provider(String),
    /// The provider did not answer in time.
    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),
    /// The fetched rows could not be composed.
    #[error(transparent)]
    Composition(#[from] CompositionError),
}

impl LoadError {
    /// Create a provider error from any error type.
    pub fn from_provider<E: std::error::Error>(e: E) -> Self {
        Self::Provider(e.to_string())
    }
}

/// Result of loading one thread.
#[derive(Debug, Clone)]
pub enum ThreadOutcome {
    /// The thread was fetched and composed.
    Found(ThreadComplete),
    /// The provider has no such thread.
    NotFound(NodeId),
    /// Fetching or composing failed.
    Failed(LoadError),
}

impl ThreadOutcome {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Found(_) => "found",
            Self::NotFound(_) => "not_found",
            Self::Failed(_) => "error",
        }
    }

    /// Whether the thread was composed.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The composed thread, if any.
    pub fn ok(self) -> Option<ThreadComplete> {
        match self {
            Self::Found(complete) => Some(complete),
            _ => None,
        }
    }

    /// Collapse into a `Result`, reporting a missing thread as
    /// [`CompositionError::NotFound`].
    pub fn into_result(self) -> Result<ThreadComplete, LoadError> {
        match self {
            Self::Found(complete) => Ok(complete),
            Self::NotFound(id) => Err(CompositionError::NotFound(id).into()),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Upper bound on a provider fetch; `None` waits indefinitely.
    pub fetch_timeout: Option<Duration>,
    /// Settings for the composer.
    pub compose: ComposeConfig,
}

impl LoaderConfig {
    /// Load configuration from environment variables.
    ///
    /// - `THREAD_KERNEL_FETCH_TIMEOUT_MS`: fetch timeout, 0 disables (default: 5000)
    /// - `THREAD_KERNEL_PARALLEL_THRESHOLD`: see [`ComposeConfig::from_env`]
    pub fn from_env() -> Self {
        let timeout_ms = std::env::var("THREAD_KERNEL_FETCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_MS);
        Self {
            fetch_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            compose: ComposeConfig::from_env(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Some(Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS)),
            compose: ComposeConfig::default(),
        }
    }
}

/// Loads and composes threads from a [`SnapshotProvider`].
pub struct ThreadLoader<P: SnapshotProvider> {
    provider: Arc<P>,
    composer: ThreadComposer,
    fetch_timeout: Option<Duration>,
}

impl<P: SnapshotProvider> ThreadLoader<P> {
    /// Create a loader with default settings.
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a loader with explicit settings.
    pub fn with_config(provider: Arc<P>, config: LoaderConfig) -> Self {
        Self {
            provider,
            composer: ThreadComposer::new(config.compose),
            fetch_timeout: config.fetch_timeout,
        }
    }

    /// Fetch and compose one thread.
    pub async fn load(&self, thread_id: NodeId) -> ThreadOutcome {
        let start = Instant::now();
        let mut vote_count = 0;

        let outcome = match self.fetch(&thread_id).await {
            Ok(Some(snapshot)) => {
                vote_count = snapshot.votes.len();
                match self.composer.compose_snapshot(&snapshot) {
                    Ok(complete) => ThreadOutcome::Found(complete),
                    Err(e) => ThreadOutcome::Failed(e.into()),
                }
            }
            Ok(None) => ThreadOutcome::NotFound(thread_id),
            Err(e) => ThreadOutcome::Failed(e),
        };

        record_composition_metrics(&thread_id, &outcome, vote_count, start.elapsed());
        outcome
    }

    /// Load several threads in order. One failure does not stop the rest.
    pub async fn load_many(&self, thread_ids: &[NodeId]) -> Vec<(NodeId, ThreadOutcome)> {
        let mut outcomes = Vec::with_capacity(thread_ids.len());
        for &thread_id in thread_ids {
            outcomes.push((thread_id, self.load(thread_id).await));
        }
        outcomes
    }

    /// Get a reference to the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch(&self, thread_id: &NodeId) -> Result<Option<crate::types::ThreadSnapshot>, LoadError> {
        let fetch = self.provider.fetch_thread_composition(thread_id);
        let fetched = match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| LoadError::Timeout(limit))?,
            None => fetch.await,
        };
        fetched.map_err(LoadError::from_provider)
    }
}

/// Record composition metrics.
///
/// Emitted as a structured event so log pipelines can aggregate it.
pub fn record_composition_metrics(
    thread_id: &NodeId,
    outcome: &ThreadOutcome,
    vote_count: usize,
    latency: Duration,
) {
    let reply_count = match outcome {
        ThreadOutcome::Found(complete) => complete.reply_count(),
        _ => 0,
    };
    info!(
        target: "thread_kernel::metrics",
        metric_type = "composition",
        thread_id = %thread_id,
        outcome = outcome.kind(),
        reply_count = reply_count,
        vote_count = vote_count,
        latency_us = latency.as_micros() as u64,
        "composition_metric"
    );
}
