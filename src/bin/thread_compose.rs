//! Thread Compose CLI
//!
//! Reads a `ThreadSnapshot` as JSON, composes it and prints the hydrated
//! thread as JSON on stdout. Logs go to stderr.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: thread_compose=info,thread_kernel=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//! - `THREAD_KERNEL_PARALLEL_THRESHOLD`: rows at which tally and forest build in parallel
//! - `THREAD_KERNEL_FETCH_TIMEOUT_MS`: provider fetch timeout
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin thread_compose --features cli -- fixtures/basic_thread.json
//! cat snapshot.json | cargo run --bin thread_compose --features cli -- --fingerprint
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use thread_kernel::{
    InMemoryThreadStore, LoaderConfig, ThreadComplete, ThreadLoader, ThreadOutcome, ThreadSnapshot,
    THREAD_KERNEL_SCHEMA_VERSION,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "thread_compose=info,thread_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Output envelope.
#[derive(Serialize)]
struct ComposeOutput<'a> {
    schema_version: &'static str,
    fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread: Option<&'a ThreadComplete>,
}

async fn read_input(path: Option<&str>) -> std::io::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let fingerprint_only = args.iter().any(|a| a == "--fingerprint");
    let path = args.iter().find(|a| !a.starts_with("--")).map(String::as_str);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = path.unwrap_or("<stdin>"),
        "Composing thread snapshot"
    );

    let raw = read_input(path).await?;
    let snapshot: ThreadSnapshot = serde_json::from_str(&raw).map_err(|e| {
        error!(error = %e, "Snapshot is not valid JSON");
        e
    })?;
    let thread_id = snapshot.thread_id();

    let store = Arc::new(InMemoryThreadStore::from_snapshot(snapshot));
    let loader = ThreadLoader::with_config(store, LoaderConfig::from_env());

    let complete = match loader.load(thread_id).await {
        ThreadOutcome::Found(complete) => complete,
        outcome => {
            let err = outcome.into_result().err().map(|e| e.to_string()).unwrap_or_default();
            error!(thread_id = %thread_id, error = %err, "Composition failed");
            return Err(err.into());
        }
    };

    let output = ComposeOutput {
        schema_version: THREAD_KERNEL_SCHEMA_VERSION,
        fingerprint: complete.fingerprint()?,
        thread: (!fingerprint_only).then_some(&complete),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!(
        thread_id = %thread_id,
        reply_count = complete.reply_count(),
        depth = complete.depth(),
        "Composition complete"
    );

    Ok(())
}
