//! # playlist-dl
//!
//! Paced, strictly sequential batch downloader for playlist tracks.
//!
//! A batch is an ordered list of [`DownloadTask`]s. Tasks are attempted one
//! at a time, in order, with a fixed pacing delay between consecutive fetches.
//! A failed task never aborts the batch: every task is attempted exactly once
//! (plus configured retries) and the batch ends `Completed` or `Failed`.
//!
//! Presentation layers follow a batch through [`BatchDownloader::progress`],
//! the [`Event`] broadcast channel, or the optional REST API.
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{AudioFormat, BatchDownloader, Config, DownloadTask};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let tasks = vec![
//!         DownloadTask::new("1", "Intro", "https://soundcloud.com/band/intro"),
//!         DownloadTask::new("2", "Outro", "https://soundcloud.com/band/outro"),
//!     ];
//!     let summary = downloader.run_batch(tasks, AudioFormat::Mp3).await?;
//!     println!("{} ok, {} failed", summary.succeeded, summary.failed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Batch history persistence
pub mod db;
/// Batch downloader (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Retry logic with exponential backoff
pub mod retry;
/// Fetch, save and playlist collaborators
pub mod transfer;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction};
pub use db::{Database, HistoryStore, NoOpHistoryStore};
pub use downloader::BatchDownloader;
pub use error::{
    ApiError, BatchError, DatabaseError, Error, ErrorDetail, FetchError, Result, ToHttpStatus,
};
pub use transfer::{FileSink, PayloadFetcher, PlaylistResolver};
pub use types::{
    AudioFormat, BatchId, BatchProgress, BatchRecord, BatchState, BatchSummary, DownloadOutcome,
    DownloadTask, Event, OutcomeRecord, Playlist, TaskId, Track,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method,
/// which lets a running batch finish within `batch.shutdown_timeout`.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{BatchDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = BatchDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: BatchDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
