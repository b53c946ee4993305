//! Sequential batch downloader split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`batch`] - Batch admission and the sequential download loop
//! - [`lifecycle`] - Construction and shutdown coordination
//! - [`playlist`] - Playlist resolution feeding the batch loop

mod batch;
mod lifecycle;
mod playlist;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::HistoryStore;
use crate::transfer::{FileSink, PayloadFetcher, PlaylistResolver};
use crate::types::{BatchProgress, Event};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64};

/// Admission state shared by every clone of the downloader
#[derive(Clone)]
pub(crate) struct BatchSlot {
    /// Set while a batch owns the loop
    pub(crate) active: Arc<AtomicBool>,
    /// Id of the batch owning the loop (0 while it is being registered)
    pub(crate) active_batch: Arc<AtomicI64>,
    /// Flag to indicate whether new batches are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

impl BatchSlot {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            active_batch: Arc::new(AtomicI64::new(0)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Fetch, save and resolve collaborators
#[derive(Clone)]
pub(crate) struct Collaborators {
    /// Retrieves payload bytes for a task
    pub(crate) fetcher: Arc<dyn PayloadFetcher>,
    /// Persists payloads as files
    pub(crate) sink: Arc<dyn FileSink>,
    /// Expands playlist URLs into tracks
    pub(crate) resolver: Arc<dyn PlaylistResolver>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Processes one batch of tasks at a time, strictly in order, with a pacing
/// delay between consecutive tasks. Progress is readable at any time through
/// [`BatchDownloader::progress`]; per-task results are broadcast as [`Event`]s.
#[derive(Clone)]
pub struct BatchDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Batch history storage
    pub(crate) history: Arc<dyn HistoryStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Progress of the current (or last) batch
    pub(crate) progress: Arc<tokio::sync::RwLock<BatchProgress>>,
    /// Admission state
    pub(crate) slot: BatchSlot,
    /// External collaborators
    pub(crate) collaborators: Collaborators,
}

impl BatchDownloader {
    /// Subscribe to batch events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// If a subscriber falls behind by more than 1000 events it receives
    /// `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use playlist_dl::{BatchDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = BatchDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "batch event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the current batch progress
    pub async fn progress(&self) -> BatchProgress {
        self.progress.read().await.clone()
    }

    /// True while a batch owns the loop
    pub fn is_running(&self) -> bool {
        self.slot.active.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Get the current configuration
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Batch history storage
    pub fn history(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.history)
    }

    /// Emit an event to all subscribers
    ///
    /// Events are dropped when nobody is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<crate::Result<()>> {
        let downloader = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
