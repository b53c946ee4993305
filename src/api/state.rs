//! Application state for the API server

use crate::{BatchDownloader, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The batch downloader serving requests
    pub downloader: Arc<BatchDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
