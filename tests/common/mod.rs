//! Common test utilities for playlist-dl end-to-end tests

#![allow(dead_code)]

use playlist_dl::{BatchDownloader, BatchId, BatchState, Config, Event};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DOWNLOAD_PATH: &str = "/api/download-soundcloud";
pub const PLAYLIST_PATH: &str = "/api/soundcloud-playlist-downloader";

/// Config pointing at `server`, writing into `temp_dir`
pub fn config_for(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.fetch.base_url = server.uri();
    config.batch.output_dir = temp_dir.path().join("downloads");
    config.batch.pacing_delay = Duration::from_millis(20);
    config.batch.shutdown_timeout = Duration::from_secs(2);
    config.persistence.database_path = temp_dir.path().join("history.db");
    config
}

/// Serve `body` for downloads of `source_url`
pub async fn mount_track(server: &MockServer, source_url: &str, body: &[u8]) {
    Mock::given(method("POST"))
        .and(path(DOWNLOAD_PATH))
        .and(body_partial_json(serde_json::json!({ "url": source_url })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "audio/mpeg")
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

/// Answer downloads of `source_url` with an error status
pub async fn mount_failing_track(server: &MockServer, source_url: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(DOWNLOAD_PATH))
        .and(body_partial_json(serde_json::json!({ "url": source_url })))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": format!("cannot download {}", source_url)
        })))
        .mount(server)
        .await;
}

/// Answer playlist resolution with `playlist`
pub async fn mount_playlist(server: &MockServer, playlist: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(PLAYLIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(playlist))
        .mount(server)
        .await;
}

/// Wait for `BatchFinished` of `batch_id`
///
/// Subscribe before starting the batch when it may finish quickly; pass
/// the receiver in through `events`.
pub async fn wait_for_batch(
    mut events: tokio::sync::broadcast::Receiver<Event>,
    batch_id: BatchId,
    timeout: Duration,
) -> Option<BatchState> {
    tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::BatchFinished {
                    batch_id: finished,
                    state,
                    ..
                }) if finished == batch_id => return Some(state),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Downloader over the mocked service, with persistence in `temp_dir`
pub async fn downloader_for(server: &MockServer, temp_dir: &TempDir) -> BatchDownloader {
    BatchDownloader::new(config_for(server, temp_dir))
        .await
        .unwrap()
}
