use super::*;
use crate::db::{Database, HistoryStore, NoOpHistoryStore};
use crate::downloader::test_helpers::{MemorySink, MockFetcher, StaticResolver, test_config};
use crate::types::{Playlist, Track};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

mod history;

/// Test fixture: router plus the doubles behind it
struct TestApp {
    router: Router,
    downloader: Arc<BatchDownloader>,
    fetcher: Arc<MockFetcher>,
    _temp_dir: Option<tempfile::TempDir>,
}

fn playlist() -> Playlist {
    Playlist {
        title: "Mix".to_string(),
        tracks: vec![
            Track {
                id: "1".to_string(),
                title: "Intro".to_string(),
                artist: Some("Band".to_string()),
                url: "https://soundcloud.com/band/intro".to_string(),
            },
            Track {
                id: "2".to_string(),
                title: "Outro".to_string(),
                artist: None,
                url: "https://soundcloud.com/band/outro".to_string(),
            },
        ],
    }
}

fn build_app(
    config: Config,
    fetcher: Arc<MockFetcher>,
    history: Arc<dyn HistoryStore>,
    temp_dir: Option<tempfile::TempDir>,
) -> TestApp {
    let downloader = BatchDownloader::with_collaborators(
        config,
        fetcher.clone(),
        Arc::new(MemorySink::new()),
        history,
    )
    .unwrap()
    .with_resolver(Arc::new(StaticResolver {
        playlist: playlist(),
    }));
    let downloader = Arc::new(downloader);
    let router = create_router(downloader.clone(), downloader.config());

    TestApp {
        router,
        downloader,
        fetcher,
        _temp_dir: temp_dir,
    }
}

/// Router over in-memory doubles without persistence
fn create_test_app(fetcher: MockFetcher) -> TestApp {
    build_app(
        test_config(),
        Arc::new(fetcher),
        Arc::new(NoOpHistoryStore::new()),
        None,
    )
}

/// Router over in-memory doubles with a SQLite history
async fn create_test_app_with_db(fetcher: MockFetcher) -> TestApp {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
    build_app(test_config(), Arc::new(fetcher), Arc::new(db), Some(temp_dir))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn wait_until_idle(downloader: &BatchDownloader) {
    while downloader.is_running() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = create_test_app(MockFetcher::new());

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let mut config = test_config();
    config.server.cors_origins = vec!["http://app.example".to_string()];
    let app = build_app(
        config,
        Arc::new(MockFetcher::new()),
        Arc::new(NoOpHistoryStore::new()),
        None,
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://app.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://app.example"
    );
}

#[tokio::test]
async fn test_api_server_spawns() {
    let app = create_test_app(MockFetcher::new());

    let mut config = (*app.downloader.config()).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = app.downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}
