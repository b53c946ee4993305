use super::*;
use serde_json::json;

async fn run_batch_over_http(app: &TestApp, ids: &[&str]) -> i64 {
    let tasks: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| json!({"id": id, "display_name": format!("Track {}", id), "source_reference": id}))
        .collect();

    let response = app
        .router
        .clone()
        .oneshot(post_json("/batches", json!({ "tasks": tasks })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let batch_id = json_body(response).await["batch_id"].as_i64().unwrap();

    wait_until_idle(&app.downloader).await;
    batch_id
}

#[tokio::test]
async fn test_history_empty() {
    let app = create_test_app_with_db(MockFetcher::new()).await;

    let response = app.router.oneshot(get("/history")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["limit"], 50);
    assert_eq!(body["offset"], 0);
}

#[tokio::test]
async fn test_history_lists_finished_batches() {
    let app = create_test_app_with_db(MockFetcher::new().failing_on("b")).await;

    let first = run_batch_over_http(&app, &["a"]).await;
    let second = run_batch_over_http(&app, &["a", "b"]).await;

    let response = app.router.clone().oneshot(get("/history")).await.unwrap();
    let body = json_body(response).await;
    let items = body["items"].as_array().unwrap();

    assert_eq!(items.len(), 2);
    // most recent first
    assert_eq!(items[0]["id"], second);
    assert_eq!(items[0]["state"], "failed");
    assert_eq!(items[0]["succeeded"], 1);
    assert_eq!(items[0]["failed"], 1);
    assert_eq!(items[1]["id"], first);
    assert_eq!(items[1]["state"], "completed");

    let response = app
        .router
        .oneshot(get("/history?limit=1&offset=1"))
        .await
        .unwrap();
    let body = json_body(response).await;
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], first);
    assert_eq!(body["limit"], 1);
}

#[tokio::test]
async fn test_history_limit_clamped() {
    let app = create_test_app_with_db(MockFetcher::new()).await;

    let response = app
        .router
        .oneshot(get("/history?limit=0&offset=-5"))
        .await
        .unwrap();

    let body = json_body(response).await;
    assert_eq!(body["limit"], 1);
    assert_eq!(body["offset"], 0);
}

#[tokio::test]
async fn test_get_batch_with_outcomes() {
    let app = create_test_app_with_db(MockFetcher::new().failing_on("b")).await;
    let batch_id = run_batch_over_http(&app, &["a", "b", "c"]).await;

    let response = app
        .router
        .oneshot(get(&format!("/history/{}", batch_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["batch"]["id"], batch_id);
    assert_eq!(body["batch"]["total"], 3);

    let outcomes = body["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["position"], 0);
    assert_eq!(outcomes[1]["succeeded"], false);
    assert!(
        outcomes[1]["error_detail"]
            .as_str()
            .unwrap()
            .contains("cannot fetch b")
    );
    assert_eq!(outcomes[2]["task"]["id"], "c");
}

#[tokio::test]
async fn test_get_unknown_batch_not_found() {
    let app = create_test_app_with_db(MockFetcher::new()).await;

    let response = app.router.oneshot(get("/history/999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_clear_history() {
    let app = create_test_app_with_db(MockFetcher::new()).await;
    run_batch_over_http(&app, &["a"]).await;
    run_batch_over_http(&app, &["b"]).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/history")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["deleted"], 2);

    let response = app.router.oneshot(get("/history")).await.unwrap();
    let body = json_body(response).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_without_persistence_is_empty() {
    let app = create_test_app(MockFetcher::new());
    run_batch_over_http(&app, &["a"]).await;

    let response = app.router.oneshot(get("/history")).await.unwrap();

    let body = json_body(response).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}
