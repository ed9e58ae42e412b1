use super::*;
use crate::downloader::test_helpers::ScriptedFetcher;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

mod metadata;

/// Build a router over a scripted fetcher and a tempdir store
async fn create_test_app(
    fetcher: Arc<ScriptedFetcher>,
) -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(fetcher).await;
    let downloader = Arc::new(downloader);
    let config = Arc::new(downloader.config().clone());
    let app = create_router(downloader.clone(), config);
    (app, downloader, temp_dir)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (app, _downloader, _dir) = create_test_app(Arc::new(ScriptedFetcher::new())).await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (app, _downloader, _dir) = create_test_app(Arc::new(ScriptedFetcher::new())).await;

    let response = app.oneshot(get_request("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "media-dl REST API");
    assert!(body["paths"]["/jobs"].is_object());
}

#[tokio::test]
async fn cors_headers_are_emitted_when_enabled() {
    let (app, _downloader, _dir) = create_test_app(Arc::new(ScriptedFetcher::new())).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_can_be_disabled() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (downloader, _dir) =
        crate::downloader::test_helpers::create_test_downloader(fetcher).await;
    let downloader = Arc::new(downloader);

    let mut config = downloader.config().clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "no CORS headers when disabled"
    );
}

#[tokio::test]
async fn api_server_binds_and_serves() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let (downloader, _dir) =
        crate::downloader::test_helpers::create_test_downloader(fetcher).await;
    let downloader = Arc::new(downloader);

    // Port 0 = OS assigns a free port
    let mut config = downloader.config().clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!handle.is_finished(), "server must still be serving");
    handle.abort();
}
