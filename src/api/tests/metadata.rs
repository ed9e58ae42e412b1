//! Tests for the metadata resolution endpoint.

use super::*;
use crate::downloader::test_helpers::{ScriptedFetcher, video_metadata};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn metadata_query_returns_resolved_fields() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher
        .push_resolve(Ok(video_metadata("My Clip!", "mp4")))
        .await;
    let (app, _downloader, _dir) = create_test_app(fetcher).await;

    let response = app
        .oneshot(post_json(
            "/metadata",
            json!({ "url": "https://example.com/watch?v=abc" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["title"], "My Clip!");
    assert_eq!(body["ext"], "mp4");
    assert_eq!(body["uploader"], "tester");
}

#[tokio::test]
async fn resolution_failure_carries_the_suggestion() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher
        .push_resolve(Err(crate::error::Error::Resolution {
            message: "ERROR: login required".to_string(),
            suggestion: Some("Export a cookies.txt file and configure it".to_string()),
        }))
        .await;
    let (app, _downloader, _dir) = create_test_app(fetcher).await;

    let response = app
        .oneshot(post_json(
            "/metadata",
            json!({ "url": "https://example.com/watch?v=abc", "platform": "instagram" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "resolution_failure");
    assert!(
        body["error"]["details"]["suggestion"]
            .as_str()
            .unwrap()
            .contains("cookies.txt")
    );
}

#[tokio::test]
async fn metadata_query_rejects_malformed_urls() {
    let (app, _downloader, _dir) = create_test_app(Arc::new(ScriptedFetcher::new())).await;

    let response = app
        .oneshot(post_json("/metadata", json!({ "url": "::nope::" })))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
