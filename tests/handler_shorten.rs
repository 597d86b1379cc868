mod common;

use axum::{Router, http::StatusCode, routing::post};
use axum_test::TestServer;
use rate_limited_shortener::api::handlers::shorten_handler;
use rate_limited_shortener::error::UNPROCESSABLE_REQUEST_MESSAGE;
use rate_limited_shortener::state::AppState;
use serde_json::json;

fn server(state: AppState) -> TestServer {
    let app = Router::new()
        .route("/api/shorten", post(shorten_handler))
        .with_state(state);

    TestServer::new(app).unwrap()
}

#[tokio::test]
async fn test_shorten_url_success() {
    let state = common::create_test_state();
    let server = server(state.clone());

    let response = server
        .post("/api/shorten")
        .json(&json!({ "original": "https://example.com/some/long/path" }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let json = response.json::<serde_json::Value>();
    let code = json["shortCode"].as_str().unwrap();
    assert_eq!(code.len(), 10);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(
        state.url_service.retrieve_url(code).as_deref(),
        Some("https://example.com/some/long/path")
    );
}

#[tokio::test]
async fn test_shorten_same_url_twice_gives_distinct_codes() {
    let server = server(common::create_test_state());
    let body = json!({ "original": "https://example.com" });

    let first = server.post("/api/shorten").json(&body).await;
    let second = server.post("/api/shorten").json(&body).await;

    first.assert_status(StatusCode::CREATED);
    second.assert_status(StatusCode::CREATED);
    assert_ne!(
        first.json::<serde_json::Value>()["shortCode"],
        second.json::<serde_json::Value>()["shortCode"]
    );
}

#[tokio::test]
async fn test_shorten_rejects_unsupported_protocol() {
    let server = server(common::create_test_state());

    let response = server
        .post("/api/shorten")
        .json(&json!({ "original": "ftp://example.com/file" }))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({
        "errorMessage": "Invalid protocol provided. Only http:// or https:// allowed"
    }));
}

#[tokio::test]
async fn test_shorten_rejects_malformed_url() {
    let server = server(common::create_test_state());

    let response = server
        .post("/api/shorten")
        .json(&json!({ "original": "not a url" }))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "errorMessage": "Invalid url provided" }));
}

#[tokio::test]
async fn test_shorten_rejects_missing_host() {
    let server = server(common::create_test_state());

    let response = server
        .post("/api/shorten")
        .json(&json!({ "original": "http://" }))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "errorMessage": "Invalid url provided" }));
}

#[tokio::test]
async fn test_shorten_rejects_too_long_url() {
    let mut config = common::test_config();
    config.url_store.max_url_length = 32;
    let server = server(common::create_test_state_with(config));

    let response = server
        .post("/api/shorten")
        .json(&json!({ "original": format!("https://example.com/{}", "a".repeat(32)) }))
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "errorMessage": "Provided url exceeds max-length of 32" }));
}

#[tokio::test]
async fn test_shorten_rejects_missing_original() {
    let server = server(common::create_test_state());

    let response = server.post("/api/shorten").json(&json!({})).await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "errorMessage": "Invalid url provided" }));
}

#[tokio::test]
async fn test_shorten_rejects_undecodable_body() {
    let server = server(common::create_test_state());

    let response = server
        .post("/api/shorten")
        .text("{\"original\": ")
        .content_type("application/json")
        .await;

    response.assert_status_bad_request();
    response.assert_json(&json!({ "errorMessage": UNPROCESSABLE_REQUEST_MESSAGE }));
}

#[tokio::test]
async fn test_shorten_evicts_when_store_full() {
    let mut config = common::test_config();
    config.url_store.capacity = 2;
    let state = common::create_test_state_with(config);
    let server = server(state.clone());

    for n in 0..3 {
        server
            .post("/api/shorten")
            .json(&json!({ "original": format!("https://example.com/{n}") }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    assert_eq!(state.url_service.len(), 2);
}
