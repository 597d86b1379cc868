mod common;

use std::fs;
use std::path::Path;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use rate_limited_shortener::routes::app_router;
use tower::ServiceExt;

fn frontend(dir: &Path) {
    fs::write(dir.join("index.html"), "<h1>home</h1>").unwrap();
    fs::create_dir_all(dir.join("docs")).unwrap();
    fs::write(dir.join("docs/page.html"), "<p>page</p>").unwrap();
    fs::write(dir.join("docs/page.txt"), "payload").unwrap();
    fs::create_dir_all(dir.join("notes.txt")).unwrap();
    fs::write(dir.join("notes.txt/inner.html"), "<p>inner</p>").unwrap();
}

async fn get(dir: &Path, path: &str) -> (StatusCode, String) {
    let mut config = common::test_config();
    config.frontend_dir = dir.to_path_buf();
    let state = common::create_test_state_with(config);

    let response = app_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_static_assets_are_served() {
    let dir = tempfile::tempdir().unwrap();
    frontend(dir.path());

    let (status, body) = get(dir.path(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<h1>home</h1>");

    let (status, body) = get(dir.path(), "/docs/page.html").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "<p>page</p>");
}

#[tokio::test]
async fn test_text_files_are_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    frontend(dir.path());

    for path in ["/docs/page.txt", "/notes.txt/inner.html", "/docs/page%2Etxt"] {
        let (status, body) = get(dir.path(), path).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert!(!body.contains("payload"));
    }
}

#[tokio::test]
async fn test_missing_text_file_is_still_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    frontend(dir.path());

    let (status, _) = get(dir.path(), "/docs/absent.txt").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
