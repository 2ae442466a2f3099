//! Download tests against a local HTTP server.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use local_llm_lib::llm::model_manager::{fetch_model, DownloadError, FetchOutcome};
use local_llm_lib::llm::model_registry::ModelInfo;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const FILENAME: &str = "tiny.Q4_K_M.gguf";

fn test_model(url: String) -> ModelInfo {
    ModelInfo {
        id: "tiny",
        filename: FILENAME,
        url: Box::leak(url.into_boxed_str()),
        size_bytes: 0,
        description: "test artifact",
    }
}

/// Serves `body` at `/model.gguf` and a 404 at `/missing.gguf`; counts hits.
async fn spawn_blob_server(body: Vec<u8>) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new()
        .route(
            "/model.gguf",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let body = body.clone();
                async move { body }
            }),
        )
        .route("/missing.gguf", get(|| async { StatusCode::NOT_FOUND }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), hits)
}

fn blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn no_partial_left(dir: &Path) -> bool {
    !dir.join(format!("{FILENAME}.partial")).exists()
}

#[tokio::test]
async fn download_matches_content_length() {
    let payload = blob(300_000);
    let (base, hits) = spawn_blob_server(payload.clone()).await;
    let model = test_model(format!("{base}/model.gguf"));
    let dir = tempfile::tempdir().unwrap();
    let models = dir.path().join("models");

    let mut last = (0, None);
    let outcome = fetch_model(
        &reqwest::Client::new(),
        &model,
        &models,
        |_| panic!("nothing to overwrite"),
        |done, total| last = (done, total),
    )
    .await
    .unwrap();

    let dest = models.join(FILENAME);
    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            path: dest.clone(),
            bytes: payload.len() as u64
        }
    );
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
    assert_eq!(last, (300_000, Some(300_000)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(no_partial_left(&models));
}

#[tokio::test]
async fn declined_overwrite_makes_no_request() {
    let (base, hits) = spawn_blob_server(blob(1024)).await;
    let model = test_model(format!("{base}/model.gguf"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(FILENAME);
    std::fs::write(&dest, b"original").unwrap();

    let mut asked = None;
    let outcome = fetch_model(
        &reqwest::Client::new(),
        &model,
        dir.path(),
        |path| {
            asked = Some(path.to_path_buf());
            false
        },
        |_, _| panic!("no progress expected"),
    )
    .await
    .unwrap();

    assert_eq!(outcome, FetchOutcome::Cancelled { path: dest.clone() });
    assert_eq!(asked, Some(dest.clone()));
    assert_eq!(std::fs::read(&dest).unwrap(), b"original");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn accepted_overwrite_replaces_file() {
    let payload = blob(4096);
    let (base, _) = spawn_blob_server(payload.clone()).await;
    let model = test_model(format!("{base}/model.gguf"));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join(FILENAME);
    std::fs::write(&dest, b"stale").unwrap();

    let outcome = fetch_model(&reqwest::Client::new(), &model, dir.path(), |_| true, |_, _| {})
        .await
        .unwrap();

    assert!(matches!(outcome, FetchOutcome::Downloaded { bytes: 4096, .. }));
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn http_error_status_is_reported_without_leftovers() {
    let (base, _) = spawn_blob_server(Vec::new()).await;
    let model = test_model(format!("{base}/missing.gguf"));
    let dir = tempfile::tempdir().unwrap();

    let err = fetch_model(&reqwest::Client::new(), &model, dir.path(), |_| true, |_, _| {})
        .await
        .unwrap_err();

    match err {
        DownloadError::Status(status) => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join(FILENAME).exists());
    assert!(no_partial_left(dir.path()));
}

#[tokio::test]
async fn connection_failure_is_a_request_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let model = test_model(format!("http://{addr}/model.gguf"));
    let dir = tempfile::tempdir().unwrap();

    let err = fetch_model(&reqwest::Client::new(), &model, dir.path(), |_| true, |_, _| {})
        .await
        .unwrap_err();

    assert!(matches!(err, DownloadError::Request(_)), "got {err}");
    assert!(!dir.path().join(FILENAME).exists());
    assert!(no_partial_left(dir.path()));
}
