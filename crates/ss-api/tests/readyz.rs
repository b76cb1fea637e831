use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{body::Body, http::Request, http::StatusCode};
use ss_common::store::MemoryStore;
use tower::ServiceExt;

fn readyz_request() -> Request<Body> {
    Request::builder()
        .uri("/readyz")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn readyz_ok_when_store_responds() {
    let app = ss_api::create_router(ss_api::test_state(Arc::new(MemoryStore::new())));
    let response = app.oneshot(readyz_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_returns_service_unavailable_when_not_ready() {
    let state = ss_api::test_state(Arc::new(MemoryStore::new()));
    state.readiness.store(false, Ordering::SeqCst);
    let app = ss_api::create_router(state);

    let response = app.oneshot(readyz_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
