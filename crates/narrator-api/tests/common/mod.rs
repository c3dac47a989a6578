//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use narrator_core::settings::NarratorSettings;
use narrator_store::ReplicatedStateStore;
use narrator_test_support::{FixedClock, RecordingChatLog};
use tower::ServiceExt;

use narrator_api::extract::ROLE_HEADER;
use narrator_api::state::AppState;

/// Build the full app router around `store`, with the narrator's controller
/// running. Uses the same route structure as `main.rs`.
pub fn build_test_app(store: Arc<ReplicatedStateStore>, settings: NarratorSettings) -> Router {
    let (app_state, _controller) = AppState::start(
        store,
        Arc::new(RecordingChatLog::new()),
        Arc::new(FixedClock::session_start()),
        settings,
    );
    narrator_api::app(app_state)
}

/// Send a POST request with a JSON body as `role` and return the response.
pub async fn post_json(
    app: Router,
    role: &str,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(ROLE_HEADER, role)
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
