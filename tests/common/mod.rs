//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use zona_xtreme_back::{
    clock::ManualClock,
    config::AppConfig,
    dao::venue_store::memory::MemoryVenueStore,
    routes,
    services::storage_supervisor,
    state::{AppState, SharedState},
};

/// Everything a test needs to drive the API and inspect side effects.
pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub store: MemoryVenueStore,
    pub clock: Arc<ManualClock>,
}

/// Build the application router on top of a seeded in-memory store and a manual clock.
pub async fn build_test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_760_000_000),
    ));
    let state = AppState::with_clock(AppConfig::default(), clock.clone());
    let store = MemoryVenueStore::new();
    storage_supervisor::install(&state, Arc::new(store.clone()))
        .await
        .unwrap();

    TestApp {
        router: routes::router(state.clone()),
        state,
        store,
        clock,
    }
}

/// Build the router without any storage installed.
pub fn build_degraded_app() -> Router {
    routes::router(AppState::new(AppConfig::default()))
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
