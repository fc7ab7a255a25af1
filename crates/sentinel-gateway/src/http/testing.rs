//! Router fixtures for handler tests.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use sentinel_core::config::SentinelConfig;
use sentinel_platform::recording::{RecordingClient, StaticPairing};
use sentinel_platform::{Participant, PlatformClient};
use sentinel_settings::MemoryBackend;
use serde_json::Value;
use tower::ServiceExt;

use crate::app::{build_router, AppState};

pub const TENANT: &str = "15550001111";
pub const ADMIN: &str = "15550002222";

/// App with one recording tenant registered and an in-memory store.
pub fn harness(ingress_secret: Option<&str>) -> (Router, Arc<AppState>, Arc<RecordingClient>) {
    harness_with_pairing(ingress_secret, Arc::new(StaticPairing::new(Some("ABCD-1234"))))
}

pub fn harness_with_pairing(
    ingress_secret: Option<&str>,
    pairing: Arc<StaticPairing>,
) -> (Router, Arc<AppState>, Arc<RecordingClient>) {
    let mut config = SentinelConfig::default();
    config.bridge.ingress_secret = ingress_secret.map(String::from);
    config.bridge.base_url = "http://127.0.0.1:9".to_string();

    let state = Arc::new(AppState::new(
        config,
        Arc::new(MemoryBackend::new()),
        pairing,
        None,
    ));
    let client = Arc::new(RecordingClient::new(TENANT).with_participants(vec![Participant::admin(ADMIN)]));
    state.registry().register(client.clone() as Arc<dyn PlatformClient>);
    (build_router(state.clone()), state, client)
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: &Router, uri: &str, headers: &[(&str, &str)], body: String) -> Response<Body> {
    let mut req = Request::post(uri).header("content-type", "application/json");
    for (name, value) in headers {
        req = req.header(*name, *value);
    }
    app.clone()
        .oneshot(req.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
