use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (wizards, menus) = state.sessions.counts();
    let workers = state.workers();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": env!("SENTINEL_GIT_SHA"),
        "tenants": state.registry().len(),
        "connected": state.registry().connected_count(),
        "sessions": { "wizards": wizards, "menus": menus },
        "workers": { "in_flight": workers.in_flight(), "capacity": workers.capacity() },
    }))
}

/// GET /healthz
pub async fn liveness_handler() -> &'static str {
    "ok"
}

/// GET /readyz: ready once at least one tenant is connected.
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if state.registry().connected_count() > 0 {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no tenant connected")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{body_json, get, harness, TENANT};
    use sentinel_core::types::TenantId;
    use sentinel_platform::ConnectionStatus;

    #[tokio::test]
    async fn health_reports_counts() {
        let (app, _state, _client) = harness(None);
        let resp = get(&app, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["tenants"], 1);
        assert_eq!(body["sessions"]["menus"], 0);
    }

    #[tokio::test]
    async fn readiness_follows_connections() {
        let (app, state, _client) = harness(None);
        assert_eq!(get(&app, "/healthz").await.status(), StatusCode::OK);
        assert_eq!(get(&app, "/readyz").await.status(), StatusCode::SERVICE_UNAVAILABLE);

        state
            .registry()
            .set_status(&TenantId::from(TENANT), ConnectionStatus::Connected);
        assert_eq!(get(&app, "/readyz").await.status(), StatusCode::OK);
    }
}
