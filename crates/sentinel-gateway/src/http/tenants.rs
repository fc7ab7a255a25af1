use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /api/tenants: connection status of every registered tenant.
pub async fn tenants_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut statuses = state.registry().statuses();
    statuses.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    let tenants: Vec<Value> = statuses
        .into_iter()
        .map(|(tenant, status)| json!({ "tenant": tenant.as_str(), "status": status }))
        .collect();
    Json(json!({
        "tenants": tenants,
        "connected": state.registry().connected_count(),
    }))
}
