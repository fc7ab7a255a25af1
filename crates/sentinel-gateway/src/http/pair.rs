//! Pairing endpoint: POST /api/pair.
//!
//! Starts a phone-number link on the bridge and hands the one-time code back
//! to the operator.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::http::error::ApiError;
use sentinel_core::types::TenantId;
use sentinel_core::SentinelError;

/// Shortest number accepted for pairing (country code + subscriber).
const MIN_DIGITS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PairRequest {
    pub number: String,
}

/// POST /api/pair
///
/// Returns `{"success": true, "code": ...}`, 400 for a malformed number and
/// 502 when the bridge refuses. A successful pairing admits the number as a
/// tenant and enrolls it so it is admitted again after a restart.
pub async fn pair_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PairRequest>,
) -> Result<Json<Value>, ApiError> {
    let digits: String = req.number.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_DIGITS {
        return Err(SentinelError::InvalidInput(
            "invalid number: expected at least 10 digits with country code".into(),
        )
        .into());
    }

    let code = state.pairing.pair(&digits).await.map_err(|e| {
        warn!(number = %digits, error = %e, "pairing failed");
        SentinelError::Upstream(format!("pairing failed: {}", e))
    })?;
    info!(number = %digits, "pairing code issued");

    // It stays `connecting` until the bridge reports otherwise.
    let tenant = TenantId::from(digits.as_str());
    state.register_tenant(&tenant).map_err(|e| {
        warn!(tenant = %tenant, error = %e, "could not register paired tenant");
        SentinelError::Config(e.to_string())
    })?;
    state.settings.enroll(&tenant);

    Ok(Json(json!({"success": true, "code": code})))
}
