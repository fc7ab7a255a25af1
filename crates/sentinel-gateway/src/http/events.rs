//! Event ingress: POST /api/events/{tenant}.
//!
//! The transport bridge posts every inbound platform event here. When
//! `bridge.ingress_secret` is configured the body must carry an
//! `X-Sentinel-Signature: sha256=<hex>` HMAC over the raw bytes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::http::error::ApiError;
use sentinel_core::types::TenantId;
use sentinel_core::SentinelError;
use sentinel_platform::InboundEvent;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-sentinel-signature";

/// POST /api/events/{tenant}
///
/// Only admitted tenants (configured, enrolled or paired) are accepted; any
/// other id is a 404 and nothing is registered. Returns 202 as soon as the
/// event is queued; processing happens on the dispatcher's task.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(secret) = state.config.bridge.ingress_secret.as_deref() {
        verify_signature(&headers, &body, secret).map_err(|e| {
            warn!(tenant = %tenant, error = %e, "event signature rejected");
            SentinelError::Unauthorized(e)
        })?;
    }

    let tenant = TenantId::from(tenant.as_str());
    if tenant.as_str().is_empty() {
        return Err(SentinelError::InvalidInput("invalid tenant id".into()).into());
    }
    if state.registry().get(&tenant).is_none() {
        warn!(tenant = %tenant, "event for a tenant that was never admitted");
        return Err(SentinelError::UnknownTenant(tenant.to_string()).into());
    }

    let event: InboundEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(tenant = %tenant, error = %e, "malformed event body");
        SentinelError::InvalidInput(format!("invalid event: {}", e))
    })?;

    let kind = event.kind();
    debug!(tenant = %tenant, kind, "event accepted");
    state.dispatcher.dispatch(tenant, event);
    Ok((StatusCode::ACCEPTED, Json(json!({"accepted": true, "kind": kind}))))
}

/// Verify `sha256=<hex>` in the signature header against `body`.
fn verify_signature(headers: &HeaderMap, body: &Bytes, secret: &str) -> Result<(), String> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Sentinel-Signature header".to_string())?;

    let sig_hex = header
        .strip_prefix("sha256=")
        .ok_or_else(|| "malformed X-Sentinel-Signature header".to_string())?;

    let expected =
        hex::decode(sig_hex).map_err(|_| "X-Sentinel-Signature is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| "signature mismatch".to_string())
}
