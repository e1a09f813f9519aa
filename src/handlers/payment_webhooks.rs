use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};

use crate::{errors::ServiceError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Payment-provider webhook receiver.
///
/// Signature verification runs against the raw request bytes before any
/// JSON parsing. Completed-checkout events are re-fetched from the
/// provider's API: the event payload identifies the session, never prices
/// an order. Any other event type is acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body = String,
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Invalid signature or payload", body = crate::errors::ErrorResponse),
        (status = 502, description = "Provider session lookup failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    let Some(secret) = state.config.payment_webhook_secret.as_deref() else {
        warn!("Webhook delivery rejected: no webhook secret configured");
        return Err(ServiceError::SignatureInvalid);
    };

    verify_signature(
        &headers,
        &body,
        secret,
        state.config.payment_webhook_tolerance_secs,
    )?;

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::InvalidInput(format!("invalid webhook payload: {e}")))?;

    let event_type = event.get("type").and_then(|v| v.as_str()).unwrap_or("");
    if event_type != "checkout.session.completed" {
        info!(event_type = %event_type, "Ignoring webhook event type");
        return Ok(Json(json!({ "received": true })));
    }

    let session_id = event
        .pointer("/data/object/id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            ServiceError::InvalidInput("webhook event carries no session id".to_string())
        })?;

    // The event is only a pointer; the authoritative session state comes
    // from the provider's API.
    let session = state.provider.fetch_session(session_id).await?;

    if session.payment_status != "paid" {
        info!(session_id = %session.id, payment_status = %session.payment_status,
            "Session not paid; no order created");
        return Ok(Json(json!({ "received": true, "created": false })));
    }

    let materialized = state.services.orders.materialize_from_session(&session).await?;

    Ok(Json(json!({
        "received": true,
        "created": materialized.created,
        "order_id": materialized.order.id,
        "order_number": materialized.order.order_number,
    })))
}

/// Verifies the `Stripe-Signature` header: `t=<unix>,v1=<hex hmac>` where
/// the HMAC-SHA256 of `"{t}.{raw body}"` is keyed by the shared secret.
/// Stale timestamps outside the tolerance window are rejected even with a
/// valid MAC.
fn verify_signature(
    headers: &HeaderMap,
    payload: &Bytes,
    secret: &str,
    tolerance_secs: u64,
) -> Result<(), ServiceError> {
    let header = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or(ServiceError::SignatureInvalid)?;

    let mut ts = "";
    let mut v1 = "";
    for part in header.split(',') {
        let mut it = part.trim().splitn(2, '=');
        match (it.next(), it.next()) {
            (Some("t"), Some(val)) => ts = val,
            (Some("v1"), Some(val)) => v1 = val,
            _ => {}
        }
    }
    if ts.is_empty() || v1.is_empty() {
        return Err(ServiceError::SignatureInvalid);
    }

    let ts_i: i64 = ts.parse().map_err(|_| ServiceError::SignatureInvalid)?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts_i).unsigned_abs() > tolerance_secs {
        warn!(age_secs = (now - ts_i), "Webhook timestamp outside tolerance window");
        return Err(ServiceError::SignatureInvalid);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::SignatureInvalid)?;
    mac.update(ts.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if constant_time_eq(&expected, v1) {
        Ok(())
    } else {
        Err(ServiceError::SignatureInvalid)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
