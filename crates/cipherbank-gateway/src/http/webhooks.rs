//! Chat webhook ingress at POST /v1/message.
//!
//! The chat service posts every channel event here. The body is handed to
//! the dispatcher; replies go out through the channel, never in the response.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

use cipherbank_agent::Ack;
use cipherbank_core::config::WebhookAuthMode;

use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw body.
pub const SIGNATURE_HEADER: &str = "x-signature";

type HandlerError = (StatusCode, Json<Value>);

/// POST /v1/message
///
/// 200 `{}` once the event is handled (or deliberately ignored), 400 for
/// unparseable events, 401 on signature failure, 500 when the pipeline fails.
pub async fn message_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, HandlerError> {
    let gateway = &state.config.gateway;

    match gateway.webhook_auth {
        WebhookAuthMode::HmacSha256 => {
            verify_hmac_sha256(&headers, &body, gateway.webhook_secret.as_deref())
                .map_err(|e| auth_error(&e))?;
        }
        WebhookAuthMode::None => {}
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON in webhook body");
        error_response(StatusCode::BAD_REQUEST, "invalid JSON body", "MALFORMED_EVENT")
    })?;

    match state.dispatcher.handle(&payload).await {
        Ok(ack) => {
            debug!(replied = ack == Ack::Replied, "webhook acknowledged");
            Ok(Json(json!({})))
        }
        Err(e) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err(error_response(status, &e.to_string(), e.code()))
        }
    }
}

/// Verify `X-Signature: <hex>` (an optional `sha256=` prefix is accepted).
fn verify_hmac_sha256(headers: &HeaderMap, body: &Bytes, secret: Option<&str>) -> Result<(), String> {
    let secret = secret.ok_or_else(|| "no webhook secret configured".to_string())?;

    let sig_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing X-Signature header".to_string())?;

    let sig_hex = sig_header.strip_prefix("sha256=").unwrap_or(sig_header);
    let expected = hex::decode(sig_hex).map_err(|_| "X-Signature is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}

fn auth_error(reason: &str) -> HandlerError {
    warn!(reason = %reason, "webhook authentication failed");
    error_response(StatusCode::UNAUTHORIZED, "authentication failed", "UNAUTHORIZED")
}

fn error_response(status: StatusCode, message: &str, code: &str) -> HandlerError {
    (status, Json(json!({"error": message, "code": code})))
}

#[cfg(test)]
pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(sig: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(SIGNATURE_HEADER, HeaderValue::from_str(sig).unwrap());
        h
    }

    #[test]
    fn accepts_valid_signature_with_or_without_prefix() {
        let body = Bytes::from_static(br#"{"type":"message.new"}"#);
        let sig = sign("topsecret", &body);
        assert!(verify_hmac_sha256(&headers(&sig), &body, Some("topsecret")).is_ok());
        assert!(
            verify_hmac_sha256(&headers(&format!("sha256={sig}")), &body, Some("topsecret")).is_ok()
        );
    }

    #[test]
    fn rejects_wrong_secret_or_body() {
        let body = Bytes::from_static(b"{}");
        let sig = sign("topsecret", &body);
        assert!(verify_hmac_sha256(&headers(&sig), &body, Some("other")).is_err());
        assert!(
            verify_hmac_sha256(&headers(&sig), &Bytes::from_static(b"{ }"), Some("topsecret")).is_err()
        );
    }

    #[test]
    fn rejects_missing_header_or_secret() {
        let body = Bytes::from_static(b"{}");
        assert!(verify_hmac_sha256(&HeaderMap::new(), &body, Some("s")).is_err());
        assert!(verify_hmac_sha256(&headers("00"), &body, None).is_err());
        assert!(verify_hmac_sha256(&headers("zz"), &body, Some("s")).is_err());
    }
}
