use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe with store sizes.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let dispatcher = &state.dispatcher;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build": env!("CIPHERBANK_GIT_SHA"),
        "bot": dispatcher.bot().as_str(),
        "accounts": dispatcher.ledger().len(),
        "sessions": dispatcher.sessions().len(),
        "transfers": dispatcher.ledger().transfer_count(),
    }))
}
