use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use cipherbank_agent::MessageDispatcher;
use cipherbank_core::config::CipherBankConfig;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: CipherBankConfig,
    pub dispatcher: MessageDispatcher,
}

impl AppState {
    pub fn new(config: CipherBankConfig, dispatcher: MessageDispatcher) -> Self {
        Self { config, dispatcher }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/v1/message", post(crate::http::webhooks::message_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
