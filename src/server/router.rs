//! Router and shared handler state

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::common::traits::{ConfigStore, CredentialVault, HistoryStore};
use crate::execution::AlertPipeline;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<AlertPipeline>,
    pub vault: Arc<dyn CredentialVault>,
    pub configs: Arc<dyn ConfigStore>,
    pub history: Arc<dyn HistoryStore>,
    /// User the admin endpoints act for when no `user_id` is given
    pub default_user_id: String,
}

impl AppState {
    pub fn new(
        pipeline: Arc<AlertPipeline>,
        vault: Arc<dyn CredentialVault>,
        configs: Arc<dyn ConfigStore>,
        history: Arc<dyn HistoryStore>,
        default_user_id: impl Into<String>,
    ) -> Self {
        AppState {
            pipeline,
            vault,
            configs,
            history,
            default_user_id: default_user_id.into(),
        }
    }

    pub(crate) fn user(&self, requested: Option<String>) -> String {
        requested
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.default_user_id.clone())
    }
}

/// Create the HTTP router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        // TradingView webhook
        .route("/webhook/tradingview", post(handlers::tradingview_webhook))
        // Admin endpoints
        .route("/api/keys", post(handlers::save_api_keys))
        .route(
            "/api/keys/:exchange",
            get(handlers::has_api_keys).delete(handlers::delete_api_keys),
        )
        .route(
            "/api/config",
            get(handlers::list_configs).post(handlers::save_config),
        )
        .route(
            "/api/config/:name",
            get(handlers::get_config).delete(handlers::delete_config),
        )
        .route("/api/history", get(handlers::list_history))
        .route("/api/exchanges", get(handlers::list_exchanges))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
