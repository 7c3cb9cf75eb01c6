//! Request handlers for the webhook and admin endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::router::AppState;
use crate::common::types::{
    AlertConfig, ExchangeCredentials, ExchangeId, HistoryRecord, IncomingAlert, OrderResult,
};

/// Largest page `GET /api/history` serves
pub const MAX_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

// ============================================================================
// DTOs
// ============================================================================

/// Admin endpoints act for this user, or the configured default
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct ApiKeyRequest {
    pub exchange: ExchangeId,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    fn new(success: bool) -> Self {
        Self {
            success,
            message: None,
        }
    }

    fn with_message(success: bool, message: &str) -> Self {
        Self {
            success,
            message: Some(message.to_string()),
        }
    }
}

fn exchange_param(raw: &str) -> Result<ExchangeId, ApiError> {
    raw.parse::<ExchangeId>().map_err(ApiError::from)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "service": "TradingView Alert Bridge"}))
}

/// POST /webhook/tradingview
///
/// Step failures are a 200 with `success: false`. A 500 still carries the
/// OrderResult: the order may have gone through but was not recorded.
pub async fn tradingview_webhook(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IncomingAlert>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(alert) = payload?;
    info!(
        "Received alert {} for user {}",
        alert.config_name, alert.user_id
    );

    let response = match state.pipeline.process(&alert).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            let result: OrderResult = err.into_result();
            (StatusCode::INTERNAL_SERVER_ERROR, Json(result)).into_response()
        }
    };
    Ok(response)
}

/// POST /api/keys
pub async fn save_api_keys(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    payload: Result<Json<ApiKeyRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let Json(request) = payload?;
    let user_id = state.user(query.user_id);

    if request.api_key.trim().is_empty() || request.api_secret.trim().is_empty() {
        return Err(ApiError::bad_request("api_key and api_secret are required"));
    }

    let credentials = ExchangeCredentials::new(request.api_key, request.api_secret);
    let saved = state
        .vault
        .put(&user_id, request.exchange, &credentials)
        .await?;
    state.pipeline.gateway().evict(&user_id, request.exchange);
    info!("Stored {} API keys for user {}", request.exchange, user_id);

    Ok(Json(SuccessResponse::with_message(
        saved,
        "API keys saved successfully",
    )))
}

/// GET /api/keys/:exchange
pub async fn has_api_keys(
    State(state): State<Arc<AppState>>,
    Path(exchange): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let exchange = exchange_param(&exchange)?;
    let user_id = state.user(query.user_id);

    let keys = state.vault.get(&user_id, exchange).await?;
    Ok(Json(json!({"has_keys": keys.is_some()})))
}

/// DELETE /api/keys/:exchange
pub async fn delete_api_keys(
    State(state): State<Arc<AppState>>,
    Path(exchange): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let exchange = exchange_param(&exchange)?;
    let user_id = state.user(query.user_id);

    let deleted = state.vault.delete(&user_id, exchange).await?;
    state.pipeline.gateway().evict(&user_id, exchange);
    Ok(Json(SuccessResponse::new(deleted)))
}

/// POST /api/config
pub async fn save_config(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
    payload: Result<Json<AlertConfig>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let Json(config) = payload?;
    let user_id = state.user(query.user_id);

    let saved = state.configs.put(&user_id, &config).await?;
    info!("Saved configuration {} for user {}", config.name, user_id);
    Ok(Json(SuccessResponse::with_message(
        saved,
        "Configuration saved successfully",
    )))
}

/// GET /api/config/:name
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<AlertConfig>, ApiError> {
    let Query(query) = query?;
    let user_id = state.user(query.user_id);

    state
        .configs
        .get(&user_id, &name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Configuration '{}' not found", name)))
}

/// GET /api/config
pub async fn list_configs(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<Vec<AlertConfig>>, ApiError> {
    let Query(query) = query?;
    let user_id = state.user(query.user_id);
    Ok(Json(state.configs.list(&user_id).await?))
}

/// DELETE /api/config/:name
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let user_id = state.user(query.user_id);
    let deleted = state.configs.delete(&user_id, &name).await?;
    Ok(Json(SuccessResponse::new(deleted)))
}

/// GET /api/history?limit=N
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }

    let user_id = state.user(query.user_id);
    Ok(Json(state.history.list(&user_id, limit).await?))
}

/// GET /api/exchanges
pub async fn list_exchanges() -> Json<Vec<&'static str>> {
    Json(ExchangeId::ALL.iter().map(|e| e.as_str()).collect())
}
