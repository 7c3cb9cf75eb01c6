//! REST API client for the Binance spot market

use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::{signed_query, API_KEY_HEADER};
use super::messages::{AccountResponse, ErrorResponse, TickerPriceResponse};
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::ExchangeClient;
use crate::common::types::{
    split_symbol, BalanceEntry, Balances, ExchangeCredentials, ExchangeId, OrderKind,
    OrderReceipt, OrderRequest, Side, Ticker,
};

/// Authenticated REST client for one Binance account
#[derive(Clone)]
pub struct BinanceRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the spot API
    base_url: String,
    /// Key pair this client signs with
    credentials: ExchangeCredentials,
    /// recvWindow sent with signed requests
    recv_window_ms: u64,
}

impl BinanceRestClient {
    /// Create a new REST client
    pub fn new(base_url: &str, credentials: ExchangeCredentials) -> Result<Self> {
        Self::with_timeout(base_url, credentials, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(
        base_url: &str,
        credentials: ExchangeCredentials,
        timeout: Duration,
    ) -> Result<Self> {
        url::Url::parse(base_url).map_err(|e| {
            BridgeError::ClientConstruction(format!("Invalid base URL '{}': {}", base_url, e))
        })?;
        if credentials.api_key.trim().is_empty() || credentials.api_secret.trim().is_empty() {
            return Err(BridgeError::ClientConstruction(
                "API key and secret must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::ClientConstruction(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            recv_window_ms: 5000,
        })
    }

    /// Set the recvWindow for signed requests
    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    fn signed_url(&self, path: &str, params: &[(&str, String)]) -> Result<String> {
        let query = signed_query(
            params,
            &self.credentials.api_secret,
            chrono::Utc::now().timestamp_millis(),
            self.recv_window_ms,
        )?;
        Ok(format!("{}{}?{}", self.base_url, path, query))
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    /// Turn a non-2xx response into an `ExchangeRejected` error
    async fn rejection(response: Response) -> BridgeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => BridgeError::ExchangeRejected(format!(
                "status {} code {}: {}",
                status, err.code, err.msg
            )),
            Err(_) => BridgeError::ExchangeRejected(format!("status {}: {}", status, body)),
        }
    }

    fn parse_decimal(value: &str, what: &str) -> Result<Decimal> {
        value
            .parse()
            .map_err(|e| BridgeError::InvalidResponse(format!("Invalid {}: {}", what, e)))
    }
}

impl std::fmt::Debug for BinanceRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceRestClient")
            .field("base_url", &self.base_url)
            .field("recv_window_ms", &self.recv_window_ms)
            .finish_non_exhaustive()
    }
}

/// Convert a unified symbol (BTC/USDT) into Binance's form (BTCUSDT)
pub fn market_symbol(symbol: &str) -> Result<String> {
    let (base, quote) = split_symbol(symbol)?;
    Ok(format!("{}{}", base, quote).to_uppercase())
}

/// Finest quantity step any Binance spot symbol accepts
pub const QUANTITY_DECIMALS: u32 = 8;

/// Query parameters of `POST /api/v3/order` for a request
///
/// The amount is truncated toward zero to [`QUANTITY_DECIMALS`]; an amount
/// that truncates to zero is `QuantityUndetermined`.
pub fn order_params(request: &OrderRequest) -> Result<Vec<(&'static str, String)>> {
    let side = match request.side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    };
    let mut params = vec![
        ("symbol", market_symbol(&request.symbol)?),
        ("side", side.to_string()),
    ];

    let price = || {
        request
            .price
            .map(|p| p.normalize().to_string())
            .ok_or_else(|| BridgeError::ExchangeRejected(format!("{} order without price", request.kind)))
    };

    match request.kind {
        OrderKind::Market => {
            params.push(("type", "MARKET".to_string()));
        }
        OrderKind::Limit => {
            params.push(("type", "LIMIT".to_string()));
            params.push(("timeInForce", "GTC".to_string()));
            params.push(("price", price()?));
        }
        OrderKind::Stop => {
            let stop_price = match request.params.get("stopPrice") {
                Some(stop) => stop.clone(),
                None => price()?,
            };
            params.push(("type", "STOP_LOSS_LIMIT".to_string()));
            params.push(("timeInForce", "GTC".to_string()));
            params.push(("price", price()?));
            params.push(("stopPrice", stop_price));
        }
    }
    let quantity = request
        .amount
        .round_dp_with_strategy(QUANTITY_DECIMALS, RoundingStrategy::ToZero);
    if quantity <= Decimal::ZERO {
        return Err(BridgeError::QuantityUndetermined);
    }
    params.push(("quantity", quantity.normalize().to_string()));

    Ok(params)
}

#[async_trait]
impl ExchangeClient for BinanceRestClient {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    #[instrument(skip(self))]
    async fn fetch_balance(&self) -> Result<Balances> {
        let url = self.signed_url("/api/v3/account", &[])?;
        debug!("Fetching account balances");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let account: AccountResponse = response.json().await?;
        let mut balances = HashMap::with_capacity(account.balances.len());
        for line in account.balances {
            let free = Self::parse_decimal(&line.free, "free balance")?;
            let used = Self::parse_decimal(&line.locked, "locked balance")?;
            balances.insert(
                line.asset,
                BalanceEntry {
                    free,
                    used,
                    total: free + used,
                },
            );
        }
        Ok(balances)
    }

    #[instrument(skip(self))]
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let url = format!(
            "{}/api/v3/ticker/price?symbol={}",
            self.base_url,
            market_symbol(symbol)?
        );
        debug!("Fetching ticker from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let ticker: TickerPriceResponse = response.json().await?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: Some(Self::parse_decimal(&ticker.price, "ticker price")?),
        })
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol, kind = %request.kind, side = %request.side))]
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        let params = order_params(request)?;
        let url = self.signed_url("/api/v3/order", &params)?;
        debug!("Placing {} order", request.kind);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let raw: serde_json::Value = response.json().await?;
        let id = match raw.get("orderId") {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        Ok(OrderReceipt { id, raw })
    }
}
