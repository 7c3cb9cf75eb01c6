//! Binance REST response payloads

use serde::{Deserialize, Serialize};

/// Response of `GET /api/v3/account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    #[serde(default)]
    pub balances: Vec<AssetBalance>,
}

/// One asset line of the account response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    /// Decimal as string
    pub free: String,
    /// Decimal as string
    pub locked: String,
}

/// Response of `GET /api/v3/ticker/price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    /// Decimal as string
    pub price: String,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i64,
    pub msg: String,
}
