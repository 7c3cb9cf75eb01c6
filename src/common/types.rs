//! Domain types shared by the pipeline, stores and exchange clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::BridgeError;

/// Supported cryptocurrency exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    Binance,
    Coinbase,
    Bybit,
    Okex,
    Kucoin,
    Bitfinex,
    Ftx,
    Huobi,
}

impl ExchangeId {
    pub const ALL: [ExchangeId; 8] = [
        ExchangeId::Binance,
        ExchangeId::Coinbase,
        ExchangeId::Bybit,
        ExchangeId::Okex,
        ExchangeId::Kucoin,
        ExchangeId::Bitfinex,
        ExchangeId::Ftx,
        ExchangeId::Huobi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Binance => "binance",
            ExchangeId::Coinbase => "coinbase",
            ExchangeId::Bybit => "bybit",
            ExchangeId::Okex => "okex",
            ExchangeId::Kucoin => "kucoin",
            ExchangeId::Bitfinex => "bitfinex",
            ExchangeId::Ftx => "ftx",
            ExchangeId::Huobi => "huobi",
        }
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExchangeId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| BridgeError::Validation(format!("Unknown exchange: {}", s)))
    }
}

/// Order template type selected by an alert configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::StopLoss => "stop_loss",
            OrderType::TakeProfit => "take_profit",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop_loss" => Ok(OrderType::StopLoss),
            "take_profit" => Ok(OrderType::TakeProfit),
            other => Err(BridgeError::UnsupportedOrderType(other.to_string())),
        }
    }
}

impl TryFrom<String> for OrderType {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderType> for String {
    fn from(value: OrderType) -> Self {
        value.as_str().to_string()
    }
}

/// Directional intent of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Long positions buy, short positions sell
    pub fn side(self) -> Side {
        match self {
            PositionSide::Long => Side::Buy,
            PositionSide::Short => Side::Sell,
        }
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Named order template bound to one exchange/symbol/order-type combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Configuration name, unique per user
    pub name: String,
    /// Target exchange
    pub exchange: ExchangeId,
    /// Trading pair (e.g., BTC/USDT)
    pub symbol: String,
    pub order_type: OrderType,
    pub position_side: PositionSide,
    /// Fixed order quantity
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Order quantity as percentage of the available quote balance
    #[serde(default)]
    pub quantity_percentage: Option<Decimal>,
    /// Price for limit/stop orders when the alert carries none
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AlertConfig {
    /// Check the structural invariants of a configuration before it is stored
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.name.trim().is_empty() {
            return Err(BridgeError::Validation("name must not be empty".to_string()));
        }
        split_symbol(&self.symbol)?;

        for (field, value) in [
            ("price", self.price),
            ("stop_loss", self.stop_loss),
            ("take_profit", self.take_profit),
        ] {
            if value.is_some_and(|v| v <= Decimal::ZERO) {
                return Err(BridgeError::Validation(format!("{} must be positive", field)));
            }
        }

        match (self.quantity, self.quantity_percentage) {
            (Some(_), Some(_)) => Err(BridgeError::Validation(
                "set either quantity or quantity_percentage, not both".to_string(),
            )),
            (None, None) => Err(BridgeError::Validation(
                "one of quantity or quantity_percentage is required".to_string(),
            )),
            (Some(qty), None) if qty <= Decimal::ZERO => Err(BridgeError::Validation(
                "quantity must be positive".to_string(),
            )),
            (None, Some(pct)) if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED => {
                Err(BridgeError::Validation(
                    "quantity_percentage must be in (0, 100]".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Quote currency of the configured pair (USDT for BTC/USDT)
    pub fn quote_currency(&self) -> Result<&str, BridgeError> {
        split_symbol(&self.symbol).map(|(_, quote)| quote)
    }
}

/// Split a unified `BASE/QUOTE` symbol into its two components
pub fn split_symbol(symbol: &str) -> Result<(&str, &str), BridgeError> {
    match symbol.split_once('/') {
        Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('/') => {
            Ok((base, quote))
        }
        _ => Err(BridgeError::Validation(format!(
            "symbol must look like BASE/QUOTE, got '{}'",
            symbol
        ))),
    }
}

/// TradingView alert webhook payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingAlert {
    /// Name of the configuration to use
    pub config_name: String,
    pub user_id: String,
    /// Current price from TradingView
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Custom message from TradingView
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub additional_parameters: Option<HashMap<String, serde_json::Value>>,
}

impl IncomingAlert {
    pub fn new(user_id: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            config_name: config_name.into(),
            user_id: user_id.into(),
            price: None,
            volume: None,
            time: None,
            exchange: None,
            symbol: None,
            message: None,
            additional_parameters: None,
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Alert price, if the alert carried a usable one
    pub fn usable_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }
}

/// Exchange API key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl std::fmt::Debug for ExchangeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Amounts held in one currency
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub free: Decimal,
    pub used: Decimal,
    pub total: Decimal,
}

/// Account balances keyed by currency code
pub type Balances = HashMap<String, BalanceEntry>;

/// Latest price snapshot for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: Option<Decimal>,
}

/// Order kind understood by exchange clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "market"),
            OrderKind::Limit => write!(f, "limit"),
            OrderKind::Stop => write!(f, "stop"),
        }
    }
}

/// Exchange-agnostic order request
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Unified symbol (BASE/QUOTE)
    pub symbol: String,
    pub kind: OrderKind,
    pub side: Side,
    pub amount: Decimal,
    pub price: Option<Decimal>,
    /// Exchange-specific extras (e.g. stopPrice)
    pub params: HashMap<String, String>,
}

/// Exchange acknowledgement of a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: Option<String>,
    /// Raw exchange response
    pub raw: serde_json::Value,
}

/// Result of order execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl OrderResult {
    pub fn executed(receipt: &OrderReceipt) -> Self {
        Self {
            success: true,
            order_id: receipt.id.clone(),
            message: Some("Order executed successfully".to_string()),
            details: Some(receipt.raw.clone()),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(error: &BridgeError) -> Self {
        Self {
            success: false,
            order_id: None,
            message: Some(format!("Error executing order: {}", error)),
            details: None,
            timestamp: Utc::now(),
        }
    }
}

/// Durable audit entry of one alert's execution outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Disambiguates records written in the same instant
    pub id: Uuid,
    pub user_id: String,
    pub config_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl HistoryRecord {
    /// Full record of an executed order
    pub fn executed(
        alert: &IncomingAlert,
        config: &AlertConfig,
        quantity: Decimal,
        result: &OrderResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: alert.user_id.clone(),
            config_name: alert.config_name.clone(),
            symbol: Some(config.symbol.clone()),
            side: Some(config.position_side.side()),
            quantity: Some(quantity),
            price: alert.price,
            timestamp: result.timestamp,
            success: true,
            order_id: result.order_id.clone(),
            message: result.message.clone(),
            details: result.details.clone(),
        }
    }

    /// Minimal record of a failed alert
    pub fn failed(alert: &IncomingAlert, result: &OrderResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: alert.user_id.clone(),
            config_name: alert.config_name.clone(),
            symbol: None,
            side: None,
            quantity: None,
            price: None,
            timestamp: result.timestamp,
            success: false,
            order_id: None,
            message: result.message.clone(),
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> AlertConfig {
        AlertConfig {
            name: "c1".to_string(),
            exchange: ExchangeId::Binance,
            symbol: "BTC/USDT".to_string(),
            order_type: OrderType::Market,
            position_side: PositionSide::Long,
            quantity: Some(dec!(0.01)),
            quantity_percentage: None,
            price: None,
            stop_loss: None,
            take_profit: None,
            description: None,
        }
    }

    #[test]
    fn test_position_side_maps_to_order_side() {
        assert_eq!(PositionSide::Long.side(), Side::Buy);
        assert_eq!(PositionSide::Short.side(), Side::Sell);
    }

    #[test]
    fn test_order_type_rejects_unknown_tag() {
        let err = "trailing_stop".parse::<OrderType>().unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedOrderType(tag) if tag == "trailing_stop"));

        let json = r#"{"name":"x","exchange":"binance","symbol":"BTC/USDT","order_type":"iceberg","position_side":"long","quantity":1}"#;
        let parsed: std::result::Result<AlertConfig, _> = serde_json::from_str(json);
        assert!(parsed.unwrap_err().to_string().contains("Unsupported order type"));
    }

    #[test]
    fn test_config_deserializes_from_webhook_json() {
        let json = r#"{"name":"c1","exchange":"binance","symbol":"BTC/USDT","order_type":"take_profit","position_side":"short","quantity_percentage":10,"price":50000.5}"#;
        let parsed: AlertConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.order_type, OrderType::TakeProfit);
        assert_eq!(parsed.position_side, PositionSide::Short);
        assert_eq!(parsed.quantity_percentage, Some(dec!(10)));
        assert_eq!(parsed.price, Some(dec!(50000.5)));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_exactly_one_sizing_field() {
        let mut both = config();
        both.quantity_percentage = Some(dec!(10));
        assert!(matches!(both.validate(), Err(BridgeError::Validation(_))));

        let mut neither = config();
        neither.quantity = None;
        assert!(matches!(neither.validate(), Err(BridgeError::Validation(_))));

        let mut too_much = config();
        too_much.quantity = None;
        too_much.quantity_percentage = Some(dec!(100.5));
        assert!(too_much.validate().is_err());

        let mut all_in = config();
        all_in.quantity = None;
        all_in.quantity_percentage = Some(dec!(100));
        assert!(all_in.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_prices() {
        for value in [dec!(0), dec!(-5)] {
            let mut priced = config();
            priced.price = Some(value);
            let err = priced.validate().unwrap_err();
            assert!(matches!(err, BridgeError::Validation(msg) if msg.contains("price")));

            let mut stop = config();
            stop.stop_loss = Some(value);
            assert!(stop.validate().is_err());

            let mut target = config();
            target.take_profit = Some(value);
            assert!(target.validate().is_err());
        }

        let mut priced = config();
        priced.price = Some(dec!(0.0001));
        assert!(priced.validate().is_ok());
    }

    #[test]
    fn test_quote_currency() {
        assert_eq!(config().quote_currency().unwrap(), "USDT");

        let mut bad = config();
        bad.symbol = "BTCUSDT".to_string();
        assert!(bad.quote_currency().is_err());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_exchange_id_parse_is_case_insensitive() {
        assert_eq!("Binance".parse::<ExchangeId>().unwrap(), ExchangeId::Binance);
        assert!("mtgox".parse::<ExchangeId>().is_err());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ExchangeCredentials::new("my-key", "my-secret");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("my-key"));
        assert!(!printed.contains("my-secret"));
    }

    #[test]
    fn test_alert_ignores_non_positive_price() {
        let alert = IncomingAlert::new("u1", "c1").with_price(dec!(0));
        assert_eq!(alert.usable_price(), None);
        let alert = IncomingAlert::new("u1", "c1").with_price(dec!(42));
        assert_eq!(alert.usable_price(), Some(dec!(42)));
    }

    #[test]
    fn test_failed_history_record_is_minimal() {
        let alert = IncomingAlert::new("u1", "missing");
        let result = OrderResult::failed(&BridgeError::ConfigNotFound("missing".to_string()));
        let record = HistoryRecord::failed(&alert, &result);

        assert!(!record.success);
        assert_eq!(record.timestamp, result.timestamp);
        assert!(record.symbol.is_none() && record.quantity.is_none());
        assert!(record.message.unwrap().contains("missing"));
    }
}
