//! Common test utilities and fixtures
#![allow(dead_code)]

use alert_bridge::storage::{InMemoryConfigStore, InMemoryCredentialVault, InMemoryHistoryStore};
use alert_bridge::{
    AlertConfig, AlertPipeline, AppState, BalanceEntry, Balances, BridgeError, ConfigStore,
    CredentialCipher, CredentialVault, ExchangeClient, ExchangeClientHandle, ExchangeConnector,
    ExchangeCredentials, ExchangeGateway, ExchangeId, HistoryRecord, HistoryStore, OrderReceipt,
    OrderRequest, OrderType, PositionSide, Result, Ticker,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Vault key shared by every harness in a test binary
pub static VAULT_KEY: Lazy<String> = Lazy::new(CredentialCipher::generate_key_base64);

pub const USER: &str = "u1";

/// Market buy of a fixed 0.01 BTC
pub fn market_config(name: &str) -> AlertConfig {
    AlertConfig {
        name: name.to_string(),
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

/// Market buy sized at a percentage of the USDT balance
pub fn percentage_config(name: &str, percentage: Decimal) -> AlertConfig {
    AlertConfig {
        quantity: None,
        quantity_percentage: Some(percentage),
        ..market_config(name)
    }
}

/// Limit sell of a fixed quantity at an optional configured price
pub fn limit_config(name: &str, price: Option<Decimal>) -> AlertConfig {
    AlertConfig {
        order_type: OrderType::Limit,
        position_side: PositionSide::Short,
        price,
        quantity: Some(dec!(1)),
        ..market_config(name)
    }
}

/// Exchange double recording every call it receives
pub struct FakeExchange {
    pub balances: Balances,
    pub last_price: Option<Decimal>,
    pub reject_orders: bool,
    pub orders: Mutex<Vec<OrderRequest>>,
    pub balance_calls: AtomicUsize,
    pub ticker_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeExchange {
    pub fn new() -> Self {
        let mut balances = Balances::new();
        balances.insert(
            "USDT".to_string(),
            BalanceEntry {
                free: dec!(1000),
                used: dec!(0),
                total: dec!(1000),
            },
        );
        Self {
            balances,
            last_price: Some(dec!(50000)),
            reject_orders: false,
            orders: Mutex::new(Vec::new()),
            balance_calls: AtomicUsize::new(0),
            ticker_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1000),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_orders: true,
            ..Self::new()
        }
    }

    pub fn placed(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeClient for FakeExchange {
    fn exchange(&self) -> ExchangeId {
        ExchangeId::Binance
    }

    async fn fetch_balance(&self) -> Result<Balances> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.balances.clone())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker> {
        self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: self.last_price,
        })
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderReceipt> {
        if self.reject_orders {
            return Err(BridgeError::ExchangeRejected(
                "Account has insufficient balance for requested action.".to_string(),
            ));
        }
        self.orders.lock().unwrap().push(request.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(OrderReceipt {
            id: Some(id.to_string()),
            raw: serde_json::json!({"orderId": id, "status": "FILLED"}),
        })
    }
}

/// Connector that always hands out the same fake exchange
pub struct FakeConnector {
    pub exchange: Arc<FakeExchange>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(exchange: Arc<FakeExchange>) -> Self {
        Self {
            exchange,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ExchangeConnector for FakeConnector {
    async fn connect(
        &self,
        exchange: ExchangeId,
        _credentials: ExchangeCredentials,
    ) -> Result<ExchangeClientHandle> {
        if exchange != ExchangeId::Binance {
            return Err(BridgeError::ClientConstruction(format!(
                "exchange {} is not supported",
                exchange
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let client: ExchangeClientHandle = self.exchange.clone();
        Ok(client)
    }
}

/// History store whose writes never succeed
pub struct BrokenHistoryStore;

#[async_trait]
impl HistoryStore for BrokenHistoryStore {
    async fn append(&self, _user_id: &str, _record: &HistoryRecord) -> Result<bool> {
        Err(BridgeError::Persistence("connection refused".to_string()))
    }

    async fn list(&self, _user_id: &str, _limit: usize) -> Result<Vec<HistoryRecord>> {
        Ok(Vec::new())
    }
}

/// Fully wired pipeline over in-memory stores and a fake exchange
pub struct Harness {
    pub exchange: Arc<FakeExchange>,
    pub connector: Arc<FakeConnector>,
    pub vault: Arc<InMemoryCredentialVault>,
    pub configs: Arc<InMemoryConfigStore>,
    pub history: Arc<InMemoryHistoryStore>,
    pub pipeline: Arc<AlertPipeline>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_exchange(FakeExchange::new()).await
    }

    pub async fn with_exchange(exchange: FakeExchange) -> Self {
        let exchange = Arc::new(exchange);
        let connector = Arc::new(FakeConnector::new(exchange.clone()));
        let cipher = CredentialCipher::from_base64(&VAULT_KEY).unwrap();
        let vault = Arc::new(InMemoryCredentialVault::new(cipher));
        vault
            .put(USER, ExchangeId::Binance, &ExchangeCredentials::new("test-key", "test-secret"))
            .await
            .unwrap();
        let configs = Arc::new(InMemoryConfigStore::new());
        let history = Arc::new(InMemoryHistoryStore::new());

        let gateway = Arc::new(ExchangeGateway::new(vault.clone(), connector.clone()));
        let pipeline = Arc::new(AlertPipeline::new(configs.clone(), gateway, history.clone()));

        Self {
            exchange,
            connector,
            vault,
            configs,
            history,
            pipeline,
        }
    }

    pub async fn with_config(self, config: AlertConfig) -> Self {
        self.configs.put(USER, &config).await.unwrap();
        self
    }

    /// Router state over the same stores
    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(
            self.pipeline.clone(),
            self.vault.clone(),
            self.configs.clone(),
            self.history.clone(),
            USER,
        ))
    }
}
