//! Trait definitions for exchange clients and the stores the pipeline talks to

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::Result;
use super::types::{
    AlertConfig, Balances, ExchangeCredentials, ExchangeId, HistoryRecord, OrderReceipt,
    OrderRequest, Ticker,
};

/// Capability interface of one live exchange connection
///
/// A client is bound to a single user's credentials for its whole lifetime
/// and is shared by every concurrent alert for that (user, exchange) pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange this client talks to
    fn exchange(&self) -> ExchangeId;

    /// Fetch account balances keyed by currency
    async fn fetch_balance(&self) -> Result<Balances>;

    /// Fetch the latest ticker for a unified symbol (BASE/QUOTE)
    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker>;

    /// Place an order and return the exchange receipt
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderReceipt>;
}

/// Shared exchange client handle
pub type ExchangeClientHandle = Arc<dyn ExchangeClient>;

/// Builds exchange clients from decrypted credentials
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Construct a client, failing with `ClientConstruction` when the
    /// exchange is unsupported or the credentials are unusable
    async fn connect(
        &self,
        exchange: ExchangeId,
        credentials: ExchangeCredentials,
    ) -> Result<ExchangeClientHandle>;
}

/// Encrypted storage of exchange API key pairs
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Decrypted key pair, or `None` when nothing is stored
    async fn get(&self, user_id: &str, exchange: ExchangeId) -> Result<Option<ExchangeCredentials>>;

    async fn put(
        &self,
        user_id: &str,
        exchange: ExchangeId,
        credentials: &ExchangeCredentials,
    ) -> Result<bool>;

    async fn delete(&self, user_id: &str, exchange: ExchangeId) -> Result<bool>;
}

/// Storage of named alert configurations
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, user_id: &str, name: &str) -> Result<Option<AlertConfig>>;

    /// Validate and upsert a configuration under its name
    async fn put(&self, user_id: &str, config: &AlertConfig) -> Result<bool>;

    /// All configurations of a user, sorted by name
    async fn list(&self, user_id: &str) -> Result<Vec<AlertConfig>>;

    async fn delete(&self, user_id: &str, name: &str) -> Result<bool>;
}

/// Append-only log of alert outcomes
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, user_id: &str, record: &HistoryRecord) -> Result<bool>;

    /// Most recent records first, at most `limit` of them
    async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>>;
}
