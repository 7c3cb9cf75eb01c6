//! Alert Bridge Library
//!
//! Turns TradingView webhook alerts into exchange orders: each alert names a
//! stored configuration, the pipeline sizes the order from live balances,
//! places it through a cached per-user exchange client and records the outcome.

pub mod binance;
pub mod common;
pub mod config;
pub mod execution;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use common::errors::{BridgeError, PipelineError, Result};
pub use common::traits::{
    ConfigStore, CredentialVault, ExchangeClient, ExchangeClientHandle, ExchangeConnector,
    HistoryStore,
};
pub use common::types::{
    AlertConfig, BalanceEntry, Balances, ExchangeCredentials, ExchangeId, HistoryRecord,
    IncomingAlert, OrderKind, OrderReceipt, OrderRequest, OrderResult, OrderType, PositionSide,
    Side, Ticker,
};
pub use config::types::AppConfig;
pub use execution::{AlertPipeline, ExchangeGateway, OrderDispatcher, QuantityResolver, RestConnector};
pub use server::{create_router, AppState};
pub use storage::CredentialCipher;
