//! Error types for the application

use thiserror::Error;

use super::types::{ExchangeId, OrderResult, OrderType};

/// Result type alias using our BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Main error type for pipeline steps, stores and exchange clients
#[derive(Error, Debug)]
pub enum BridgeError {
    /// No configuration stored under the requested name
    #[error("Configuration '{0}' not found")]
    ConfigNotFound(String),

    /// The vault holds no key pair for this user/exchange
    #[error("API keys not found for exchange {exchange}")]
    CredentialsNotFound { user_id: String, exchange: ExchangeId },

    /// The exchange client could not be instantiated
    #[error("Error creating exchange client: {0}")]
    ClientConstruction(String),

    /// The quote currency is missing from the balance response
    #[error("No balance found for {0}")]
    BalanceNotFound(String),

    /// Neither a fixed quantity nor a percentage yielded a positive size
    #[error("Could not determine order quantity")]
    QuantityUndetermined,

    /// A price-bearing order type had no price available
    #[error("Price required for {0} orders")]
    MissingPrice(OrderType),

    /// Order type tag outside the recognized set
    #[error("Unsupported order type: {0}")]
    UnsupportedOrderType(String),

    /// The exchange refused or failed the order call
    #[error("Exchange rejected request: {0}")]
    ExchangeRejected(String),

    /// A store write or read failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rejected input (alert config, query parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sealing or opening a credential failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for BridgeError {
    fn from(err: sqlx::Error) -> Self {
        BridgeError::Persistence(err.to_string())
    }
}

/// Error surfaced past the pipeline boundary.
///
/// Every step failure is folded into a failed [`OrderResult`]; the only thing
/// that escapes is a history write that did not happen, because the order it
/// describes may already be live on the exchange.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Outcome of '{config_name}' was not recorded: {source}")]
    HistoryNotRecorded {
        config_name: String,
        result: OrderResult,
        #[source]
        source: BridgeError,
    },
}

impl PipelineError {
    /// The outcome that could not be recorded
    pub fn result(&self) -> &OrderResult {
        match self {
            PipelineError::HistoryNotRecorded { result, .. } => result,
        }
    }

    pub fn into_result(self) -> OrderResult {
        match self {
            PipelineError::HistoryNotRecorded { result, .. } => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        let err = BridgeError::ConfigNotFound("c1".to_string());
        assert_eq!(err.to_string(), "Configuration 'c1' not found");

        let err = BridgeError::CredentialsNotFound {
            user_id: "u1".to_string(),
            exchange: ExchangeId::Binance,
        };
        assert_eq!(err.to_string(), "API keys not found for exchange binance");

        let err = BridgeError::MissingPrice(OrderType::StopLoss);
        assert_eq!(err.to_string(), "Price required for stop_loss orders");
    }

    #[test]
    fn test_sqlx_error_becomes_persistence() {
        let err: BridgeError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, BridgeError::Persistence(_)));
    }
}
