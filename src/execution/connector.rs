//! Default exchange connector

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::binance::BinanceRestClient;
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::{ExchangeClientHandle, ExchangeConnector};
use crate::common::types::{ExchangeCredentials, ExchangeId};
use crate::config::types::{AppConfig, BinanceConfig};

/// Connector backed by this crate's REST clients
///
/// Only Binance has a client; every other exchange fails construction.
#[derive(Debug, Clone)]
pub struct RestConnector {
    binance: BinanceConfig,
    request_timeout: Duration,
}

impl RestConnector {
    pub fn new(binance: BinanceConfig, request_timeout: Duration) -> Self {
        Self {
            binance,
            request_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.binance.clone(),
            Duration::from_secs(config.settings.request_timeout_seconds),
        )
    }
}

#[async_trait]
impl ExchangeConnector for RestConnector {
    async fn connect(
        &self,
        exchange: ExchangeId,
        credentials: ExchangeCredentials,
    ) -> Result<ExchangeClientHandle> {
        match exchange {
            ExchangeId::Binance => {
                let client = BinanceRestClient::with_timeout(
                    &self.binance.rest_url,
                    credentials,
                    self.request_timeout,
                )?
                .with_recv_window(self.binance.recv_window_ms);
                Ok(Arc::new(client))
            }
            other => Err(BridgeError::ClientConstruction(format!(
                "exchange {} is not supported",
                other
            ))),
        }
    }
}
