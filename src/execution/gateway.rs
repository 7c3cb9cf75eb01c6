//! Exchange gateway with a per-(user, exchange) client cache

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::common::errors::{BridgeError, Result};
use crate::common::traits::{CredentialVault, ExchangeClientHandle, ExchangeConnector};
use crate::common::types::ExchangeId;

type ClientKey = (String, ExchangeId);

/// Hands out exchange clients, constructing each one at most once
///
/// Concurrent first use of a key awaits a single construction. A failed
/// construction leaves the slot empty so the next call retries. Entries are
/// never evicted on their own; [`ExchangeGateway::evict`] drops one when its
/// credentials change.
pub struct ExchangeGateway {
    vault: Arc<dyn CredentialVault>,
    connector: Arc<dyn ExchangeConnector>,
    clients: DashMap<ClientKey, Arc<OnceCell<ExchangeClientHandle>>>,
}

impl ExchangeGateway {
    pub fn new(vault: Arc<dyn CredentialVault>, connector: Arc<dyn ExchangeConnector>) -> Self {
        Self {
            vault,
            connector,
            clients: DashMap::new(),
        }
    }

    /// Cached client for (user, exchange), constructing it on first use
    #[instrument(skip(self))]
    pub async fn get_client(&self, user_id: &str, exchange: ExchangeId) -> Result<ExchangeClientHandle> {
        let slot = self
            .clients
            .entry((user_id.to_string(), exchange))
            .or_default()
            .clone();

        let client = slot
            .get_or_try_init(|| self.build_client(user_id, exchange))
            .await?;

        Ok(Arc::clone(client))
    }

    /// Drop the cached client for (user, exchange)
    pub fn evict(&self, user_id: &str, exchange: ExchangeId) -> bool {
        let removed = self
            .clients
            .remove(&(user_id.to_string(), exchange))
            .is_some();
        if removed {
            debug!("Evicted {} client for user {}", exchange, user_id);
        }
        removed
    }

    /// Number of constructed clients currently cached
    pub fn cached_clients(&self) -> usize {
        self.clients
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    async fn build_client(&self, user_id: &str, exchange: ExchangeId) -> Result<ExchangeClientHandle> {
        let credentials = self.vault.get(user_id, exchange).await?.ok_or_else(|| {
            BridgeError::CredentialsNotFound {
                user_id: user_id.to_string(),
                exchange,
            }
        })?;

        let client = self.connector.connect(exchange, credentials).await?;
        info!("Created {} client for user {}", exchange, user_id);
        Ok(client)
    }
}
