//! In-memory stores backed by DashMap
//!
//! Used when no database is configured, and by tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::crypto::{CredentialCipher, SealedCredentials};
use crate::common::errors::Result;
use crate::common::traits::{ConfigStore, CredentialVault, HistoryStore};
use crate::common::types::{AlertConfig, ExchangeCredentials, ExchangeId, HistoryRecord};

/// In-memory credential vault
///
/// Holds only sealed values; credentials are opened on `get`.
#[derive(Clone)]
pub struct InMemoryCredentialVault {
    cipher: Arc<CredentialCipher>,
    entries: Arc<DashMap<(String, ExchangeId), SealedCredentials>>,
}

impl InMemoryCredentialVault {
    pub fn new(cipher: CredentialCipher) -> Self {
        Self {
            cipher: Arc::new(cipher),
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Stored (sealed) form of a key pair
    pub fn sealed(&self, user_id: &str, exchange: ExchangeId) -> Option<SealedCredentials> {
        self.entries
            .get(&(user_id.to_string(), exchange))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl CredentialVault for InMemoryCredentialVault {
    async fn get(&self, user_id: &str, exchange: ExchangeId) -> Result<Option<ExchangeCredentials>> {
        match self.sealed(user_id, exchange) {
            Some(sealed) => self.cipher.open_credentials(&sealed).map(Some),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user_id: &str,
        exchange: ExchangeId,
        credentials: &ExchangeCredentials,
    ) -> Result<bool> {
        let sealed = self.cipher.seal_credentials(credentials)?;
        self.entries.insert((user_id.to_string(), exchange), sealed);
        Ok(true)
    }

    async fn delete(&self, user_id: &str, exchange: ExchangeId) -> Result<bool> {
        Ok(self
            .entries
            .remove(&(user_id.to_string(), exchange))
            .is_some())
    }
}

/// In-memory configuration store
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    configs: Arc<DashMap<(String, String), AlertConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get(&self, user_id: &str, name: &str) -> Result<Option<AlertConfig>> {
        Ok(self
            .configs
            .get(&(user_id.to_string(), name.to_string()))
            .map(|c| c.value().clone()))
    }

    async fn put(&self, user_id: &str, config: &AlertConfig) -> Result<bool> {
        config.validate()?;
        self.configs
            .insert((user_id.to_string(), config.name.clone()), config.clone());
        Ok(true)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<AlertConfig>> {
        let mut configs: Vec<AlertConfig> = self
            .configs
            .iter()
            .filter(|entry| entry.key().0 == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(configs)
    }

    async fn delete(&self, user_id: &str, name: &str) -> Result<bool> {
        Ok(self
            .configs
            .remove(&(user_id.to_string(), name.to_string()))
            .is_some())
    }
}

/// In-memory history store
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    records: Arc<DashMap<String, Vec<HistoryRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records held for a user
    pub fn count(&self, user_id: &str) -> usize {
        self.records.get(user_id).map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user_id: &str, record: &HistoryRecord) -> Result<bool> {
        self.records
            .entry(user_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(true)
    }

    async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = match self.records.get(user_id) {
            Some(entry) => entry.value().iter().rev().cloned().collect(),
            None => return Ok(Vec::new()),
        };
        // Stable sort keeps the latest append first among equal timestamps
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}
