//! PostgreSQL-backed stores

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use super::crypto::{CredentialCipher, SealedCredentials};
use crate::common::errors::{BridgeError, Result};
use crate::common::traits::{ConfigStore, CredentialVault, HistoryStore};
use crate::common::types::{AlertConfig, ExchangeCredentials, ExchangeId, HistoryRecord};
use crate::config::types::DatabaseConfig;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS exchange_credentials (
        user_id TEXT NOT NULL,
        exchange TEXT NOT NULL,
        api_key_sealed TEXT NOT NULL,
        api_secret_sealed TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (user_id, exchange)
    )",
    "CREATE TABLE IF NOT EXISTS alert_configs (
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        payload TEXT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (user_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS alert_history (
        user_id TEXT NOT NULL,
        recorded_at TIMESTAMPTZ NOT NULL,
        record_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (user_id, recorded_at, record_id)
    )",
    "CREATE INDEX IF NOT EXISTS alert_history_recent
        ON alert_history (user_id, recorded_at DESC)",
];

/// Open a connection pool for the configured database
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Create the tables used by the stores if they do not exist yet
pub async fn migrate(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema is up to date");
    Ok(())
}

/// Credential vault storing sealed key pairs in `exchange_credentials`
#[derive(Clone)]
pub struct PgCredentialVault {
    pool: PgPool,
    cipher: Arc<CredentialCipher>,
}

impl PgCredentialVault {
    pub fn new(pool: PgPool, cipher: CredentialCipher) -> Self {
        Self {
            pool,
            cipher: Arc::new(cipher),
        }
    }
}

#[async_trait]
impl CredentialVault for PgCredentialVault {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str, exchange: ExchangeId) -> Result<Option<ExchangeCredentials>> {
        let row = sqlx::query(
            "SELECT api_key_sealed, api_secret_sealed FROM exchange_credentials
             WHERE user_id = $1 AND exchange = $2",
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let sealed = SealedCredentials {
                    api_key: row.try_get("api_key_sealed")?,
                    api_secret: row.try_get("api_secret_sealed")?,
                };
                self.cipher.open_credentials(&sealed).map(Some)
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, credentials))]
    async fn put(
        &self,
        user_id: &str,
        exchange: ExchangeId,
        credentials: &ExchangeCredentials,
    ) -> Result<bool> {
        let sealed = self.cipher.seal_credentials(credentials)?;
        let result = sqlx::query(
            "INSERT INTO exchange_credentials
                (user_id, exchange, api_key_sealed, api_secret_sealed, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id, exchange) DO UPDATE SET
                api_key_sealed = EXCLUDED.api_key_sealed,
                api_secret_sealed = EXCLUDED.api_secret_sealed,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .bind(&sealed.api_key)
        .bind(&sealed.api_secret)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: &str, exchange: ExchangeId) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM exchange_credentials WHERE user_id = $1 AND exchange = $2",
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Configuration store keeping each config as a JSON document
#[derive(Clone)]
pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(payload: &str) -> Result<AlertConfig> {
        serde_json::from_str(payload)
            .map_err(|e| BridgeError::Persistence(format!("Corrupt stored config: {}", e)))
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    #[instrument(skip(self))]
    async fn get(&self, user_id: &str, name: &str) -> Result<Option<AlertConfig>> {
        let row = sqlx::query("SELECT payload FROM alert_configs WHERE user_id = $1 AND name = $2")
            .bind(user_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Self::decode(&payload).map(Some)
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, config), fields(name = %config.name))]
    async fn put(&self, user_id: &str, config: &AlertConfig) -> Result<bool> {
        config.validate()?;
        let payload = serde_json::to_string(config)?;
        let result = sqlx::query(
            "INSERT INTO alert_configs (user_id, name, payload, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, name) DO UPDATE SET
                payload = EXCLUDED.payload,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(user_id)
        .bind(&config.name)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: &str) -> Result<Vec<AlertConfig>> {
        let rows = sqlx::query("SELECT payload FROM alert_configs WHERE user_id = $1 ORDER BY name")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<AlertConfig> {
                let payload: String = row.try_get("payload")?;
                Self::decode(&payload)
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: &str, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM alert_configs WHERE user_id = $1 AND name = $2")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Append-only history table keyed by (user, recorded_at, record id)
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    #[instrument(skip(self, record), fields(config_name = %record.config_name))]
    async fn append(&self, user_id: &str, record: &HistoryRecord) -> Result<bool> {
        let payload = serde_json::to_string(record)?;
        let result = sqlx::query(
            "INSERT INTO alert_history (user_id, recorded_at, record_id, payload)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(record.timestamp)
        .bind(record.id.to_string())
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT payload FROM alert_history WHERE user_id = $1
             ORDER BY recorded_at DESC, record_id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<HistoryRecord> {
                let payload: String = row.try_get("payload")?;
                serde_json::from_str(&payload).map_err(|e| {
                    BridgeError::Persistence(format!("Corrupt history record: {}", e))
                })
            })
            .collect()
    }
}
