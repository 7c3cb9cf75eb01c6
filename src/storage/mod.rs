//! Credential, configuration and history stores

pub mod crypto;
pub mod memory;
pub mod postgres;

pub use crypto::CredentialCipher;
pub use memory::{InMemoryConfigStore, InMemoryCredentialVault, InMemoryHistoryStore};
pub use postgres::{PgConfigStore, PgCredentialVault, PgHistoryStore};
