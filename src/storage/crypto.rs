//! Sealing of credential fields at rest (AES-256-GCM)

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::common::errors::{BridgeError, Result};
use crate::common::types::ExchangeCredentials;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Symmetric cipher used by the credential vaults
///
/// Sealed form is base64(nonce || ciphertext) with a fresh nonce per value.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Build a cipher from a raw 32-byte key
    pub fn from_key(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(BridgeError::Encryption(format!(
                "key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| BridgeError::Encryption(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Build a cipher from a base64-encoded 32-byte key
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| BridgeError::Encryption(format!("Failed to decode key: {}", e)))?;
        Self::from_key(&key)
    }

    /// Cipher with a freshly generated random key
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Random key suitable for `vault.encryption_key`
    pub fn generate_key_base64() -> String {
        BASE64.encode(Aes256Gcm::generate_key(OsRng))
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| BridgeError::Encryption(format!("Failed to seal value: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    pub fn open(&self, sealed: &str) -> Result<String> {
        let bytes = BASE64
            .decode(sealed)
            .map_err(|e| BridgeError::Encryption(format!("Failed to decode sealed value: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(BridgeError::Encryption("sealed value too short".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| BridgeError::Encryption(format!("Failed to open value: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| BridgeError::Encryption(format!("Opened value is not UTF-8: {}", e)))
    }

    pub fn seal_credentials(&self, credentials: &ExchangeCredentials) -> Result<SealedCredentials> {
        Ok(SealedCredentials {
            api_key: self.seal(&credentials.api_key)?,
            api_secret: self.seal(&credentials.api_secret)?,
        })
    }

    pub fn open_credentials(&self, sealed: &SealedCredentials) -> Result<ExchangeCredentials> {
        Ok(ExchangeCredentials {
            api_key: self.open(&sealed.api_key)?,
            api_secret: self.open(&sealed.api_secret)?,
        })
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

/// Key pair as stored by a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCredentials {
    pub api_key: String,
    pub api_secret: String,
}
