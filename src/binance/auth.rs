//! Request signing for the Binance spot API

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{BridgeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on authenticated requests
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Generate the lower-hex HMAC-SHA256 signature of a query string
///
/// # Arguments
/// * `secret` - API secret in plain text
/// * `payload` - URL-encoded query string (or form body) to sign
pub fn sign_payload(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| BridgeError::ClientConstruction(format!("Failed to create HMAC: {}", e)))?;
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a signed query string
///
/// Appends `recvWindow` and `timestamp` to `params`, URL-encodes them and
/// appends the resulting `signature`.
pub fn signed_query(
    params: &[(&str, String)],
    secret: &str,
    timestamp_ms: i64,
    recv_window_ms: u64,
) -> Result<String> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("recvWindow", &recv_window_ms.to_string());
    serializer.append_pair("timestamp", &timestamp_ms.to_string());
    let query = serializer.finish();

    let signature = sign_payload(secret, &query)?;
    Ok(format!("{}&signature={}", query, signature))
}
