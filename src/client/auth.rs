//! HMAC-SHA256 authentication for exchange requests.
//!
//! REST requests carry an `Authorization` header:
//!
//! ```text
//! HS256 base64(api_key:signature:timestamp)
//! signature = hex(HMAC-SHA256(secret, method + path_and_query + body + timestamp))
//! ```
//!
//! WebSocket sessions authenticate with a `login` request whose signature is
//! the HMAC of a random nonce.
//!
//! # Example
//!
//! ```rust
//! use cryptomarket::client::auth::Signer;
//!
//! let signer = Signer::new("api-key", "api-secret");
//! let header = signer.authorization("GET", "/api/2/trading/balance", "", 1700000000000);
//! assert!(header.starts_with("HS256 "));
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use sha2::Sha256;

use crate::config::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// Length of WebSocket login nonces
const NONCE_LEN: usize = 16;

/// HMAC-SHA256 signer for exchange authentication
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    api_secret: Vec<u8>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").field("api_key", &self.api_key).finish()
    }
}

/// `params` of the WebSocket `login` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    /// Signature algorithm, always `HS256`
    pub algo: &'static str,
    /// API key
    pub p_key: String,
    /// Random nonce that was signed
    pub nonce: String,
    /// Hex encoded HMAC of the nonce
    pub signature: String,
}

impl Signer {
    /// Create a new signer
    pub fn new(api_key: impl Into<String>, api_secret: impl AsRef<[u8]>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.as_ref().to_vec(),
        }
    }

    /// Create a signer from configured credentials
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self::new(credentials.api_key(), credentials.api_secret())
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex encoded HMAC-SHA256 of `message`
    pub fn sign(&self, message: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.api_secret).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the `Authorization` header value of a REST request
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method (GET, POST, DELETE, ...)
    /// * `path_and_query` - Request path including the query string, if any
    /// * `body` - Serialized request body (empty for GET/DELETE)
    /// * `timestamp_ms` - Unix timestamp in milliseconds
    pub fn authorization(
        &self,
        method: &str,
        path_and_query: &str,
        body: &str,
        timestamp_ms: u64,
    ) -> String {
        let message = format!("{}{}{}{}", method, path_and_query, body, timestamp_ms);
        let signature = self.sign(&message);
        let token = format!("{}:{}:{}", self.api_key, signature, timestamp_ms);
        format!("HS256 {}", BASE64.encode(token))
    }

    /// Build `login` parameters with a fresh random nonce
    pub fn login_params(&self) -> LoginParams {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LEN)
            .map(char::from)
            .collect();
        self.login_params_with_nonce(nonce)
    }

    /// Build `login` parameters for a given nonce
    pub fn login_params_with_nonce(&self, nonce: impl Into<String>) -> LoginParams {
        let nonce = nonce.into();
        LoginParams {
            algo: "HS256",
            p_key: self.api_key.clone(),
            signature: self.sign(&nonce),
            nonce,
        }
    }

    /// Get the current timestamp in milliseconds
    pub fn current_timestamp_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp() {
        let ts = Signer::current_timestamp_ms();
        // Should be after 2024
        assert!(ts > 1704067200000);
    }

    #[test]
    fn test_sign_known_vector() {
        // RFC 4231 test case 2
        let signer = Signer::new("key", "Jefe");
        assert_eq!(
            signer.sign("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_authorization_header_layout() {
        let signer = Signer::new("my-key", "my-secret");
        let header = signer.authorization("POST", "/api/2/order", r#"{"symbol":"ETHBTC"}"#, 42);

        let encoded = header.strip_prefix("HS256 ").unwrap();
        let decoded = String::from_utf8(BASE64.decode(encoded).unwrap()).unwrap();
        let parts: Vec<&str> = decoded.split(':').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "my-key");
        assert_eq!(parts[1], signer.sign(r#"POST/api/2/order{"symbol":"ETHBTC"}42"#));
        assert_eq!(parts[2], "42");
    }

    #[test]
    fn test_login_params() {
        let signer = Signer::new("my-key", "my-secret");
        let params = signer.login_params_with_nonce("abc");
        assert_eq!(params.signature, signer.sign("abc"));

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["algo"], "HS256");
        assert_eq!(json["pKey"], "my-key");
        assert_eq!(json["nonce"], "abc");

        let random = signer.login_params();
        assert_eq!(random.nonce.len(), NONCE_LEN);
    }

    #[test]
    fn test_secret_not_in_debug() {
        let signer = Signer::new("my-key", "my-secret");
        assert!(!format!("{:?}", signer).contains("my-secret"));
    }
}
