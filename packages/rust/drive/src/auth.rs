//! Service-account authentication for the Drive API.
//!
//! A signed RS256 assertion is exchanged at the key's `token_uri` for a
//! bearer token, which is cached for the rest of the run.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::debug;

use reelminer_shared::{ReelMinerError, Result};

/// OAuth scope granting full Drive access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google rejects anything over an hour.
const ASSERTION_TTL_SECS: i64 = 3600;

/// The fields of a service-account key file that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl ServiceAccountKey {
    /// Parse a service-account JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ReelMinerError::config(format!("invalid service-account JSON: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Where bearer tokens come from.
#[derive(Debug)]
pub enum DriveAuth {
    /// Service-account assertion flow; the token is fetched once.
    ServiceAccount {
        key: ServiceAccountKey,
        token: OnceCell<String>,
    },
    /// A fixed token.
    Static(String),
}

impl DriveAuth {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        Self::ServiceAccount {
            key,
            token: OnceCell::new(),
        }
    }

    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// Bearer token for the next request.
    pub async fn access_token(&self, client: &Client) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount { key, token } => token
                .get_or_try_init(|| exchange_assertion(client, key))
                .await
                .cloned(),
        }
    }
}

/// Sign the assertion for `key` at the current time.
pub fn sign_assertion(key: &ServiceAccountKey) -> Result<String> {
    let iat = Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: DRIVE_SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + ASSERTION_TTL_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| ReelMinerError::config(format!("invalid service-account private key: {e}")))?;
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .map_err(|e| ReelMinerError::Drive(format!("failed to sign assertion: {e}")))
}

async fn exchange_assertion(client: &Client, key: &ServiceAccountKey) -> Result<String> {
    let assertion = sign_assertion(key)?;
    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| ReelMinerError::Network(format!("{}: {e}", key.token_uri)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ReelMinerError::Drive(format!(
            "token exchange returned HTTP {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ReelMinerError::parse(format!("invalid token response: {e}")))?;
    debug!(client_email = %key.client_email, "access token obtained");
    Ok(token.access_token)
}
