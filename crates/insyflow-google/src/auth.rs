//! Service-account OAuth for Google APIs.
//!
//! A signed JWT assertion (RS256) is exchanged at the key's token URI for a
//! short-lived access token, which is reused until shortly before it expires.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{http::read_json, GoogleError};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const WEBMASTERS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";

/// Assertions are valid for one hour, the maximum Google accepts.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the upstream expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse the downloaded key JSON.
    ///
    /// Keys pasted into environment variables often carry the PEM newlines as
    /// literal `\n` sequences; those are turned back into real newlines.
    pub fn from_json(raw: &str) -> Result<Self, GoogleError> {
        let mut key: Self = serde_json::from_str(raw)
            .map_err(|e| GoogleError::InvalidKey(format!("not a service-account JSON: {e}")))?;
        if key.client_email.trim().is_empty() {
            return Err(GoogleError::InvalidKey("client_email is empty".to_string()));
        }
        key.private_key = key.private_key.replace("\\n", "\n");
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(GoogleError::InvalidKey(
                "private_key is not a PEM private key".to_string(),
            ));
        }
        Ok(key)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Access tokens for one service account and one scope.
pub struct TokenProvider {
    http: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: &'static str,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, key: ServiceAccountKey, scope: &'static str) -> Result<Self, GoogleError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GoogleError::InvalidKey(format!("private_key rejected: {e}")))?;
        Ok(Self {
            http,
            key,
            encoding_key,
            scope,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: self.scope,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .context("failed to sign service-account assertion")
    }

    /// A bearer token valid for at least [`EXPIRY_MARGIN_SECS`] more seconds.
    ///
    /// The lock is held across the exchange so concurrent callers wait for a
    /// single refresh instead of each minting their own token.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.signed_assertion(now)?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .context("OAuth token request failed")?;
        let token: TokenResponse = read_json(resp, "OAuth").await?;

        debug!(scope = self.scope, expires_in = token.expires_in, "Access token refreshed");
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        });
        Ok(value)
    }
}
