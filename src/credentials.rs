//! Google service account credentials for the Vision API.
//!
//! Mints OAuth2 access tokens with the JWT-bearer grant and caches them until
//! shortly before expiry. Refreshes are serialized, so concurrent requests that
//! miss the cache share one token exchange. The key is parsed and the RSA key checked when
//! loaded, so a broken key file fails at startup instead of on first request.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Refresh tokens this many seconds before they expire.
const EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: u64,
}

#[derive(Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

#[derive(Clone)]
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    encoding_key: jsonwebtoken::EncodingKey,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

impl ServiceAccount {
    /// Load a service account JSON key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let key_json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account key: {:?}", path))?;
        Self::from_json(&key_json)
            .with_context(|| format!("Invalid service account key: {:?}", path))
    }

    pub fn from_json(key_json: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(key_json).context("Failed to parse service account JSON")?;

        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Invalid RSA private key in service account JSON")?;

        info!("Loaded service account credentials for {}", key.client_email);

        Ok(Self {
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            encoding_key,
            token_cache: Arc::new(Mutex::new(None)),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Get a valid OAuth2 access token, refreshing if expired.
    ///
    /// The cache lock is held across the exchange so only one refresh is in
    /// flight at a time.
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String> {
        let mut cache = self.token_cache.lock().await;

        let now = now_secs();
        if let Some(cached) = cache
            .as_ref()
            .filter(|cached| now < cached.expires_at.saturating_sub(EXPIRY_MARGIN_SECS))
        {
            return Ok(cached.access_token.clone());
        }

        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": VISION_SCOPE,
            "aud": self.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let jwt = jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .context("Failed to encode JWT")?;

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            expires_in: u64,
        }

        let resp: TokenResponse = client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .context("Token exchange request failed")?
            .error_for_status()
            .context("Token exchange returned error")?
            .json()
            .await
            .context("Failed to parse token response")?;

        debug!("Minted access token valid for {}s", resp.expires_in);

        let token = resp.access_token.clone();
        *cache = Some(CachedToken {
            access_token: resp.access_token,
            expires_at: now + resp.expires_in,
        });

        Ok(token)
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
