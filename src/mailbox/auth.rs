//! App-only OAuth2 token acquisition (client-credentials grant).
//!
//! The access token is cached and refreshed shortly before it expires, so a
//! five-minute polling cycle normally reuses one token for about an hour.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::MailboxError;

/// Scope requesting every application permission granted to the app.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

/// Fetches and caches bearer tokens for the Graph API.
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        client: reqwest::Client,
        authority_url: &str,
        tenant_id: &str,
        client_id: String,
        client_secret: SecretString,
    ) -> Self {
        Self {
            client,
            token_url: format!(
                "{}/{tenant_id}/oauth2/v2.0/token",
                authority_url.trim_end_matches('/')
            ),
            client_id,
            client_secret,
            scope: GRAPH_DEFAULT_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Endpoint tokens are requested from.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Return a valid access token, requesting a new one if needed.
    pub async fn token(&self) -> Result<SecretString, MailboxError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && Instant::now() < entry.refresh_at
        {
            return Ok(entry.token.clone());
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drop the cached token so the next call requests a new one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn request_token(&self) -> Result<CachedToken, MailboxError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", self.scope.as_str()),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailboxError::Auth(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Auth(format!("HTTP {status}: {body}")));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| MailboxError::Auth(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!(expires_in = parsed.expires_in, "Acquired Graph access token");

        Ok(CachedToken {
            token: SecretString::from(parsed.access_token),
            refresh_at: Instant::now() + lifetime,
        })
    }
}
