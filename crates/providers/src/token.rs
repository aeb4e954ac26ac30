//! OAuth2 client-credentials token cache.
//!
//! The token is cached in the client object and re-fetched when it is
//! within the expiry safety buffer. A clock trait is injected so tests
//! can drive expiry without sleeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use agro_common::{AgroError, AgroResult};

/// Seconds before nominal expiry at which the token is considered stale.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Fresh means outside the safety buffer, not merely unexpired.
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Client-credentials token fetcher with in-object caching.
pub struct TokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(client: Client, token_url: String, client_id: String, client_secret: String) -> Self {
        Self::with_clock(client, token_url, client_id, client_secret, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: Client,
        token_url: String,
        client_id: String,
        client_secret: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            clock,
            cached: Mutex::new(None),
        }
    }

    /// Return a bearer token, re-fetching if the cached one is stale.
    #[instrument(skip(self))]
    pub async fn bearer_token(&self, provider: &str) -> AgroResult<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(self.clock.now()) {
                return Ok(token.access_token.clone());
            }
            debug!(provider = provider, "Cached token stale, refreshing");
        }

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AgroError::ProviderAuth {
                provider: provider.to_string(),
                message: format!("token request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AgroError::ProviderAuth {
                provider: provider.to_string(),
                message: format!("token endpoint returned {}", response.status()),
            });
        }

        let token: TokenResponse =
            response.json().await.map_err(|e| AgroError::ProviderAuth {
                provider: provider.to_string(),
                message: format!("malformed token response: {}", e),
            })?;

        let entry = CachedToken {
            access_token: token.access_token.clone(),
            expires_at: self.clock.now() + Duration::seconds(token.expires_in),
        };

        debug!(
            provider = provider,
            expires_at = %entry.expires_at,
            "Fetched OAuth token"
        );

        *cached = Some(entry);
        Ok(token.access_token)
    }

    /// Seed the cache directly. Test hook only.
    #[cfg(test)]
    async fn seed(&self, access_token: &str, expires_at: DateTime<Utc>) {
        *self.cached.lock().await = Some(CachedToken {
            access_token: access_token.to_string(),
            expires_at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_fresh_outside_buffer() {
        let token = CachedToken {
            access_token: "abc".into(),
            expires_at: t(300),
        };
        assert!(token.is_fresh(t(0)));
    }

    #[test]
    fn test_stale_inside_buffer() {
        let token = CachedToken {
            access_token: "abc".into(),
            expires_at: t(300),
        };
        // 30s before expiry is inside the 60s buffer
        assert!(!token.is_fresh(t(270)));
        assert!(!token.is_fresh(t(400)));
    }

    #[tokio::test]
    async fn test_cached_token_returned_without_network() {
        // Token URL is unroutable; a fresh cached token must short-circuit
        // before any request is attempted.
        let cache = TokenCache::with_clock(
            Client::new(),
            "http://127.0.0.1:1/oauth/token".into(),
            "id".into(),
            "secret".into(),
            Arc::new(FixedClock(t(0))),
        );
        cache.seed("cached-token", t(3600)).await;

        let token = cache.bearer_token("sentinel-hub").await.unwrap();
        assert_eq!(token, "cached-token");
    }

    #[tokio::test]
    async fn test_stale_token_triggers_refresh_failure() {
        let cache = TokenCache::with_clock(
            Client::new(),
            "http://127.0.0.1:1/oauth/token".into(),
            "id".into(),
            "secret".into(),
            Arc::new(FixedClock(t(0))),
        );
        cache.seed("old-token", t(30)).await; // inside the buffer

        let err = cache.bearer_token("sentinel-hub").await.unwrap_err();
        assert!(matches!(err, AgroError::ProviderAuth { .. }));
    }
}
