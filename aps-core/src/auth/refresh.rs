//! Auto-refreshing token supplier.
//!
//! [`AutoRefreshingTokenProvider`] pairs a [`TokenSource`] (how to obtain a new
//! token) with a [`TokenStore`] (where the current one lives). Each call to
//! [`AccessTokenProvider::access_token`] returns the stored token while it is
//! valid and fetches a replacement otherwise.

use std::sync::Arc;

use async_trait::async_trait;

use super::AuthenticationClient;
use crate::error::ApsError;
use crate::store::{Secret, TokenStore};
use crate::token::{AccessTokenProvider, ExtendedToken, is_valid_token};

/// Something that can obtain a fresh token on demand.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Request a new token from the token endpoint.
    async fn fetch_token(&self) -> Result<ExtendedToken, ApsError>;
}

/// Client credentials grant for a fixed client and scope set.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    auth: AuthenticationClient,
    client_id: String,
    client_secret: Secret,
    scopes: Vec<String>,
}

impl ClientCredentials {
    /// Source that runs the client credentials grant through `auth`.
    pub fn new(
        auth: AuthenticationClient,
        client_id: impl Into<String>,
        client_secret: Secret,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            auth,
            client_id: client_id.into(),
            client_secret,
            scopes,
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn fetch_token(&self) -> Result<ExtendedToken, ApsError> {
        self.auth
            .exchange_client_credentials(&self.client_id, &self.client_secret, &self.scopes)
            .await
    }
}

/// Supplier that refreshes the stored token when it is no longer valid.
///
/// A token counts as valid while it has more than
/// [`TOKEN_EXPIRY_MARGIN_SECS`](crate::token::TOKEN_EXPIRY_MARGIN_SECS) left.
/// On a failed refresh the error is returned and the store is left untouched.
pub struct AutoRefreshingTokenProvider<S> {
    source: S,
    store: Arc<dyn TokenStore>,
}

impl<S: TokenSource> AutoRefreshingTokenProvider<S> {
    /// Create a provider over `source` and `store`.
    pub fn new(source: S, store: Arc<dyn TokenStore>) -> Self {
        Self { source, store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Current token, refreshing it first if needed.
    pub async fn token(&self) -> Result<ExtendedToken, ApsError> {
        if let Some(current) = self.store.get().filter(|t| is_valid_token(Some(t))) {
            tracing::debug!("Using cached access token (expires at {})", current.expires_at());
            return Ok(current);
        }

        tracing::info!("Access token missing or expiring, requesting a new one");

        match self.source.fetch_token().await {
            Ok(token) => {
                self.store.set(token.clone());
                tracing::debug!("Stored new access token (expires at {})", token.expires_at());
                Ok(token)
            }
            Err(e) => {
                tracing::error!("Failed to refresh access token: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl<S: TokenSource> AccessTokenProvider for AutoRefreshingTokenProvider<S> {
    async fn access_token(&self) -> Result<Secret, ApsError> {
        Ok(self.token().await?.access_token().clone())
    }
}

impl<S> std::fmt::Debug for AutoRefreshingTokenProvider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoRefreshingTokenProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTokenStore;
    use crate::token::{AccessToken, AuthError};
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<ExtendedToken, ApsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(AuthError::MissingAccessToken.into());
            }
            Ok(ExtendedToken::issued_now(AccessToken::new(format!("fresh-{}", n), 3600)))
        }
    }

    fn stored(value: &str, lifetime_secs: i64) -> Arc<InMemoryTokenStore> {
        Arc::new(InMemoryTokenStore::with_token(ExtendedToken::issued_at(
            AccessToken::new(value, lifetime_secs),
            Utc::now(),
        )))
    }

    #[tokio::test]
    async fn test_valid_token_is_reused() {
        let store = stored("cached", 3600);
        let provider = AutoRefreshingTokenProvider::new(CountingSource::new(false), store);

        assert_eq!(provider.access_token().await.unwrap().expose(), "cached");
        assert_eq!(provider.access_token().await.unwrap().expose(), "cached");
        assert_eq!(provider.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_store_fetches_and_stores() {
        let store = Arc::new(InMemoryTokenStore::new());
        let provider = AutoRefreshingTokenProvider::new(CountingSource::new(false), store.clone());

        assert_eq!(provider.access_token().await.unwrap().expose(), "fresh-1");
        assert_eq!(store.get().unwrap().access_token().expose(), "fresh-1");

        // Second call is served from the store.
        assert_eq!(provider.access_token().await.unwrap().expose(), "fresh-1");
        assert_eq!(provider.source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_inside_margin_is_refreshed() {
        let store = stored("stale", 5);
        let provider = AutoRefreshingTokenProvider::new(CountingSource::new(false), store.clone());

        assert_eq!(provider.access_token().await.unwrap().expose(), "fresh-1");
        assert!(store.get().unwrap().expires_at() > Utc::now() + Duration::seconds(3000));
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_store_untouched() {
        let store = stored("stale", 1);
        let provider = AutoRefreshingTokenProvider::new(CountingSource::new(true), store.clone());

        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, ApsError::Auth(AuthError::MissingAccessToken)));
        assert_eq!(store.get().unwrap().access_token().expose(), "stale");
    }
}
