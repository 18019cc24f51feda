//! Token types and token suppliers.
//!
//! This module provides:
//! - [`AccessToken`] - A token as returned by the token endpoint
//! - [`ExtendedToken`] - An [`AccessToken`] with its absolute expiry
//! - [`is_valid_token`] - The validity predicate shared by every caller
//! - [`AccessTokenProvider`] - Trait for anything that can hand out a bearer token
//! - [`AuthError`] - Failures of the token lifecycle itself

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApsError;
use crate::store::Secret;

/// Tokens expiring within this many seconds are treated as already expired.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 10;

/// Error type for token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token endpoint answered 2xx but without an access token.
    #[error("token endpoint returned no access token")]
    MissingAccessToken,

    /// The token endpoint answered with a missing or non-positive lifetime.
    #[error("token endpoint returned an invalid lifetime: {expires_in:?}")]
    InvalidLifetime { expires_in: Option<i64> },

    /// A required credential argument was empty.
    #[error("required credential is empty: {field}")]
    EmptyCredential { field: &'static str },

    /// The service account assertion could not be signed.
    #[error("assertion signing failed: {message}")]
    SigningFailed { message: String },

    /// The token cannot be sent as a header value.
    #[error("token is not a valid header value")]
    InvalidHeaderValue,
}

/// A token as issued by the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    /// The bearer value.
    pub access_token: Secret,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// Lifetime in seconds, counted from issue time.
    pub expires_in: i64,

    /// Refresh token for three-legged grants.
    pub refresh_token: Option<Secret>,

    /// OpenID Connect identity token, when `openid` was requested.
    pub id_token: Option<Secret>,
}

impl AccessToken {
    /// Create a bearer token with the given lifetime.
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: Secret::new(access_token),
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Attach a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(Secret::new(refresh_token));
        self
    }
}

/// An [`AccessToken`] together with the instant it stops being usable.
///
/// `expires_at` is always derived from the issue time and `expires_in`; there
/// is deliberately no way to set it directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedToken {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl ExtendedToken {
    /// Stamp a freshly issued token with its absolute expiry.
    pub fn issued_at(token: AccessToken, issued_at: DateTime<Utc>) -> Self {
        let expires_at = issued_at + Duration::seconds(token.expires_in);
        Self { token, expires_at }
    }

    /// Stamp a token issued just now.
    pub fn issued_now(token: AccessToken) -> Self {
        Self::issued_at(token, Utc::now())
    }

    /// The bearer value.
    pub fn access_token(&self) -> &Secret {
        &self.token.access_token
    }

    /// The refresh token, if the grant returned one.
    pub fn refresh_token(&self) -> Option<&Secret> {
        self.token.refresh_token.as_ref()
    }

    /// When the token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// The underlying token as issued.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Whether the token is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS)
    }
}

/// Check if a token is present and expires more than 10 seconds from now.
pub fn is_valid_token(token: Option<&ExtendedToken>) -> bool {
    is_valid_token_at(token, Utc::now())
}

/// [`is_valid_token`] against an explicit clock.
pub fn is_valid_token_at(token: Option<&ExtendedToken>, now: DateTime<Utc>) -> bool {
    token.is_some_and(|t| t.is_valid_at(now))
}

/// Source of bearer tokens for outbound requests.
///
/// Called once per request by the bearer middleware; implementations decide
/// whether to reuse or refresh.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Get the bearer value to attach to the next request.
    async fn access_token(&self) -> Result<Secret, ApsError>;
}

/// A provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(Secret);

impl StaticTokenProvider {
    /// Wrap a fixed token value.
    pub fn new(token: impl Into<Secret>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<Secret, ApsError> {
        Ok(self.0.clone())
    }
}

/// Adapts an async closure into an [`AccessTokenProvider`].
///
/// ```rust
/// use aps_core::token::FnTokenProvider;
/// use aps_core::{ApsError, Secret};
///
/// let provider = FnTokenProvider::new(|| async { Ok::<_, ApsError>(Secret::new("token")) });
/// ```
pub struct FnTokenProvider<F> {
    supplier: F,
}

impl<F> FnTokenProvider<F> {
    /// Wrap a zero-argument async token supplier.
    pub fn new(supplier: F) -> Self {
        Self { supplier }
    }
}

#[async_trait]
impl<F, Fut> AccessTokenProvider for FnTokenProvider<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Secret, ApsError>> + Send,
{
    async fn access_token(&self) -> Result<Secret, ApsError> {
        (self.supplier)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(now: DateTime<Utc>, seconds: i64) -> ExtendedToken {
        ExtendedToken::issued_at(AccessToken::new("test", seconds), now)
    }

    #[test]
    fn test_expires_at_is_derived_from_lifetime() {
        let now = Utc::now();
        let token = token_expiring_in(now, 3600);
        assert_eq!(token.expires_at(), now + Duration::seconds(3600));
    }

    #[test]
    fn test_token_validity_threshold() {
        let now = Utc::now();

        assert!(is_valid_token_at(Some(&token_expiring_in(now, 11)), now));
        assert!(!is_valid_token_at(Some(&token_expiring_in(now, 9)), now));
        assert!(!is_valid_token_at(Some(&token_expiring_in(now, -1)), now));
        assert!(!is_valid_token_at(None, now));
    }

    #[test]
    fn test_validity_is_exclusive_at_margin() {
        let now = Utc::now();
        let token = token_expiring_in(now, TOKEN_EXPIRY_MARGIN_SECS);
        assert!(!token.is_valid_at(now));
    }

    #[test]
    fn test_long_lived_token_is_valid_now() {
        let token = ExtendedToken::issued_now(AccessToken::new("test", 3600));
        assert!(is_valid_token(Some(&token)));
    }

    #[tokio::test]
    async fn test_fn_token_provider() {
        let provider = FnTokenProvider::new(|| async { Ok(Secret::new("from-closure")) });
        let token = provider.access_token().await.unwrap();
        assert_eq!(token.expose(), "from-closure");
    }

    #[tokio::test]
    async fn test_static_token_provider() {
        let provider = StaticTokenProvider::new("fixed");
        assert_eq!(provider.access_token().await.unwrap().expose(), "fixed");
        assert_eq!(provider.access_token().await.unwrap().expose(), "fixed");
    }
}
