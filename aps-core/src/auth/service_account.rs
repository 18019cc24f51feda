//! Secure Service Account tokens.
//!
//! A service account obtains three-legged tokens without a browser: the client
//! signs a short-lived JWT assertion with the account's private key and trades
//! it at the token endpoint (`jwt-bearer` grant). Signing itself is delegated
//! to an [`AssertionSigner`] so any RS256 implementation can be plugged in.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthenticationClient, TokenSource};
use crate::error::ApsError;
use crate::store::Secret;
use crate::token::{AuthError, ExtendedToken};

/// Lifetime of a generated assertion.
pub const ASSERTION_LIFETIME_SECS: i64 = 300;

/// JWT claims of a service account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Service account id.
    pub sub: String,

    /// Client id of the application.
    pub iss: String,

    /// Token endpoint URL.
    pub aud: String,

    /// Requested scopes.
    pub scope: Vec<String>,

    /// Issued-at, seconds since the epoch.
    pub iat: i64,

    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Private key registered for a service account.
#[derive(Debug, Clone)]
pub struct ServiceAccountKey {
    /// Key id, sent as the JWT `kid` header.
    pub key_id: String,

    /// PKCS#8 PEM private key.
    pub private_key_pkcs8: Secret,
}

/// Produces a compact RS256 JWT from claims and a key.
pub trait AssertionSigner: Send + Sync {
    /// Sign `claims`, setting `kid` from `key.key_id`.
    fn sign(&self, claims: &AssertionClaims, key: &ServiceAccountKey) -> Result<Secret, AuthError>;
}

/// Token source for a Secure Service Account.
pub struct ServiceAccountAuth {
    auth: AuthenticationClient,
    client_id: String,
    client_secret: Option<Secret>,
    service_account_id: String,
    key: ServiceAccountKey,
    signer: Arc<dyn AssertionSigner>,
    scopes: Vec<String>,
}

impl ServiceAccountAuth {
    /// Create a source for `service_account_id`.
    pub fn new(
        auth: AuthenticationClient,
        client_id: impl Into<String>,
        client_secret: Option<Secret>,
        service_account_id: impl Into<String>,
        key: ServiceAccountKey,
        signer: Arc<dyn AssertionSigner>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            auth,
            client_id: client_id.into(),
            client_secret,
            service_account_id: service_account_id.into(),
            key,
            signer,
            scopes,
        }
    }

    /// Claims of an assertion issued at `now`.
    pub fn claims_at(&self, now: DateTime<Utc>) -> AssertionClaims {
        let iat = now.timestamp();
        AssertionClaims {
            sub: self.service_account_id.clone(),
            iss: self.client_id.clone(),
            aud: self.auth.endpoints().token_url.clone(),
            scope: self.scopes.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Sign a fresh assertion.
    pub fn assertion(&self) -> Result<Secret, AuthError> {
        let claims = self.claims_at(Utc::now());
        self.signer.sign(&claims, &self.key)
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn fetch_token(&self) -> Result<ExtendedToken, ApsError> {
        let assertion = self.assertion()?;
        self.auth
            .exchange_service_account_assertion(
                &self.client_id,
                self.client_secret.as_ref(),
                &self.service_account_id,
                &assertion,
                &self.scopes,
            )
            .await
    }
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_id", &self.client_id)
            .field("service_account_id", &self.service_account_id)
            .field("key_id", &self.key.key_id)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
