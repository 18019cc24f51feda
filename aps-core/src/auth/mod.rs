//! Authentication lifecycle for APS.
//!
//! This module provides:
//! - [`AuthenticationClient`] - Authorization URLs and every token grant
//! - [`AutoRefreshingTokenProvider`] - Reuses a stored token until it is about to expire
//! - [`ServiceAccountAuth`] - Three-legged tokens for a service account via a signed assertion
//! - [`PkcePair`] (with the `pkce` feature) - PKCE verifier/challenge generation
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), aps_core::ApsError> {
//! use std::sync::Arc;
//! use aps_core::auth::AuthenticationClient;
//! use aps_core::store::InMemoryTokenStore;
//! use aps_core::{AccessTokenProvider, Secret};
//!
//! let auth = AuthenticationClient::new();
//! let provider = auth.auto_refreshing(
//!     "client-id",
//!     Secret::new("client-secret"),
//!     vec!["data:read".to_string()],
//!     Arc::new(InMemoryTokenStore::new()),
//! );
//!
//! let token = provider.access_token().await?;
//! # Ok(())
//! # }
//! ```

mod refresh;
mod service_account;
mod url;

#[cfg(feature = "pkce")]
mod pkce;

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::endpoints::ApsEndpoints;
use crate::error::ApsError;
use crate::http::{HttpRequest, Pipeline, ReqwestTransport};
use crate::store::{Secret, TokenStore};
use crate::token::{AccessToken, AuthError, ExtendedToken};

pub use self::url::{
    AuthorizeOptions, authorization_url, basic_authorization, extract_authorization_code,
    pkce_authorization_url, scope_string,
};
pub use refresh::{AutoRefreshingTokenProvider, ClientCredentials, TokenSource};
pub use service_account::{
    ASSERTION_LIFETIME_SECS, AssertionClaims, AssertionSigner, ServiceAccountAuth,
    ServiceAccountKey,
};

#[cfg(feature = "pkce")]
pub use pkce::{PkcePair, generate_random_string};

/// `grant_type` values accepted by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    ClientCredentials,
    AuthorizationCode,
    RefreshToken,
    JwtBearer,
}

impl GrantType {
    /// Wire value of the grant.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::JwtBearer => "urn:ietf:params:oauth:grant-type:jwt-bearer",
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw token endpoint payload; every field may be missing.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default, alias = "tokenType")]
    token_type: Option<String>,
    #[serde(default, alias = "expiresIn")]
    expires_in: Option<i64>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(default, alias = "idToken")]
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<AccessToken, AuthError> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;

        let expires_in = match self.expires_in {
            Some(seconds) if seconds > 0 => seconds,
            other => return Err(AuthError::InvalidLifetime { expires_in: other }),
        };

        Ok(AccessToken {
            access_token: Secret::new(access_token),
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()).map(Secret::new),
            id_token: self.id_token.filter(|t| !t.is_empty()).map(Secret::new),
        })
    }
}

/// OpenID Connect profile of the user behind a three-legged token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub sub: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub preferred_username: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub profile: Option<String>,
    pub picture: Option<String>,
    pub locale: Option<String>,
    pub updated_at: Option<i64>,
}

/// How the client identifies itself to the token endpoint.
enum ClientAuth<'a> {
    /// Confidential client: `Authorization: Basic`.
    Basic(&'a str, &'a Secret),
    /// Public client: `client_id` in the form body.
    Public(&'a str),
}

impl<'a> ClientAuth<'a> {
    fn new(client_id: &'a str, client_secret: Option<&'a Secret>) -> Self {
        match client_secret {
            Some(secret) if !secret.is_empty() => Self::Basic(client_id, secret),
            _ => Self::Public(client_id),
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), AuthError> {
    if value.is_empty() {
        return Err(AuthError::EmptyCredential { field });
    }
    Ok(())
}

/// Client for the APS Authentication API.
///
/// Token requests go through an anonymous [`Pipeline`], so non-2xx answers
/// from the token endpoint surface as [`HttpRequestError`](crate::http::HttpRequestError)
/// and a 2xx answer without a usable token as [`AuthError`].
#[derive(Debug, Clone)]
pub struct AuthenticationClient {
    pipeline: Pipeline,
    endpoints: ApsEndpoints,
}

impl AuthenticationClient {
    /// Client for the production endpoints over a default transport.
    pub fn new() -> Self {
        Self::with_endpoints(ApsEndpoints::production())
    }

    /// Client for custom endpoints over a default transport.
    pub fn with_endpoints(endpoints: ApsEndpoints) -> Self {
        Self::with_pipeline(Pipeline::anonymous(Arc::new(ReqwestTransport::new())), endpoints)
    }

    /// Client over an existing pipeline.
    pub fn with_pipeline(pipeline: Pipeline, endpoints: ApsEndpoints) -> Self {
        Self {
            pipeline,
            endpoints,
        }
    }

    /// Endpoints in use.
    pub fn endpoints(&self) -> &ApsEndpoints {
        &self.endpoints
    }

    /// URL of the login page for the authorization code flow.
    pub fn build_authorization_url<S: AsRef<str>>(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[S],
        options: &AuthorizeOptions,
    ) -> String {
        authorization_url(&self.endpoints.authorize_url, client_id, redirect_uri, scopes, options)
    }

    /// URL of the login page for the authorization code flow with PKCE.
    pub fn build_pkce_authorization_url<S: AsRef<str>>(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[S],
        code_challenge: &str,
        options: &AuthorizeOptions,
    ) -> String {
        pkce_authorization_url(
            &self.endpoints.authorize_url,
            client_id,
            redirect_uri,
            scopes,
            code_challenge,
            options,
        )
    }

    /// Read the authorization code from the redirect URL.
    pub fn extract_authorization_code(&self, callback_url: &str) -> Option<String> {
        extract_authorization_code(callback_url)
    }

    /// Two-legged token through the client credentials grant.
    pub async fn exchange_client_credentials<S: AsRef<str>>(
        &self,
        client_id: &str,
        client_secret: &Secret,
        scopes: &[S],
    ) -> Result<ExtendedToken, ApsError> {
        require(client_id, "client_id")?;
        require(client_secret.expose(), "client_secret")?;

        let form = vec![("scope", scope_string(scopes))];
        self.request_token(
            GrantType::ClientCredentials,
            ClientAuth::Basic(client_id, client_secret),
            form,
        )
        .await
    }

    /// Fresh three-legged token from a refresh token.
    ///
    /// `scopes` may narrow the original grant; widening is rejected by the
    /// server, not here.
    pub async fn refresh_token<S: AsRef<str>>(
        &self,
        client_id: &str,
        client_secret: Option<&Secret>,
        refresh_token: &Secret,
        scopes: Option<&[S]>,
    ) -> Result<ExtendedToken, ApsError> {
        require(client_id, "client_id")?;
        require(refresh_token.expose(), "refresh_token")?;

        let mut form = vec![("refresh_token", refresh_token.expose().to_string())];
        if let Some(scopes) = scopes {
            form.push(("scope", scope_string(scopes)));
        }

        self.request_token(
            GrantType::RefreshToken,
            ClientAuth::new(client_id, client_secret),
            form,
        )
        .await
    }

    /// Three-legged token from the code returned to the redirect URI.
    ///
    /// Pass the PKCE verifier when the authorization URL carried a challenge.
    pub async fn exchange_authorization_code(
        &self,
        client_id: &str,
        client_secret: Option<&Secret>,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&Secret>,
    ) -> Result<ExtendedToken, ApsError> {
        require(client_id, "client_id")?;
        require(code, "code")?;

        let mut form = vec![
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier.expose().to_string()));
        }

        self.request_token(
            GrantType::AuthorizationCode,
            ClientAuth::new(client_id, client_secret),
            form,
        )
        .await
    }

    /// Three-legged token for a service account from a pre-signed JWT assertion.
    pub async fn exchange_service_account_assertion<S: AsRef<str>>(
        &self,
        client_id: &str,
        client_secret: Option<&Secret>,
        service_account_id: &str,
        signed_jwt: &Secret,
        scopes: &[S],
    ) -> Result<ExtendedToken, ApsError> {
        require(client_id, "client_id")?;
        require(service_account_id, "service_account_id")?;
        require(signed_jwt.expose(), "assertion")?;

        tracing::debug!("Exchanging assertion for service account {}", service_account_id);

        let form = vec![
            ("assertion", signed_jwt.expose().to_string()),
            ("scope", scope_string(scopes)),
        ];
        self.request_token(
            GrantType::JwtBearer,
            ClientAuth::new(client_id, client_secret),
            form,
        )
        .await
    }

    /// Token provider that reuses `store` until the token is about to expire,
    /// then runs the client credentials grant again.
    pub fn auto_refreshing(
        &self,
        client_id: impl Into<String>,
        client_secret: Secret,
        scopes: Vec<String>,
        store: Arc<dyn TokenStore>,
    ) -> AutoRefreshingTokenProvider<ClientCredentials> {
        let source = ClientCredentials::new(self.clone(), client_id, client_secret, scopes);
        AutoRefreshingTokenProvider::new(source, store)
    }

    /// Profile of the user behind a three-legged token.
    pub async fn user_info(&self, three_legged_token: &Secret) -> Result<UserInfo, ApsError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", three_legged_token.expose()))
            .map_err(|_| AuthError::InvalidHeaderValue)?;
        value.set_sensitive(true);

        let request = HttpRequest::get(self.endpoints.userinfo()?).header(AUTHORIZATION, value);

        self.pipeline
            .send_json(request)
            .await?
            .ok_or_else(|| ApsError::empty_response("user info"))
    }

    async fn request_token(
        &self,
        grant: GrantType,
        client: ClientAuth<'_>,
        mut form: Vec<(&'static str, String)>,
    ) -> Result<ExtendedToken, ApsError> {
        form.insert(0, ("grant_type", grant.as_str().to_string()));

        let mut request = HttpRequest::post(self.endpoints.token()?);
        let client_id = match client {
            ClientAuth::Basic(client_id, secret) => {
                let mut value = HeaderValue::from_str(basic_authorization(client_id, secret).expose())
                    .map_err(|_| AuthError::InvalidHeaderValue)?;
                value.set_sensitive(true);
                request = request.header(AUTHORIZATION, value);
                client_id
            }
            ClientAuth::Public(client_id) => {
                form.push(("client_id", client_id.to_string()));
                client_id
            }
        };
        let request = request.form(form);

        let issued_at = Utc::now();
        let response: Option<TokenResponse> = self.pipeline.send_json(request).await?;
        let token = response
            .ok_or(AuthError::MissingAccessToken)?
            .into_access_token()?;

        tracing::info!(
            "Obtained {} token for client {} (expires in {}s)",
            grant,
            client_id,
            token.expires_in
        );

        Ok(ExtendedToken::issued_at(token, issued_at))
    }
}

impl Default for AuthenticationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_wire_values() {
        assert_eq!(GrantType::ClientCredentials.as_str(), "client_credentials");
        assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
        assert_eq!(
            GrantType::JwtBearer.as_str(),
            "urn:ietf:params:oauth:grant-type:jwt-bearer"
        );
    }

    #[test]
    fn test_token_response_snake_and_camel_case() {
        let snake: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","token_type":"Bearer","expires_in":3599,"refresh_token":"r"}"#,
        )
        .unwrap();
        let token = snake.into_access_token().unwrap();
        assert_eq!(token.access_token.expose(), "a");
        assert_eq!(token.expires_in, 3599);
        assert_eq!(token.refresh_token.unwrap().expose(), "r");

        let camel: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"b","expiresIn":60}"#).unwrap();
        let token = camel.into_access_token().unwrap();
        assert_eq!(token.access_token.expose(), "b");
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_token_response_without_token() {
        let response: TokenResponse = serde_json::from_str(r#"{"expires_in":3600}"#).unwrap();
        assert!(matches!(
            response.into_access_token(),
            Err(AuthError::MissingAccessToken)
        ));

        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"","expires_in":3600}"#).unwrap();
        assert!(matches!(
            response.into_access_token(),
            Err(AuthError::MissingAccessToken)
        ));
    }

    #[test]
    fn test_token_response_invalid_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":0}"#).unwrap();
        assert!(matches!(
            response.into_access_token(),
            Err(AuthError::InvalidLifetime { expires_in: Some(0) })
        ));
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_request() {
        // Unroutable endpoint: any request would fail with a transport error.
        let auth = AuthenticationClient::with_endpoints(ApsEndpoints::with_base_url("http://127.0.0.1:9"));

        let err = auth
            .exchange_client_credentials("", &Secret::new("secret"), &["data:read"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApsError::Auth(AuthError::EmptyCredential { field: "client_id" })
        ));

        let err = auth
            .exchange_client_credentials("id", &Secret::new(""), &["data:read"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApsError::Auth(AuthError::EmptyCredential { field: "client_secret" })
        ));

        let err = auth
            .refresh_token::<&str>("id", None, &Secret::new(""), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApsError::Auth(AuthError::EmptyCredential { field: "refresh_token" })
        ));
    }

    #[test]
    fn test_build_urls_use_configured_authorize_endpoint() {
        let auth = AuthenticationClient::with_endpoints(ApsEndpoints::with_base_url("http://localhost:1"));
        let url = auth.build_authorization_url("cid", "http://cb", &["a"], &AuthorizeOptions::default());
        assert!(url.starts_with("http://localhost:1/authentication/v2/authorize?"));

        let url = auth.build_pkce_authorization_url("cid", "http://cb", &["a"], "ch", &AuthorizeOptions::default());
        assert!(url.contains("code_challenge=ch"));
    }
}
