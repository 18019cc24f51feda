//! Authorization URL construction and callback parsing.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use crate::store::Secret;

/// Optional parameters of the authorization URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeOptions {
    /// OpenID Connect nonce; required when requesting `openid`.
    pub nonce: Option<String>,

    /// Opaque value echoed back to the redirect URI.
    pub state: Option<String>,

    /// Ignore any existing session and force the login page.
    pub force_login: bool,
}

impl AuthorizeOptions {
    /// Set the nonce.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Set the state.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Force the login page.
    pub fn with_force_login(mut self, force_login: bool) -> Self {
        self.force_login = force_login;
        self
    }
}

/// Join scopes with single spaces.
pub fn scope_string<S: AsRef<str>>(scopes: &[S]) -> String {
    scopes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Basic` authorization value for a client id/secret pair.
///
/// Both parts are form-encoded before being joined, as RFC 6749 §2.3.1 asks.
pub fn basic_authorization(client_id: &str, client_secret: &Secret) -> Secret {
    let id: String = url::form_urlencoded::byte_serialize(client_id.as_bytes()).collect();
    let secret: String =
        url::form_urlencoded::byte_serialize(client_secret.expose().as_bytes()).collect();
    Secret::new(format!("Basic {}", STANDARD.encode(format!("{}:{}", id, secret))))
}

/// Build the three-legged authorization URL.
///
/// `nonce` and `state` are appended only when non-empty, `prompt=login` only
/// when `force_login` is set.
pub fn authorization_url<S: AsRef<str>>(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[S],
    options: &AuthorizeOptions,
) -> String {
    let mut url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}",
        authorize_url,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scope_string(scopes)),
    );

    if let Some(nonce) = options.nonce.as_deref().filter(|n| !n.is_empty()) {
        url.push_str(&format!("&nonce={}", urlencoding::encode(nonce)));
    }

    if let Some(state) = options.state.as_deref().filter(|s| !s.is_empty()) {
        url.push_str(&format!("&state={}", urlencoding::encode(state)));
    }

    if options.force_login {
        url.push_str("&prompt=login");
    }

    url
}

/// [`authorization_url`] plus an S256 PKCE challenge.
pub fn pkce_authorization_url<S: AsRef<str>>(
    authorize_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scopes: &[S],
    code_challenge: &str,
    options: &AuthorizeOptions,
) -> String {
    let mut url = authorization_url(authorize_url, client_id, redirect_uri, scopes, options);
    url.push_str(&format!(
        "&code_challenge={}&code_challenge_method=S256",
        urlencoding::encode(code_challenge)
    ));
    url
}

/// Read the `code` parameter from the redirect URL.
///
/// Returns `None` when the URL has no `code`, an empty one, or cannot be
/// parsed at all.
pub fn extract_authorization_code(callback_url: &str) -> Option<String> {
    let base = Url::parse("http://localhost/").ok()?;
    let url = Url::options().base_url(Some(&base)).parse(callback_url).ok()?;

    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
