//! APS endpoint configuration.
//!
//! [`ApsEndpoints`] gathers the URLs the SDK talks to. The defaults point at
//! production; tests and private deployments swap the base URL.
//!
//! ```
//! use aps_core::endpoints::ApsEndpoints;
//!
//! let endpoints = ApsEndpoints::with_base_url("http://localhost:8080");
//! assert_eq!(endpoints.token_url, "http://localhost:8080/authentication/v2/token");
//! ```

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApsError;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";

/// Production OpenID Connect user info endpoint.
pub const DEFAULT_USERINFO_URL: &str = "https://api.userprofile.autodesk.com/userinfo";

const AUTHORIZE_PATH: &str = "/authentication/v2/authorize";
const TOKEN_PATH: &str = "/authentication/v2/token";

/// URLs used by the SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApsEndpoints {
    /// Browser-facing authorization endpoint.
    pub authorize_url: String,

    /// Token endpoint for every grant.
    pub token_url: String,

    /// User info endpoint for three-legged tokens.
    pub userinfo_url: String,

    /// Base URL for the REST APIs.
    pub api_base_url: String,
}

impl ApsEndpoints {
    /// Production endpoints.
    pub fn production() -> Self {
        Self {
            authorize_url: format!("{}{}", DEFAULT_BASE_URL, AUTHORIZE_PATH),
            token_url: format!("{}{}", DEFAULT_BASE_URL, TOKEN_PATH),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Every endpoint, including user info, served from `base_url`.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Self {
        let base = base_url.as_ref().trim_end_matches('/');
        Self {
            authorize_url: format!("{}{}", base, AUTHORIZE_PATH),
            token_url: format!("{}{}", base, TOKEN_PATH),
            userinfo_url: format!("{}/userinfo", base),
            api_base_url: base.to_string(),
        }
    }

    /// Override the user info endpoint.
    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// Parsed token endpoint.
    pub fn token(&self) -> Result<Url, ApsError> {
        parse(&self.token_url)
    }

    /// Parsed user info endpoint.
    pub fn userinfo(&self) -> Result<Url, ApsError> {
        parse(&self.userinfo_url)
    }

    /// Append `segments` to the API base URL, escaping each one.
    pub fn resource_url(&self, segments: &[&str]) -> Result<Url, ApsError> {
        resource_url(&self.api_base_url, segments)
    }
}

impl Default for ApsEndpoints {
    fn default() -> Self {
        Self::production()
    }
}

/// Append `segments` to `base_url` as individual path segments.
///
/// Reserved characters in a segment (`/`, `?`, `#`, `%`) are percent-encoded,
/// so caller-supplied ids can never leave their segment.
pub fn resource_url(base_url: &str, segments: &[&str]) -> Result<Url, ApsError> {
    let mut url = parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| ApsError::Config {
            message: format!("URL {:?} cannot have path segments", base_url),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn parse(url: &str) -> Result<Url, ApsError> {
    Url::parse(url).map_err(|e| ApsError::Config {
        message: format!("invalid URL {:?}: {}", url, e),
    })
}
