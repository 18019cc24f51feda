//! Vault Data API: items and session tokens.
//!
//! Vault servers are self-hosted, so every client is bound to one server base
//! URL such as `http://vault.local`. The REST API lives under
//! [`VAULT_API_PATH`] on that server.

use std::sync::Arc;

use aps_core::endpoints::resource_url;
use aps_core::pagination::{CURSOR_STATE_PARAM, CursorEnvelope, CursorPage, CursorPaginator};
use aps_core::{
    AccessTokenProvider, ApsError, AuthError, HttpRequest, Pipeline, ReqwestTransport, Secret,
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::ItemVersion;

/// Path of the Vault Data API on a Vault server.
pub const VAULT_API_PATH: &str = "/AutodeskDM/Services/api/vault/v2";

/// Base URL of the Vault Data API on `server_base_url`.
pub fn vault_api_base(server_base_url: &str) -> String {
    format!("{}{}", server_base_url.trim_end_matches('/'), VAULT_API_PATH)
}

/// Client for one Vault server.
#[derive(Debug, Clone)]
pub struct VaultClient {
    pipeline: Pipeline,
    api_base: String,
}

impl VaultClient {
    /// Client for `server_base_url` whose requests carry tokens from `provider`.
    pub fn new(server_base_url: &str, provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_pipeline(
            server_base_url,
            Pipeline::authenticated(Arc::new(ReqwestTransport::new()), provider),
        )
    }

    /// Client over an existing pipeline.
    pub fn with_pipeline(server_base_url: &str, pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            api_base: vault_api_base(server_base_url),
        }
    }

    /// Client that signs in as a Vault user.
    ///
    /// A session is opened for every request; see [`VaultSessionTokenProvider`].
    pub fn with_user_account(
        server_base_url: &str,
        credentials: VaultCredentials,
    ) -> Self {
        let provider = VaultSessionTokenProvider::new(server_base_url, credentials);
        Self::new(server_base_url, Arc::new(provider))
    }

    /// Items and item versions.
    pub fn items(&self) -> ItemsManager {
        ItemsManager {
            pipeline: self.pipeline.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

/// Query options of [`ItemsManager::list_item_versions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemVersionsOptions {
    /// Search text.
    pub q: Option<String>,

    /// Sort order, e.g. `Revision desc`.
    pub sort: Option<String>,

    /// Only the latest version of each item.
    pub latest_only: Option<bool>,

    /// Only released items.
    pub released_items_only: Option<bool>,

    /// Page size requested from the server.
    pub limit: Option<usize>,
}

impl ItemVersionsOptions {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(latest_only) = self.latest_only {
            pairs.push(("option[latestOnly]", latest_only.to_string()));
        }
        if let Some(released) = self.released_items_only {
            pairs.push(("option[releasedItemsOnly]", released.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Manager for Vault items.
#[derive(Debug, Clone)]
pub struct ItemsManager {
    pipeline: Pipeline,
    api_base: String,
}

impl ItemsManager {
    /// Every item version of `vault_id` matching `options`.
    pub fn list_item_versions(
        &self,
        vault_id: &str,
        options: &ItemVersionsOptions,
    ) -> BoxStream<'static, Result<ItemVersion>> {
        let manager = self.clone();
        let vault_id = vault_id.to_string();
        let options = options.clone();

        CursorPaginator::new(move |cursor: String| {
            let manager = manager.clone();
            let vault_id = vault_id.clone();
            let options = options.clone();
            async move { manager.item_versions_page(&vault_id, &options, &cursor).await }
        })
        .into_stream()
        .boxed()
    }

    /// One page of item versions; `cursor` is empty for the first page.
    pub async fn item_versions_page(
        &self,
        vault_id: &str,
        options: &ItemVersionsOptions,
        cursor: &str,
    ) -> Result<CursorPage<ItemVersion>> {
        let url = resource_url(&self.api_base, &["vaults", vault_id, "item-versions"])?;
        let mut request = HttpRequest::get(url).query(options.query_pairs());
        if !cursor.is_empty() {
            request = request.query([(CURSOR_STATE_PARAM, cursor)]);
        }

        let envelope: Option<CursorEnvelope<ItemVersion>> =
            self.pipeline.send_json(request).await?;
        envelope
            .and_then(CursorEnvelope::into_page)
            .ok_or_else(|| ApsError::empty_response("list item versions"))
    }

    /// A single item version.
    pub async fn get_item_version(&self, vault_id: &str, item_version_id: &str) -> Result<ItemVersion> {
        let url = resource_url(
            &self.api_base,
            &["vaults", vault_id, "item-versions", item_version_id],
        )?;

        self.pipeline
            .send_json(HttpRequest::get(url))
            .await?
            .ok_or_else(|| ApsError::empty_response("get item version"))
    }
}

/// Sign-in details of a Vault user.
#[derive(Debug, Clone)]
pub struct VaultCredentials {
    pub vault: String,
    pub user_name: String,
    pub password: Secret,

    /// Free-form application code recorded in the server logs.
    pub app_code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionInput<'a> {
    vault: &'a str,
    user_name: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_code: Option<&'a str>,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    input: SessionInput<'a>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Token provider that opens a Vault session for each token request.
pub struct VaultSessionTokenProvider {
    pipeline: Pipeline,
    api_base: String,
    credentials: VaultCredentials,
}

impl VaultSessionTokenProvider {
    /// Provider for `server_base_url` over a default transport.
    pub fn new(server_base_url: &str, credentials: VaultCredentials) -> Self {
        Self::with_pipeline(
            server_base_url,
            credentials,
            Pipeline::anonymous(Arc::new(ReqwestTransport::new())),
        )
    }

    /// Provider over an existing (unauthenticated) pipeline.
    pub fn with_pipeline(server_base_url: &str, credentials: VaultCredentials, pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            api_base: vault_api_base(server_base_url),
            credentials,
        }
    }
}

#[async_trait]
impl AccessTokenProvider for VaultSessionTokenProvider {
    async fn access_token(&self) -> Result<Secret> {
        let url = resource_url(&self.api_base, &["sessions"])?;
        let body = SessionRequest {
            input: SessionInput {
                vault: &self.credentials.vault,
                user_name: &self.credentials.user_name,
                password: self.credentials.password.expose(),
                app_code: self.credentials.app_code.as_deref(),
            },
        };
        let request = HttpRequest::post(url).json(&body)?;

        tracing::debug!(
            "Opening Vault session on {} for {}",
            self.credentials.vault,
            self.credentials.user_name
        );

        let response: Option<SessionResponse> = self.pipeline.send_json(request).await?;
        let token = response
            .and_then(|r| r.access_token)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;

        Ok(Secret::new(token))
    }
}

impl std::fmt::Debug for VaultSessionTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSessionTokenProvider")
            .field("api_base", &self.api_base)
            .field("vault", &self.credentials.vault)
            .field("user_name", &self.credentials.user_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_api_base() {
        assert_eq!(
            vault_api_base("http://vault.local/"),
            "http://vault.local/AutodeskDM/Services/api/vault/v2"
        );
    }

    #[test]
    fn test_item_versions_query_pairs() {
        let options = ItemVersionsOptions {
            q: Some("bracket".to_string()),
            latest_only: Some(true),
            limit: Some(50),
            ..Default::default()
        };

        assert_eq!(
            options.query_pairs(),
            vec![
                ("q", "bracket".to_string()),
                ("option[latestOnly]", "true".to_string()),
                ("limit", "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_session_request_body() {
        let body = SessionRequest {
            input: SessionInput {
                vault: "Vault",
                user_name: "admin",
                password: "",
                app_code: None,
            },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "input": { "vault": "Vault", "userName": "admin", "password": "" } })
        );
    }
}
