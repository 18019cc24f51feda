use std::sync::Arc;
use std::time::Duration;

use aps_core::{AccessTokenProvider, ApsEndpoints, Pipeline, ReqwestTransport, Transport};
use tracing::debug;

use crate::Result;
use crate::account_admin::{AccountUsersManager, ProjectsManager};
use crate::data_connector::DataConnectorManager;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the cloud-hosted APS APIs.
///
/// Every manager shares one authenticated [`Pipeline`]: each request gets a
/// bearer token from the configured provider and non-2xx answers surface as
/// [`ApsError::Http`](aps_core::ApsError::Http).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use aps_client::ApsClient;
/// use aps_core::{AuthenticationClient, InMemoryTokenStore, Secret};
/// use futures::TryStreamExt;
///
/// #[tokio::main]
/// async fn main() -> aps_client::Result<()> {
///     let provider = AuthenticationClient::new().auto_refreshing(
///         "client-id",
///         Secret::new("client-secret"),
///         vec!["account:read".to_string()],
///         Arc::new(InMemoryTokenStore::new()),
///     );
///     let client = ApsClient::new(Arc::new(provider));
///
///     let projects: Vec<_> = client
///         .projects()
///         .list_projects("account-id", &Default::default())
///         .try_collect()
///         .await?;
///     println!("{} projects", projects.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApsClient {
    pipeline: Pipeline,
    endpoints: ApsEndpoints,
}

impl ApsClient {
    /// Client for the production endpoints.
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            pipeline: Pipeline::with_token_provider(provider),
            endpoints: ApsEndpoints::production(),
        }
    }

    /// Start building a client with custom settings.
    pub fn builder(provider: Arc<dyn AccessTokenProvider>) -> ApsClientBuilder {
        ApsClientBuilder::new(provider)
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

    /// The shared pipeline, for calls the managers do not cover.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Account Admin projects.
    pub fn projects(&self) -> ProjectsManager {
        ProjectsManager::new(self.pipeline.clone(), self.endpoints.api_base_url.clone())
    }

    /// Account Admin user directory.
    pub fn account_users(&self) -> AccountUsersManager {
        AccountUsersManager::new(self.pipeline.clone(), self.endpoints.api_base_url.clone())
    }

    /// Data Connector requests.
    pub fn data_connector(&self) -> DataConnectorManager {
        DataConnectorManager::new(self.pipeline.clone(), self.endpoints.api_base_url.clone())
    }
}

/// Builder for creating an [`ApsClient`] with custom configuration.
pub struct ApsClientBuilder {
    provider: Arc<dyn AccessTokenProvider>,
    endpoints: ApsEndpoints,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for ApsClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApsClientBuilder")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl ApsClientBuilder {
    /// Create a new builder with default settings.
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            provider,
            endpoints: ApsEndpoints::production(),
            timeout: DEFAULT_TIMEOUT,
            transport: None,
        }
    }

    /// Set the endpoints.
    pub fn endpoints(mut self, endpoints: ApsEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Serve every API from `base_url`.
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.endpoints = ApsEndpoints::with_base_url(base_url);
        self
    }

    /// Set the request timeout of the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom transport; the timeout setting is then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApsClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_timeout(self.timeout)?),
        };

        debug!("building APS client for {}", self.endpoints.api_base_url);

        Ok(ApsClient {
            pipeline: Pipeline::authenticated(transport, self.provider),
            endpoints: self.endpoints,
        })
    }
}
