//! APS Client Library
//!
//! Resource managers for Autodesk Platform Services built on `aps-core`.
//! Each manager is a thin layer that binds an endpoint and its filters to one
//! of the core pagination engines and decodes the results.
//!
//! # Overview
//!
//! - **Account Admin**: projects and the account user directory (offset pages)
//! - **Data Connector**: extraction requests (offset pages)
//! - **Vault Data**: item versions (cursor pages) and Vault session tokens
//!
//! Listings are returned as streams. Pages are fetched only while the stream
//! is polled; dropping it stops all further requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use aps_client::{ApsClient, ListProjectsOptions};
//! use aps_core::token::StaticTokenProvider;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> aps_client::Result<()> {
//!     let client = ApsClient::new(Arc::new(StaticTokenProvider::new("two-legged-token")));
//!
//!     let mut projects = client
//!         .projects()
//!         .list_projects("account-id", &ListProjectsOptions::default());
//!
//!     while let Some(project) = projects.next().await {
//!         println!("{}", project?.id);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Vault
//!
//! ```no_run
//! use aps_client::vault::{VaultClient, VaultCredentials};
//! use aps_core::Secret;
//! use futures::TryStreamExt;
//!
//! # async fn example() -> aps_client::Result<()> {
//! let vault = VaultClient::with_user_account(
//!     "http://vault.local",
//!     VaultCredentials {
//!         vault: "Vault".to_string(),
//!         user_name: "Administrator".to_string(),
//!         password: Secret::new(""),
//!         app_code: None,
//!     },
//! );
//!
//! let versions: Vec<_> = vault
//!     .items()
//!     .list_item_versions("1", &Default::default())
//!     .try_collect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod account_admin;
pub mod data_connector;
pub mod types;
pub mod vault;

// Re-export main types from client module
pub use client::{ApsClient, ApsClientBuilder, DEFAULT_TIMEOUT};

// Re-export from other modules
pub use account_admin::{
    AccountUsersManager, ListProjectsOptions, ListUsersOptions, ProjectsManager, RequestContext,
};
pub use data_connector::DataConnectorManager;
pub use types::{AccountUser, DataRequest, ItemVersion, Project};
pub use vault::{
    ItemVersionsOptions, ItemsManager, VaultClient, VaultCredentials, VaultSessionTokenProvider,
};

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, aps_core::ApsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: ListProjectsOptions = ListProjectsOptions::default();
        let _: ItemVersionsOptions = ItemVersionsOptions::default();
        let _: RequestContext = RequestContext::default();
    }
}
