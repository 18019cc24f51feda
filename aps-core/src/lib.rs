//! # APS Core
//!
//! Core library of the Autodesk Platform Services SDK.
//!
//! This crate provides:
//! - Lazy offset and cursor pagination over list endpoints
//! - The authentication lifecycle: authorization URLs, token grants and an
//!   auto-refreshing token supplier over a pluggable [`TokenStore`]
//! - An ordered HTTP pipeline with bearer token injection and error mapping
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aps_core::{AuthenticationClient, InMemoryTokenStore, Pipeline, Secret};
//!
//! # async fn example() -> Result<(), aps_core::ApsError> {
//! let auth = AuthenticationClient::new();
//! let provider = auth.auto_refreshing(
//!     "client-id",
//!     Secret::new("client-secret"),
//!     vec!["account:read".to_string()],
//!     Arc::new(InMemoryTokenStore::new()),
//! );
//!
//! // Requests sent through this pipeline carry a fresh bearer token and fail
//! // with `ApsError::Http` on non-2xx answers.
//! let pipeline = Pipeline::with_token_provider(Arc::new(provider));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod pagination;
pub mod store;
pub mod token;

// Re-export commonly used types at crate root
pub use auth::{
    AuthenticationClient,
    AuthorizeOptions,
    AutoRefreshingTokenProvider,
    TokenSource,
    UserInfo,
};

#[cfg(feature = "pkce")]
pub use auth::PkcePair;

pub use endpoints::ApsEndpoints;

pub use error::ApsError;

pub use http::{
    HttpRequest,
    HttpRequestError,
    HttpResponse,
    Pipeline,
    RequestOptions,
    ReqwestTransport,
    Transport,
    TransportError,
};

pub use pagination::{
    CursorPage,
    CursorPaginator,
    OffsetPaginator,
};

pub use store::{
    InMemoryTokenStore,
    Secret,
    TokenStore,
};

pub use token::{
    AccessToken,
    AccessTokenProvider,
    AuthError,
    ExtendedToken,
    is_valid_token,
};
