//! Standard middlewares: bearer token injection and error translation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use super::{HttpRequest, HttpRequestError, HttpResponse, Middleware};
use crate::error::ApsError;
use crate::token::{AccessTokenProvider, AuthError};

/// Raises [`HttpRequestError`] for any response outside `200..300`.
///
/// Calls that set [`RequestOptions::without_error_handling`](super::RequestOptions::without_error_handling)
/// receive the raw response instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorHandlerMiddleware;

impl ErrorHandlerMiddleware {
    /// Create the middleware.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for ErrorHandlerMiddleware {
    async fn on_response(
        &self,
        request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, ApsError> {
        if response.is_success() || !request.options.error_handling_enabled() {
            return Ok(response);
        }

        tracing::warn!(
            "Request to {} failed with status code {}",
            request.url,
            response.status.as_u16()
        );

        Err(HttpRequestError::new(request.clone(), response).into())
    }
}

/// Attaches `Authorization: Bearer <token>` to every request.
///
/// The provider is asked once per request; nothing is cached here.
#[derive(Clone)]
pub struct BearerTokenMiddleware {
    provider: Arc<dyn AccessTokenProvider>,
}

impl BearerTokenMiddleware {
    /// Wrap a token provider.
    pub fn new(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Middleware for BearerTokenMiddleware {
    async fn on_request(&self, request: &mut HttpRequest) -> Result<(), ApsError> {
        let token = self.provider.access_token().await?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| AuthError::InvalidHeaderValue)?;
        value.set_sensitive(true);

        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}
