//! Ordered middleware pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::{
    BearerTokenMiddleware, ErrorHandlerMiddleware, HttpRequest, HttpResponse, ReqwestTransport,
    Transport,
};
use crate::error::ApsError;
use crate::token::AccessTokenProvider;

/// A request/response transformer in the [`Pipeline`].
///
/// Request hooks run in registration order before the transport is called;
/// response hooks run in reverse order afterwards. Either hook may
/// short-circuit the call by returning an error.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Adjust the outgoing request.
    async fn on_request(&self, _request: &mut HttpRequest) -> Result<(), ApsError> {
        Ok(())
    }

    /// Inspect or replace the incoming response.
    async fn on_response(
        &self,
        _request: &HttpRequest,
        response: HttpResponse,
    ) -> Result<HttpResponse, ApsError> {
        Ok(response)
    }
}

/// Middlewares around a [`Transport`], built once per client.
///
/// Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Start building a pipeline over `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            middlewares: Vec::new(),
            transport,
        }
    }

    /// Pipeline with error handling only, for unauthenticated endpoints.
    pub fn anonymous(transport: Arc<dyn Transport>) -> Self {
        Self::builder(transport)
            .with(ErrorHandlerMiddleware::new())
            .build()
    }

    /// Pipeline that attaches a bearer token and raises on non-2xx.
    pub fn authenticated(
        transport: Arc<dyn Transport>,
        provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self::builder(transport)
            .with(BearerTokenMiddleware::new(provider))
            .with(ErrorHandlerMiddleware::new())
            .build()
    }

    /// [`Pipeline::authenticated`] over a default [`ReqwestTransport`].
    pub fn with_token_provider(provider: Arc<dyn AccessTokenProvider>) -> Self {
        Self::authenticated(Arc::new(ReqwestTransport::new()), provider)
    }

    /// Number of middlewares in the pipeline.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the pipeline calls the transport directly.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Run the request through every middleware and the transport.
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, ApsError> {
        for middleware in &self.middlewares {
            middleware.on_request(&mut request).await?;
        }

        tracing::debug!("Sending {} {}", request.method, request.url);
        let mut response = self.transport.send(&request).await?;

        for middleware in self.middlewares.iter().rev() {
            response = middleware.on_response(&request, response).await?;
        }

        Ok(response)
    }

    /// Send the request and decode a JSON body.
    ///
    /// Returns `Ok(None)` for an empty or `null` body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<Option<T>, ApsError> {
        self.send(request).await?.json()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl PipelineBuilder {
    /// Append a middleware.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Append a shared middleware.
    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Finish the pipeline.
    pub fn build(self) -> Pipeline {
        Pipeline {
            middlewares: self.middlewares,
            transport: self.transport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use url::Url;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn on_request(&self, _request: &mut HttpRequest) -> Result<(), ApsError> {
            self.log.lock().push(format!("request:{}", self.name));
            Ok(())
        }

        async fn on_response(
            &self,
            _request: &HttpRequest,
            response: HttpResponse,
        ) -> Result<HttpResponse, ApsError> {
            self.log.lock().push(format!("response:{}", self.name));
            Ok(response)
        }
    }

    struct OkTransport {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for OkTransport {
        async fn send(
            &self,
            request: &HttpRequest,
        ) -> Result<HttpResponse, super::super::TransportError> {
            self.log.lock().push("transport".to_string());
            Ok(HttpResponse {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Vec::new(),
                url: request.url.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_middleware_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder(Arc::new(OkTransport { log: log.clone() }))
            .with(Recorder { name: "first", log: log.clone() })
            .with(Recorder { name: "second", log: log.clone() })
            .build();

        let url = Url::parse("https://example.com").unwrap();
        pipeline.send(HttpRequest::get(url)).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "request:first",
                "request:second",
                "transport",
                "response:second",
                "response:first",
            ]
        );
    }

    #[test]
    fn test_standard_pipelines() {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
        assert_eq!(Pipeline::anonymous(transport.clone()).len(), 1);

        let provider = Arc::new(crate::token::StaticTokenProvider::new("t"));
        assert_eq!(Pipeline::authenticated(transport, provider).len(), 2);
    }
}
