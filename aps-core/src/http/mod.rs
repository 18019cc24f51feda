//! HTTP pipeline shared by every APS client.
//!
//! This module provides:
//! - [`HttpRequest`] / [`HttpResponse`] - The exchange passed through the pipeline
//! - [`RequestOptions`] - Per-call options, including the error-handling override
//! - [`Transport`] - The wire-level collaborator, with [`ReqwestTransport`] as default
//! - [`Pipeline`] - Ordered middleware around a transport
//! - [`ErrorHandlerMiddleware`] / [`BearerTokenMiddleware`] - The two standard middlewares
//!
//! Every exchange ends in one of three states: a 2xx response, an
//! [`HttpRequestError`] (non-2xx while error handling is enabled) or a
//! [`TransportError`] (no response at all).

mod middleware;
mod pipeline;
mod transport;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::error::ApsError;

pub use middleware::{BearerTokenMiddleware, ErrorHandlerMiddleware};
pub use pipeline::{Middleware, Pipeline, PipelineBuilder};
pub use transport::{ReqwestTransport, Transport};

/// Failure to obtain any response from the server.
///
/// Never wrapped into an [`HttpRequestError`]: there is no status to attach.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    /// The request did not complete in time.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Any other failure while sending or reading the body.
    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

/// A response with a status outside `200..300`, raised by the error middleware.
#[derive(Debug, Error)]
#[error("request to {url} failed with status code {}", .status.as_u16())]
pub struct HttpRequestError {
    status: StatusCode,
    url: String,
    request: Box<HttpRequest>,
    response: Box<HttpResponse>,
}

impl HttpRequestError {
    /// Capture the failed exchange.
    pub fn new(request: HttpRequest, response: HttpResponse) -> Self {
        Self {
            status: response.status,
            url: request.url.to_string(),
            request: Box::new(request),
            response: Box::new(response),
        }
    }

    /// Numeric status code of the failed response.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Status of the failed response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// URL the request was sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The request as it left the pipeline.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// The response as received from the transport.
    pub fn response(&self) -> &HttpResponse {
        &self.response
    }
}

/// Override for the error-handling middleware on a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorHandlerOptions {
    /// When `false`, non-2xx responses are returned as-is.
    pub enabled: bool,
}

impl Default for ErrorHandlerOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Options that travel with one request through the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Error-handling override; `None` means enabled.
    pub error_handler: Option<ErrorHandlerOptions>,
}

impl RequestOptions {
    /// Options that let non-2xx responses through uninterpreted.
    pub fn without_error_handling() -> Self {
        Self {
            error_handler: Some(ErrorHandlerOptions { enabled: false }),
        }
    }

    /// Whether non-2xx responses should be raised as errors for this call.
    pub fn error_handling_enabled(&self) -> bool {
        self.error_handler.unwrap_or_default().enabled
    }
}

/// An outbound request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub options: RequestOptions,
}

impl HttpRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` request.
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing any previous value.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a header from a string value, rejecting values that cannot be sent.
    pub fn header_str(self, name: &str, value: &str) -> Result<Self, ApsError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| ApsError::InvalidRequest {
                message: format!("invalid header name {}", name),
            })?;
        let value = HeaderValue::from_str(value).map_err(|_| ApsError::InvalidRequest {
            message: format!("invalid value for header {}", name),
        })?;
        Ok(self.header(header_name, value))
    }

    /// Append query pairs to the URL. No pairs leaves the URL untouched.
    pub fn query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            self.url.query_pairs_mut().extend_pairs(pairs);
        }
        self
    }

    /// Set a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApsError> {
        let bytes = serde_json::to_vec(body).map_err(|e| ApsError::InvalidRequest {
            message: format!("failed to encode request body: {}", e),
        })?;
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(bytes);
        Ok(self)
    }

    /// Set an `application/x-www-form-urlencoded` body.
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = Some(encoded.into_bytes());
        self
    }

    /// Replace the per-call options.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

// Bodies may carry refresh tokens or assertions, so only their size is shown.
impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body_len", &self.body.as_ref().map(Vec::len))
            .field("options", &self.options)
            .finish()
    }
}

/// A response as received from the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub url: Url,
}

impl HttpResponse {
    /// Whether the status is in `200..300`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode a JSON body.
    ///
    /// An empty body or a literal `null` yields `Ok(None)`; callers decide
    /// whether that is legitimate for their endpoint.
    pub fn json<T: DeserializeOwned>(&self) -> Result<Option<T>, ApsError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice::<Option<T>>(&self.body).map_err(|source| ApsError::Decode {
            url: self.url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://example.com/items").unwrap()
    }

    fn response(body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
            url: url(),
        }
    }

    #[test]
    fn test_error_handling_enabled_by_default() {
        assert!(RequestOptions::default().error_handling_enabled());
        assert!(!RequestOptions::without_error_handling().error_handling_enabled());
    }

    #[test]
    fn test_query_appends_pairs() {
        let request = HttpRequest::get(url()).query([("offset", "20"), ("limit", "20")]);
        assert_eq!(request.url.as_str(), "https://example.com/items?offset=20&limit=20");
    }

    #[test]
    fn test_empty_query_leaves_url_untouched() {
        let request = HttpRequest::get(url()).query(Vec::<(String, String)>::new());
        assert_eq!(request.url.as_str(), "https://example.com/items");
        assert_eq!(request.url.query(), None);
    }

    #[test]
    fn test_form_body_is_encoded() {
        let request = HttpRequest::post(url()).form([("grant_type", "client_credentials"), ("scope", "a b")]);
        let body = String::from_utf8(request.body.unwrap()).unwrap();
        assert_eq!(body, "grant_type=client_credentials&scope=a+b");
    }

    #[test]
    fn test_header_str_rejects_invalid_values() {
        let result = HttpRequest::get(url()).header_str("region", "bad\nvalue");
        assert!(matches!(result, Err(ApsError::InvalidRequest { .. })));
    }

    #[test]
    fn test_request_debug_hides_body() {
        let request = HttpRequest::post(url()).form([("refresh_token", "very-secret")]);
        let debug = format!("{:?}", request);
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_json_empty_and_null_bodies() {
        assert!(response("").json::<serde_json::Value>().unwrap().is_none());
        assert!(response("null").json::<serde_json::Value>().unwrap().is_none());
        assert!(response(r#"{"a":1}"#).json::<serde_json::Value>().unwrap().is_some());
    }

    #[test]
    fn test_json_decode_error() {
        let result = response("{not json").json::<serde_json::Value>();
        assert!(matches!(result, Err(ApsError::Decode { .. })));
    }
}
