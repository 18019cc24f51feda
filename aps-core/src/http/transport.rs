//! Wire-level transport.

use std::time::Duration;

use async_trait::async_trait;

use super::{HttpRequest, HttpResponse, TransportError};

/// Sends one request and returns whatever the server answered.
///
/// Implementations own timeouts and retries; the pipeline never retries.
/// Any status code, including failures, is a successful `send`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with reqwest's default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Use an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn classify(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Other {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| classify(url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(|e| classify(url, e))?;

        tracing::debug!("{} {} -> {}", request.method, url, status);

        Ok(HttpResponse {
            status,
            headers,
            body: body.to_vec(),
            url: final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reqwest_transport_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("x-test", "1"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/echo", server.uri())).unwrap();
        let mut request = HttpRequest::post(url).header_str("x-test", "1").unwrap();
        request.body = Some(b"payload".to_vec());

        let response = ReqwestTransport::new().send(&request).await.unwrap();
        assert_eq!(response.status.as_u16(), 201);
        assert_eq!(response.text(), "created");
    }

    #[tokio::test]
    async fn test_reqwest_transport_returns_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let response = ReqwestTransport::new().send(&HttpRequest::get(url)).await.unwrap();
        assert_eq!(response.status.as_u16(), 503);
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        // Port 9 (discard) is essentially never listening on loopback.
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let result = ReqwestTransport::new().send(&HttpRequest::get(url)).await;
        assert!(result.is_err());
    }
}
