//! Network port used by `ApiClient`, plus the reqwest-backed adapter.
//!
//! The adapter owns transport details only: it turns an `HttpRequest` into a
//! single network call and hands back status, headers and body as data. HTTP
//! error statuses are not errors at this layer; only failures that produce
//! no response at all are.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations must not retry. Dropping the returned future should abort
/// the underlying request where the transport supports it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.path);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (key.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_transport_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_connect() {
        ApiError::Transport(format!(
            "Network error: Unable to connect to the backend server ({err})"
        ))
    } else {
        ApiError::Transport(err.to_string())
    }
}
