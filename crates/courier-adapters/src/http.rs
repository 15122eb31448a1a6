//! HTTP transport backed by reqwest
//!
//! Posts each batch as `{"events": [...]}`. Non-2xx answers are returned as
//! ordinary responses so the dispatcher can classify them; only failures of
//! the call itself become `TransportError`.

use async_trait::async_trait;
use courier_core::{BatchBody, Event, Transport, TransportError, TransportResponse};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Use a preconfigured reqwest client (proxies, TLS roots, ...)
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        events: &[Event],
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self.client.post(endpoint).json(&BatchBody::new(events));
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.ok().filter(|body| !body.is_empty());

        Ok(TransportResponse::new(status, body))
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_request() || error.is_body() || error.is_builder() {
        TransportError::Request(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}
