//! Transport collaborator contract
//!
//! The dispatcher never performs network I/O itself; it hands each batch to
//! a [`Transport`] and classifies what comes back.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::Config;
use crate::error::TransportError;
use crate::event::Event;

/// Response of one transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub ok: bool,
    pub status: u16,
    pub body: Option<String>,
}

impl TransportResponse {
    /// Build a response, deriving `ok` from a 2xx status
    pub fn new(status: u16, body: Option<String>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            body,
        }
    }
}

/// Sends a batch of events to the collection endpoint
///
/// Implementations must not return `Err` for ordinary HTTP error codes;
/// those belong in [`TransportResponse`]. `Err` means the call itself failed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &str,
        events: &[Event],
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Wire body: `{"events": [...]}`
#[derive(Debug, Serialize)]
pub struct BatchBody<'a> {
    pub events: &'a [Event],
}

impl<'a> BatchBody<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self { events }
    }
}

/// Headers sent with every batch: the API key under the configured name
pub fn batch_headers(config: &Config) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(config.api_key_header.clone(), config.api_key.clone());
    headers
}
