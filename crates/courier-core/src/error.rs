//! Error types surfaced by the dispatcher and its collaborators

use thiserror::Error;

/// Errors raised synchronously by the public client API
///
/// Everything that happens on the background flush path is logged and
/// recovered locally; the only failure a caller can observe is using the
/// client out of lifecycle order.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("client must be initialized before tracking events; call init() first")]
    NotInitialized,
}

/// Genuine transport failure (timeout, DNS, connection reset)
///
/// Ordinary HTTP error codes are not errors: they are reported through
/// [`crate::transport::TransportResponse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Failure reported by a [`crate::store::Store`] implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored events could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Violation of a [`crate::config::Config`] invariant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint must not be empty")]
    EmptyEndpoint,

    #[error("api key header name must not be empty")]
    EmptyApiKeyHeader,

    #[error("max_batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("flush_interval_ms must be greater than 0")]
    ZeroFlushInterval,

    #[error("backoff max_delay_ms ({max}) must not be below base_delay_ms ({base})")]
    BackoffCapBelowBase { base: u64, max: u64 },
}
