//! Dispatcher configuration and validation

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Default header carrying the API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Dispatcher configuration, immutable once handed to a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Collection endpoint URL
    pub endpoint: String,

    /// API key sent with every batch
    pub api_key: String,

    /// Header name the API key is sent under (default: `X-API-Key`)
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Interval of the scheduled flush timer (default: 5000)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Maximum events per transport call (default: 10)
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Attempts per batch before it is requeued and persisted (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff tuning between retry attempts
    #[serde(default)]
    pub backoff: BackoffConfig,
}

/// Backoff tuning: `min(base * 2^(n-1) + jitter, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound (inclusive) of the uniformly random jitter
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

fn default_flush_interval_ms() -> u64 {
    5000
}

fn default_max_batch_size() -> usize {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_jitter_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Config {
    /// Create a config for the given endpoint and key with default tuning
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_key_header: default_api_key_header(),
            flush_interval_ms: default_flush_interval_ms(),
            max_batch_size: default_max_batch_size(),
            max_retries: default_max_retries(),
            backoff: BackoffConfig::default(),
        }
    }

    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    pub fn with_flush_interval_ms(mut self, interval_ms: u64) -> Self {
        self.flush_interval_ms = interval_ms;
        self
    }

    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Check the invariants the dispatcher relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }
        if self.api_key_header.trim().is_empty() {
            return Err(ConfigError::EmptyApiKeyHeader);
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::ZeroFlushInterval);
        }
        if self.backoff.max_delay_ms < self.backoff.base_delay_ms {
            return Err(ConfigError::BackoffCapBelowBase {
                base: self.backoff.base_delay_ms,
                max: self.backoff.max_delay_ms,
            });
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
