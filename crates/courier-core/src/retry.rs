//! Retry policy and exponential backoff with jitter
//!
//! Given the 1-based attempt number and the classified outcome of a
//! transport call, decides whether the batch is done, dropped, retried after
//! a delay, or given up on.

use rand::Rng;
use std::time::Duration;

use crate::config::{BackoffConfig, Config};
use crate::error::TransportError;
use crate::transport::TransportResponse;

/// Classification of one transport call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// 4xx: the collector rejected the batch
    ClientError,
    /// Any other non-ok status
    ServerError,
    /// The call itself failed (timeout, DNS, reset)
    TransportError,
}

impl Outcome {
    pub fn classify(result: &Result<TransportResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.ok => Outcome::Success,
            Ok(response) if (400..500).contains(&response.status) => Outcome::ClientError,
            Ok(_) => Outcome::ServerError,
            Err(_) => Outcome::TransportError,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Outcome::ServerError | Outcome::TransportError)
    }
}

/// What to do with a batch after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sent; move on to the next batch
    Delivered,
    /// Rejected by the collector; discard without retrying
    Drop,
    /// Sleep for `delay`, then send the same batch again
    Retry { delay: Duration },
    /// Attempts exhausted; requeue at the front and persist
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: BackoffConfig,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_retries, config.backoff)
    }

    /// Total attempts a batch gets; the first attempt is never skipped
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Decide using a uniformly random jitter in `[0, max_jitter_ms]`
    pub fn decide(&self, attempt: u32, outcome: Outcome) -> RetryDecision {
        let jitter_ms = if self.backoff.max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.backoff.max_jitter_ms)
        };
        self.decide_with_jitter(attempt, outcome, jitter_ms)
    }

    /// Deterministic form of [`RetryPolicy::decide`]
    pub fn decide_with_jitter(&self, attempt: u32, outcome: Outcome, jitter_ms: u64) -> RetryDecision {
        match outcome {
            Outcome::Success => RetryDecision::Delivered,
            Outcome::ClientError => RetryDecision::Drop,
            Outcome::ServerError | Outcome::TransportError => {
                if attempt < self.max_attempts() {
                    RetryDecision::Retry {
                        delay: self.delay_for(attempt, jitter_ms),
                    }
                } else {
                    RetryDecision::GiveUp
                }
            }
        }
    }

    /// `min(base * 2^(attempt-1) + jitter, cap)`
    pub fn delay_for(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let exponential = self
            .backoff
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(exponent));
        let delay_ms = exponential
            .saturating_add(jitter_ms)
            .min(self.backoff.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}
