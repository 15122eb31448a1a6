//! Log output for the courier crates
//!
//! The core crate only emits `tracing` events. This module installs a
//! subscriber for applications that do not already have one.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{fmt as fmt_layer, prelude::*, EnvFilter};

/// Minimum severity emitted by the courier crates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    /// Silence courier output entirely
    None,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::None => "off",
        }
    }

    /// Filter scoped to the courier crates
    pub fn filter(self) -> String {
        let level = self.as_directive();
        format!("courier_core={level},courier_adapters={level}")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::None => f.write_str("none"),
            other => f.write_str(other.as_directive()),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over `level` when set. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_logging(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter()));

    tracing_subscriber::registry()
        .with(fmt_layer::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}
