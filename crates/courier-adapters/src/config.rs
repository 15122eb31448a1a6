//! Configuration loading
//!
//! Builds a [`Config`] from a TOML file, an optional local override file and
//! environment variables.

use anyhow::{anyhow, Context, Result};
use courier_core::{BackoffConfig, Config};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the override file looked up next to the main config file
pub const LOCAL_CONFIG_FILE: &str = "courier.local.toml";

/// Partially specified config; every layer may leave fields unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartialConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_key_header: Option<String>,
    pub flush_interval_ms: Option<u64>,
    pub max_batch_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub backoff: Option<BackoffConfig>,
}

impl PartialConfig {
    /// Overlay `other` on top of `self`; set fields in `other` win
    fn merge(&mut self, other: PartialConfig) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint;
        }
        if other.api_key.is_some() {
            self.api_key = other.api_key;
        }
        if other.api_key_header.is_some() {
            self.api_key_header = other.api_key_header;
        }
        if other.flush_interval_ms.is_some() {
            self.flush_interval_ms = other.flush_interval_ms;
        }
        if other.max_batch_size.is_some() {
            self.max_batch_size = other.max_batch_size;
        }
        if other.max_retries.is_some() {
            self.max_retries = other.max_retries;
        }
        if other.backoff.is_some() {
            self.backoff = other.backoff;
        }
    }

    /// Resolve into a validated config; endpoint and api key are required
    pub fn into_config(self) -> Result<Config> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| anyhow!("missing endpoint (set [courier].endpoint or COURIER_ENDPOINT)"))?;
        let api_key = self
            .api_key
            .ok_or_else(|| anyhow!("missing api key (set [courier].api_key or COURIER_API_KEY)"))?;

        let mut config = Config::new(endpoint, api_key);
        if let Some(header) = self.api_key_header {
            config = config.with_api_key_header(header);
        }
        if let Some(interval) = self.flush_interval_ms {
            config = config.with_flush_interval_ms(interval);
        }
        if let Some(size) = self.max_batch_size {
            config = config.with_max_batch_size(size);
        }
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }
        if let Some(backoff) = self.backoff {
            config = config.with_backoff(backoff);
        }

        config.validate().context("Invalid courier configuration")?;
        Ok(config)
    }
}

/// Load configuration with precedence:
/// 1. Environment variables (highest priority)
/// 2. Local override (`courier.local.toml` next to `path`)
/// 3. The config file at `path` (`[courier]` section)
/// 4. Defaults
///
/// Missing files are skipped; unreadable or malformed ones are errors.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut partial = PartialConfig::default();

    if path.exists() {
        partial.merge(load_config_from_file(path)?);
    }

    let local_config = path.with_file_name(LOCAL_CONFIG_FILE);
    if local_config.exists() {
        partial.merge(load_config_from_file(&local_config)?);
    }

    apply_env_overrides(&mut partial)?;

    partial.into_config()
}

/// Load the `[courier]` section of a TOML file
fn load_config_from_file(path: &Path) -> Result<PartialConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    #[derive(Deserialize)]
    struct FullConfig {
        #[serde(default)]
        courier: Option<PartialConfig>,
    }

    let full_config: FullConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;

    Ok(full_config.courier.unwrap_or_default())
}

/// Apply environment variable overrides
fn apply_env_overrides(config: &mut PartialConfig) -> Result<()> {
    if let Ok(endpoint) = env::var("COURIER_ENDPOINT") {
        config.endpoint = Some(endpoint);
    }
    if let Ok(api_key) = env::var("COURIER_API_KEY") {
        config.api_key = Some(api_key);
    }
    if let Ok(header) = env::var("COURIER_API_KEY_HEADER") {
        config.api_key_header = Some(header);
    }
    if let Some(interval) = parse_env("COURIER_FLUSH_INTERVAL_MS")? {
        config.flush_interval_ms = Some(interval);
    }
    if let Some(size) = parse_env("COURIER_MAX_BATCH_SIZE")? {
        config.max_batch_size = Some(size);
    }
    if let Some(retries) = parse_env("COURIER_MAX_RETRIES")? {
        config.max_retries = Some(retries);
    }
    Ok(())
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

/// Get the courier state directory (`~/.courier`), creating it if needed
pub fn get_courier_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().context("Could not determine home directory")?;
    let courier_dir = home_dir.join(".courier");
    fs::create_dir_all(&courier_dir)?;
    Ok(courier_dir)
}
