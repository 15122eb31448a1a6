//! # courier adapters
//!
//! Concrete collaborators for `courier-core`:
//!
//! - [`HttpTransport`]: posts batches with reqwest
//! - [`FileStore`]: keeps the undelivered backlog in `~/.courier/events.json`
//! - [`SystemProbe`] / [`ServerProbe`]: platform facts for outgoing events
//! - [`load_config`]: TOML file plus `COURIER_*` environment overrides
//! - [`init_logging`]: a `tracing` subscriber for applications without one
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! let config = courier_adapters::load_config(std::path::Path::new("courier.toml"))?;
//! let client = courier_adapters::default_client(config)?;
//! client.init().await?;
//! client.track("app_started", None, None)?;
//! client.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod file_store;
pub mod http;
pub mod logging;
pub mod probe;

pub use config::{get_courier_dir, load_config, PartialConfig, LOCAL_CONFIG_FILE};
pub use file_store::{FileStore, DEFAULT_FILE_NAME};
pub use http::{HttpTransport, DEFAULT_TIMEOUT};
pub use logging::{init_logging, LogLevel};
pub use probe::{ServerProbe, SystemProbe};

use courier_core::{Client, Config};
use std::sync::Arc;

/// Re-export common types
pub type Result<T> = anyhow::Result<T>;

/// Client wired with the HTTP transport, the default file store and the
/// native system probe
pub fn default_client(config: Config) -> Result<Client> {
    let store = FileStore::in_default_location()?;
    let client = Client::builder(config, Arc::new(HttpTransport::new()))
        .store(Arc::new(store))
        .probe(Arc::new(SystemProbe::new()))
        .build()?;
    Ok(client)
}
