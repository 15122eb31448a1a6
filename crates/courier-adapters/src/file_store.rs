//! JSON file persistence for undelivered events

use async_trait::async_trait;
use courier_core::{Event, Store, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::get_courier_dir;

/// File name used inside the courier state directory
pub const DEFAULT_FILE_NAME: &str = "events.json";

/// Stores the backlog as a JSON array in a single file
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous backlog intact.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `~/.courier/events.json`
    pub fn in_default_location() -> anyhow::Result<Self> {
        Ok(Self::new(get_courier_dir()?.join(DEFAULT_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Store for FileStore {
    async fn save(&self, events: &[Event]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_vec(events)?;
        let temp = self.temp_path();
        fs::write(&temp, content).await?;
        fs::rename(&temp, &self.path).await?;
        debug!(count = events.len(), path = %self.path.display(), "saved event backlog");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Event>, StoreError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let events: Vec<Event> = serde_json::from_slice(&content)?;
        debug!(count = events.len(), path = %self.path.display(), "loaded event backlog");
        Ok(events)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
