//! File handler implementation.
//!
//! Appends one formatted event per line.

use crate::audit::event::AuditEvent;
use crate::audit::handler::Handler;
use crate::core::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only file sink.
pub struct FileHandler {
    /// Output path
    path: PathBuf,
    /// Open file, present between `init` and `stop`
    file: Mutex<Option<tokio::fs::File>>,
}

impl FileHandler {
    /// Create a handler writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Handler for FileHandler {
    fn name(&self) -> &str {
        "file"
    }

    async fn init(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        *self.file.lock().await = Some(file);
        tracing::debug!(path = %self.path.display(), "file handler opened");
        Ok(())
    }

    async fn handle(&self, _event: &AuditEvent, formatted: &str) -> Result<()> {
        let mut guard = self.file.lock().await;
        let file = guard
            .as_mut()
            .ok_or_else(|| Error::handler(self.name(), "file not open"))?;

        file.write_all(formatted.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        if let Some(mut file) = self.file.lock().await.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}
