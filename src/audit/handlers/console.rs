//! Console handler.

use crate::audit::event::AuditEvent;
use crate::audit::handler::Handler;
use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// Console stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Writes each formatted event as one line to the console.
#[derive(Clone, Debug, Default)]
pub struct ConsoleHandler {
    target: ConsoleTarget,
}

impl ConsoleHandler {
    /// Create a handler writing to `target`.
    pub fn new(target: ConsoleTarget) -> Self {
        Self { target }
    }

    /// Stream written to.
    pub fn target(&self) -> &ConsoleTarget {
        &self.target
    }
}

#[async_trait]
impl Handler for ConsoleHandler {
    fn name(&self) -> &str {
        "console"
    }

    async fn handle(&self, _event: &AuditEvent, formatted: &str) -> Result<()> {
        let mut line = String::with_capacity(formatted.len() + 1);
        line.push_str(formatted);
        line.push('\n');

        match self.target {
            ConsoleTarget::Stdout => {
                let mut out = tokio::io::stdout();
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
            ConsoleTarget::Stderr => {
                let mut out = tokio::io::stderr();
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
        }
        Ok(())
    }
}
