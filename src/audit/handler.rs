//! Handler trait definition.
//!
//! Core trait that all audit sinks must implement.

use crate::audit::event::AuditEvent;
use crate::core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Handler type identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerType {
    /// Standard output / error
    Console,
    /// Append-only file
    File,
    /// Bounded in-memory buffer
    Memory,
}

impl std::fmt::Display for HandlerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerType::Console => write!(f, "console"),
            HandlerType::File => write!(f, "file"),
            HandlerType::Memory => write!(f, "memory"),
        }
    }
}

/// An audit sink.
///
/// The manager calls `init` once at start, `handle` once per dispatched
/// event (in enqueue order), and `stop` once at shutdown.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handler name, used in logs and errors.
    fn name(&self) -> &str;

    /// Open resources.
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Persist or forward one event.
    ///
    /// `formatted` is the output of the configured layout.
    async fn handle(&self, event: &AuditEvent, formatted: &str) -> Result<()>;

    /// Release resources.
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
