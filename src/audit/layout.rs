//! Output layouts.
//!
//! A layout turns an [`AuditEvent`] into the text handed to handlers.

use crate::audit::event::AuditEvent;
use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Formatting strategy for audit events.
pub trait Layout: Send + Sync {
    /// Format an event.
    fn format(&self, event: &AuditEvent) -> Result<String>;

    /// Prepare the layout before the first event.
    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Layout type identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    /// Single-line pipe-separated text
    #[default]
    Simple,
    /// Compact JSON
    Json,
    /// Indented JSON
    PrettyJson,
}

impl std::fmt::Display for LayoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutType::Simple => write!(f, "simple"),
            LayoutType::Json => write!(f, "json"),
            LayoutType::PrettyJson => write!(f, "pretty_json"),
        }
    }
}

/// Pipe-separated single line:
/// `timestamp|id|actor|origin|action|name:value,name:value`.
#[derive(Clone, Debug, Default)]
pub struct SimpleLayout;

impl SimpleLayout {
    /// Create a new simple layout.
    pub fn new() -> Self {
        Self
    }
}

impl Layout for SimpleLayout {
    fn format(&self, event: &AuditEvent) -> Result<String> {
        let fields = event
            .fields
            .iter()
            .map(|f| match &f.value {
                serde_json::Value::String(s) => format!("{}:{}", f.name, s),
                other => format!("{}:{}", f.name, other),
            })
            .collect::<Vec<_>>()
            .join(",");

        Ok(format!(
            "{}|{}|{}|{}|{}|{}",
            event.timestamp.to_rfc3339(),
            event.id,
            event.actor.as_deref().unwrap_or("-"),
            event.origin.as_deref().unwrap_or("-"),
            event.action,
            fields
        ))
    }
}

/// JSON layout.
#[derive(Clone, Debug, Default)]
pub struct JsonLayout {
    pretty: bool,
}

impl JsonLayout {
    /// Compact JSON.
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON.
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Layout for JsonLayout {
    fn format(&self, event: &AuditEvent) -> Result<String> {
        let out = if self.pretty {
            serde_json::to_string_pretty(event)
        } else {
            serde_json::to_string(event)
        };
        out.map_err(|e| Error::Layout(format!("event {}: {}", event.id, e)))
    }
}
