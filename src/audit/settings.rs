//! Declarative audit settings.
//!
//! JSON-driven component selection, applied to a lifecycle adapter.

use crate::audit::config::Configuration;
use crate::audit::factory::{create_filter, create_handler, create_layout};
use crate::audit::filter::EventFilter;
use crate::audit::handler::HandlerType;
use crate::audit::handlers::memory::DEFAULT_MEMORY_CAPACITY;
use crate::audit::handlers::ConsoleTarget;
use crate::audit::layout::LayoutType;
use crate::audit::management::ManagementConfig;
use crate::core::Result;
use crate::integration::{AuditLifecycleAdapter, Startable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Audit settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Layout to format events with
    #[serde(default)]
    pub layout: LayoutType,
    /// Handlers, in dispatch order
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
    /// Filters, all of which must accept
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    /// Command string
    #[serde(default)]
    pub commands: Option<String>,
    /// Management config
    #[serde(default)]
    pub management: Option<ManagementConfig>,
    /// Free-form properties
    #[serde(default)]
    pub properties: Option<HashMap<String, String>>,
    /// Session attribute holding the actor
    #[serde(default)]
    pub actor_session_attribute_name: Option<String>,
}

/// Handler specification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerSpec {
    /// Console output
    Console {
        #[serde(default)]
        target: ConsoleTarget,
    },
    /// Append-only file
    File { path: PathBuf },
    /// Bounded memory buffer
    Memory {
        #[serde(default = "default_memory_capacity")]
        capacity: usize,
    },
}

fn default_memory_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY
}

impl HandlerSpec {
    /// Handler type this spec creates.
    pub fn handler_type(&self) -> HandlerType {
        match self {
            HandlerSpec::Console { .. } => HandlerType::Console,
            HandlerSpec::File { .. } => HandlerType::File,
            HandlerSpec::Memory { .. } => HandlerType::Memory,
        }
    }
}

/// Filter specification.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Suppress these actions
    DenyActions { actions: Vec<String> },
    /// Field-matching filter
    Match(EventFilter),
}

impl AuditSettings {
    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Populate an adapter's slots from these settings.
    pub fn apply_to<S>(&self, adapter: &mut AuditLifecycleAdapter<S>)
    where
        S: Startable<Config = Configuration>,
    {
        adapter.set_layout(create_layout(&self.layout));
        adapter.set_handlers(self.handlers.iter().map(create_handler).collect());
        adapter.set_filters(self.filters.iter().map(create_filter).collect());

        if let Some(commands) = &self.commands {
            adapter.set_commands(commands.clone());
        }
        if let Some(management) = &self.management {
            adapter.set_management(management.clone());
        }
        if let Some(properties) = &self.properties {
            adapter.set_properties(properties.clone());
        }
        if let Some(name) = &self.actor_session_attribute_name {
            adapter.set_actor_session_attribute_name(name.clone());
        }
    }
}
