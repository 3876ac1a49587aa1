//! Audit configuration.
//!
//! The value a lifecycle adapter assembles and hands to the manager.
//! Every slot is optional and passed through unchanged.

use crate::audit::filter::AuditEventFilter;
use crate::audit::handler::Handler;
use crate::audit::layout::Layout;
use crate::audit::management::ManagementConfig;
use crate::audit::metadata::MetaData;
use crate::core::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Property holding the dispatch queue capacity.
pub const QUEUE_CAPACITY_PROPERTY: &str = "dispatch.queue_capacity";

/// Default dispatch queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Largest accepted dispatch queue capacity.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Audit configuration.
#[derive(Clone, Default)]
pub struct Configuration {
    layout: Option<Arc<dyn Layout>>,
    handlers: Option<Vec<Arc<dyn Handler>>>,
    meta_data: Option<Arc<dyn MetaData>>,
    filters: Option<Vec<Arc<dyn AuditEventFilter>>>,
    commands: Option<String>,
    management: Option<ManagementConfig>,
    properties: Option<HashMap<String, String>>,
}

impl Configuration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the layout.
    pub fn set_layout(&mut self, layout: Option<Arc<dyn Layout>>) {
        self.layout = layout;
    }

    /// Set the handlers.
    pub fn set_handlers(&mut self, handlers: Option<Vec<Arc<dyn Handler>>>) {
        self.handlers = handlers;
    }

    /// Set the metadata provider.
    pub fn set_meta_data(&mut self, meta_data: Option<Arc<dyn MetaData>>) {
        self.meta_data = meta_data;
    }

    /// Set the filters.
    pub fn set_filters(&mut self, filters: Option<Vec<Arc<dyn AuditEventFilter>>>) {
        self.filters = filters;
    }

    /// Set the raw command string.
    pub fn set_commands(&mut self, commands: Option<String>) {
        self.commands = commands;
    }

    /// Set the management config.
    pub fn set_management(&mut self, management: Option<ManagementConfig>) {
        self.management = management;
    }

    /// Set the free-form properties.
    pub fn set_properties(&mut self, properties: Option<HashMap<String, String>>) {
        self.properties = properties;
    }

    /// Configured layout.
    pub fn layout(&self) -> Option<&Arc<dyn Layout>> {
        self.layout.as_ref()
    }

    /// Configured handlers, in dispatch order.
    pub fn handlers(&self) -> Option<&[Arc<dyn Handler>]> {
        self.handlers.as_deref()
    }

    /// Configured metadata provider.
    pub fn meta_data(&self) -> Option<&Arc<dyn MetaData>> {
        self.meta_data.as_ref()
    }

    /// Configured filters.
    pub fn filters(&self) -> Option<&[Arc<dyn AuditEventFilter>]> {
        self.filters.as_deref()
    }

    /// Raw command string.
    pub fn commands(&self) -> Option<&str> {
        self.commands.as_deref()
    }

    /// Management config.
    pub fn management(&self) -> Option<&ManagementConfig> {
        self.management.as_ref()
    }

    /// All properties.
    pub fn properties(&self) -> Option<&HashMap<String, String>> {
        self.properties.as_ref()
    }

    /// Look up a single property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.get(key))
            .map(String::as_str)
    }

    /// Dispatch settings derived from properties.
    pub fn dispatch(&self) -> Result<DispatchSettings> {
        DispatchSettings::from_configuration(self)
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("layout", &self.layout.is_some())
            .field("handlers", &self.handlers.as_ref().map(|h| h.len()))
            .field("meta_data", &self.meta_data.is_some())
            .field("filters", &self.filters.as_ref().map(|h| h.len()))
            .field("commands", &self.commands)
            .field("management", &self.management)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Dispatch worker settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Bounded queue size between callers and the worker
    pub queue_capacity: usize,
}

impl DispatchSettings {
    /// Read settings from configuration properties.
    ///
    /// An absent capacity uses the default. A capacity that is not a number
    /// in `1..=MAX_QUEUE_CAPACITY` is a configuration error.
    pub fn from_configuration(config: &Configuration) -> Result<Self> {
        let queue_capacity = match config.property(QUEUE_CAPACITY_PROPERTY) {
            None => DEFAULT_QUEUE_CAPACITY,
            Some(raw) => parse_queue_capacity(raw)?,
        };

        Ok(Self { queue_capacity })
    }
}

fn parse_queue_capacity(raw: &str) -> Result<usize> {
    let capacity = raw.trim().parse::<usize>().map_err(|e| {
        Error::Configuration(format!("{}: invalid value {:?}: {}", QUEUE_CAPACITY_PROPERTY, raw, e))
    })?;

    if capacity == 0 || capacity > MAX_QUEUE_CAPACITY {
        return Err(Error::Configuration(format!(
            "{} must be between 1 and {}, got {}",
            QUEUE_CAPACITY_PROPERTY, MAX_QUEUE_CAPACITY, capacity
        )));
    }
    Ok(capacity)
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
