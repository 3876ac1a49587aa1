//! Lifecycle adapter.
//!
//! Collects configuration from a host's composition root through setters,
//! assembles a [`Configuration`] at `initialize`, and starts the audit
//! manager with it. `shutdown` stops the manager. Values are forwarded as
//! given: nothing is validated, and errors from the manager reach the
//! caller unchanged.

use crate::audit::config::Configuration;
use crate::audit::filter::AuditEventFilter;
use crate::audit::handler::Handler;
use crate::audit::layout::Layout;
use crate::audit::management::ManagementConfig;
use crate::audit::manager::AuditManager;
use crate::audit::metadata::{MetaData, MetaDataSource};
use crate::integration::lifecycle::Startable;
use std::collections::HashMap;
use std::sync::Arc;

/// Adapter state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterState {
    /// Not started, or shut down
    Uninitialized,
    /// `initialize` succeeded
    Running,
}

/// Binds host-supplied configuration to a [`Startable`] audit manager.
pub struct AuditLifecycleAdapter<S = AuditManager> {
    startable: S,
    layout: Option<Arc<dyn Layout>>,
    handlers: Option<Vec<Arc<dyn Handler>>>,
    meta_data: Option<Arc<dyn MetaData>>,
    filters: Option<Vec<Arc<dyn AuditEventFilter>>>,
    commands: Option<String>,
    management: Option<ManagementConfig>,
    properties: Option<HashMap<String, String>>,
    actor_session_attribute_name: Option<String>,
    state: AdapterState,
}

impl AuditLifecycleAdapter<AuditManager> {
    /// Adapter driving a fresh [`AuditManager`].
    pub fn with_manager() -> Self {
        Self::new(AuditManager::new())
    }
}

impl Default for AuditLifecycleAdapter<AuditManager> {
    fn default() -> Self {
        Self::with_manager()
    }
}

impl<S> AuditLifecycleAdapter<S>
where
    S: Startable<Config = Configuration>,
{
    /// Create an adapter around `startable`. All slots start empty.
    pub fn new(startable: S) -> Self {
        Self {
            startable,
            layout: None,
            handlers: None,
            meta_data: None,
            filters: None,
            commands: None,
            management: None,
            properties: None,
            actor_session_attribute_name: None,
            state: AdapterState::Uninitialized,
        }
    }

    /// Sets the layout.
    pub fn set_layout(&mut self, layout: Arc<dyn Layout>) {
        self.layout = Some(layout);
    }

    /// Sets the handlers.
    pub fn set_handlers(&mut self, handlers: Vec<Arc<dyn Handler>>) {
        self.handlers = Some(handlers);
    }

    /// Sets an explicit metadata provider.
    pub fn set_meta_data(&mut self, meta_data: Arc<dyn MetaData>) {
        self.meta_data = Some(meta_data);
    }

    /// Sets the filters.
    pub fn set_filters(&mut self, filters: Vec<Arc<dyn AuditEventFilter>>) {
        self.filters = Some(filters);
    }

    /// Sets the command string.
    pub fn set_commands(&mut self, commands: impl Into<String>) {
        self.commands = Some(commands.into());
    }

    /// Sets the management config.
    pub fn set_management(&mut self, management: ManagementConfig) {
        self.management = Some(management);
    }

    /// Sets the properties.
    pub fn set_properties(&mut self, properties: HashMap<String, String>) {
        self.properties = Some(properties);
    }

    /// Sets the session attribute holding the actor.
    pub fn set_actor_session_attribute_name(&mut self, name: impl Into<String>) {
        self.actor_session_attribute_name = Some(name.into());
    }

    /// Metadata source `initialize` would select right now.
    pub fn meta_data_source(&self) -> MetaDataSource {
        MetaDataSource::select(
            self.meta_data.clone(),
            self.actor_session_attribute_name.as_deref(),
        )
    }

    /// Assemble the configuration and start the manager.
    pub async fn initialize(&mut self) -> Result<(), S::Error> {
        let mut configuration = Configuration::new();
        configuration.set_layout(self.layout.clone());
        configuration.set_handlers(self.handlers.clone());
        configuration.set_filters(self.filters.clone());
        configuration.set_commands(self.commands.clone());
        configuration.set_management(self.management.clone());
        configuration.set_properties(self.properties.clone());
        configuration.set_meta_data(Some(self.meta_data_source().resolve()));

        self.startable.start(configuration).await?;
        self.state = AdapterState::Running;
        Ok(())
    }

    /// Stop the manager.
    ///
    /// The adapter is `Uninitialized` once stop has been attempted, even
    /// when it fails; the error is still returned.
    pub async fn shutdown(&mut self) -> Result<(), S::Error> {
        let result = self.startable.stop().await;
        self.state = AdapterState::Uninitialized;
        result
    }

    /// Current state.
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// The driven component.
    pub fn startable(&self) -> &S {
        &self.startable
    }

    /// Mutable access to the driven component.
    pub fn startable_mut(&mut self) -> &mut S {
        &mut self.startable
    }

    /// Consume the adapter, returning the driven component.
    pub fn into_inner(self) -> S {
        self.startable
    }
}
