//! Audit Pipeline
//!
//! Pluggable audit components:
//! - Layouts (text, JSON)
//! - Handlers (console, file, memory)
//! - Filters
//! - Metadata providers
//! - Manager with a background dispatch worker

pub mod commands;
pub mod config;
pub mod event;
pub mod factory;
pub mod filter;
pub mod handler;
pub mod handlers;
pub mod layout;
pub mod management;
pub mod manager;
pub mod metadata;
pub mod settings;

pub use commands::{Commands, MetadataMode};
pub use config::{Configuration, DispatchSettings};
pub use event::{AuditEvent, EventId, Field};
pub use factory::{create_filter, create_handler, create_layout};
pub use filter::{ActionFilter, AuditEventFilter, EventFilter};
pub use handler::{Handler, HandlerType};
pub use handlers::{ConsoleHandler, ConsoleTarget, FileHandler, MemoryHandler};
pub use layout::{JsonLayout, Layout, LayoutType, SimpleLayout};
pub use management::ManagementConfig;
pub use manager::{AuditHandle, AuditManager, Dispatch, ManagerStatus};
pub use metadata::{
    MetaData, MetaDataSource, RequestScope, SecurityContextMetaData, SessionAttributeMetaData,
};
pub use settings::{AuditSettings, FilterSpec, HandlerSpec};
