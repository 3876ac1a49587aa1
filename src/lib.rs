//! # auditkit - Pluggable Audit Framework
//!
//! Records what happens in a host application:
//! - **Audit pipeline**: metadata, filters, layouts and handlers behind a
//!   background dispatch worker
//! - **Integration**: a lifecycle adapter that assembles configuration and
//!   starts/stops the manager with the host
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use auditkit::audit::{AuditEvent, ConsoleHandler, Handler};
//! use auditkit::integration::AuditLifecycleAdapter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> auditkit::Result<()> {
//!     let handlers: Vec<Arc<dyn Handler>> = vec![Arc::new(ConsoleHandler::default())];
//!
//!     let mut adapter = AuditLifecycleAdapter::with_manager();
//!     adapter.set_handlers(handlers);
//!     adapter.set_actor_session_attribute_name("user");
//!     adapter.initialize().await?;
//!
//!     adapter
//!         .startable()
//!         .audit(AuditEvent::new("login").with_field("method", "sso"))
//!         .await?;
//!
//!     adapter.shutdown().await
//! }
//! ```

pub mod audit;
pub mod core;
pub mod integration;
pub mod monitoring;

pub use core::error::{Error, Result};
