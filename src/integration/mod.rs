//! Host Integration
//!
//! Wires host-supplied configuration into the audit manager:
//! - `Startable` start/stop capability
//! - Lifecycle adapter with metadata provider selection

pub mod adapter;
pub mod lifecycle;

pub use adapter::{AdapterState, AuditLifecycleAdapter};
pub use lifecycle::Startable;
