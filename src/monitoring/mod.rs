//! Monitoring Module
//!
//! Diagnostic logging for auditkit itself (not the audit trail).

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
