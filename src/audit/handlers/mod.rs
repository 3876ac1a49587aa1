//! Handler implementations.
//!
//! Three built-in sinks:
//! - Console (stdout / stderr)
//! - File (append-only)
//! - Memory (bounded buffer)

pub mod console;
pub mod file;
pub mod memory;

pub use console::{ConsoleHandler, ConsoleTarget};
pub use file::FileHandler;
pub use memory::MemoryHandler;
