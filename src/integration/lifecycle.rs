//! Start/stop capability.
//!
//! Host integrations (web frameworks, CLIs, service runtimes) drive audit
//! components through this trait instead of a framework-specific
//! lifecycle contract.

use async_trait::async_trait;

/// A component that can be started with a configuration and stopped.
#[async_trait]
pub trait Startable: Send {
    /// Configuration consumed by `start`.
    type Config: Send;

    /// Error returned by `start` and `stop`.
    type Error: Send;

    /// Start the component.
    async fn start(&mut self, config: Self::Config) -> Result<(), Self::Error>;

    /// Stop the component.
    async fn stop(&mut self) -> Result<(), Self::Error>;
}
