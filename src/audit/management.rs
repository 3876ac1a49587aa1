//! Management (monitoring) configuration.

use serde::{Deserialize, Serialize};

/// Management endpoint settings, carried through to the manager's status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// Service name
    #[serde(default = "default_name")]
    pub name: String,
    /// Naming domain
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Whether management is exposed
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_name() -> String {
    "AuditService".to_string()
}

fn default_domain() -> String {
    "auditkit".to_string()
}

fn default_enabled() -> bool {
    true
}

impl ManagementConfig {
    /// Fully qualified object name, `domain:name`.
    pub fn object_name(&self) -> String {
        format!("{}:{}", self.domain, self.name)
    }
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            domain: default_domain(),
            enabled: default_enabled(),
        }
    }
}
