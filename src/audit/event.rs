//! Audit event structure.
//!
//! The record that flows through filters, layouts and handlers.

use crate::core::{now, sha3_hex, Timestamp};
use serde::{Deserialize, Serialize};

/// Unique event identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Create an event ID from a string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named value attached to an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field value
    pub value: serde_json::Value,
}

impl Field {
    /// Create a new field.
    pub fn new(name: &str, value: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// An audit event.
///
/// `actor` and `origin` may be left empty by the caller; the manager fills
/// them from the configured metadata provider before dispatch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: EventId,
    /// Creation time
    pub timestamp: Timestamp,
    /// Who performed the action
    pub actor: Option<String>,
    /// Where the action came from (address, host, channel)
    pub origin: Option<String>,
    /// Action performed
    pub action: String,
    /// Ordered event fields
    pub fields: Vec<Field>,
    /// Content hash (hex SHA3-256)
    pub hash: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event for an action.
    pub fn new(action: &str) -> Self {
        Self {
            id: EventId::generate(),
            timestamp: now(),
            actor: None,
            origin: None,
            action: action.to_string(),
            fields: Vec::new(),
            hash: None,
        }
    }

    /// Set the actor.
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    /// Append a field. Values that fail to serialize are skipped.
    pub fn with_field(mut self, name: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.fields.push(Field::new(name, v));
        }
        self
    }

    /// Look up the first field with the given name.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    fn digest(&self) -> String {
        let fields = serde_json::to_string(&self.fields).unwrap_or_default();
        let header = format!(
            "{}:{}:{}:{}:{}",
            self.id,
            self.actor.as_deref().unwrap_or(""),
            self.origin.as_deref().unwrap_or(""),
            self.action,
            self.timestamp.to_rfc3339(),
        );
        sha3_hex(&[header.as_bytes(), b":", fields.as_bytes()])
    }

    /// Compute and set content hash.
    pub fn compute_hash(&mut self) -> String {
        let hash = self.digest();
        self.hash = Some(hash.clone());
        hash
    }

    /// Verify the event's hash.
    pub fn verify_hash(&self) -> bool {
        match &self.hash {
            Some(stored) => *stored == self.digest(),
            None => false,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::core::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> crate::core::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
