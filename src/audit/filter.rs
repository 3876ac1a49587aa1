//! Event filters.
//!
//! An event is dispatched only when every configured filter accepts it.

use crate::audit::event::AuditEvent;
use crate::core::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Predicate deciding whether an event is dispatched.
pub trait AuditEventFilter: Send + Sync {
    /// Return `false` to suppress the event.
    fn accepts(&self, event: &AuditEvent) -> bool;
}

/// Field-matching filter.
///
/// Every criterion that is set must match for the event to be accepted.
/// With `negate`, matching events are rejected instead.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Match by actor
    pub actor: Option<String>,
    /// Match by action
    pub action: Option<String>,
    /// Match by origin
    pub origin: Option<String>,
    /// Require a field with this name
    pub has_field: Option<String>,
    /// Match events at or after
    pub date_from: Option<Timestamp>,
    /// Match events at or before
    pub date_to: Option<Timestamp>,
    /// Invert the result
    #[serde(default)]
    pub negate: bool,
}

impl EventFilter {
    /// Create a new empty filter (accepts everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Match by actor.
    pub fn by_actor(mut self, actor: &str) -> Self {
        self.actor = Some(actor.to_string());
        self
    }

    /// Match by action.
    pub fn by_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// Match by origin.
    pub fn by_origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_string());
        self
    }

    /// Require a field.
    pub fn with_field(mut self, name: &str) -> Self {
        self.has_field = Some(name.to_string());
        self
    }

    /// Match by date range.
    pub fn by_date_range(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Reject matching events instead of accepting them.
    pub fn negate(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Check if an event matches every criterion.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(actor) = &self.actor {
            if event.actor.as_ref() != Some(actor) {
                return false;
            }
        }

        if let Some(action) = &self.action {
            if &event.action != action {
                return false;
            }
        }

        if let Some(origin) = &self.origin {
            if event.origin.as_ref() != Some(origin) {
                return false;
            }
        }

        if let Some(name) = &self.has_field {
            if event.field(name).is_none() {
                return false;
            }
        }

        if let Some(from) = self.date_from {
            if event.timestamp < from {
                return false;
            }
        }

        if let Some(to) = self.date_to {
            if event.timestamp > to {
                return false;
            }
        }

        true
    }
}

impl AuditEventFilter for EventFilter {
    fn accepts(&self, event: &AuditEvent) -> bool {
        self.matches(event) != self.negate
    }
}

/// Suppresses events whose action is in a deny list.
#[derive(Clone, Debug, Default)]
pub struct ActionFilter {
    denied: HashSet<String>,
}

impl ActionFilter {
    /// Deny the given actions.
    pub fn deny<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `action` is denied.
    pub fn is_denied(&self, action: &str) -> bool {
        self.denied.contains(action)
    }
}

impl AuditEventFilter for ActionFilter {
    fn accepts(&self, event: &AuditEvent) -> bool {
        !self.is_denied(&event.action)
    }
}
