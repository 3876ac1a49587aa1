//! In-memory handler.
//!
//! Keeps the most recent events for inspection.

use crate::audit::event::AuditEvent;
use crate::audit::handler::Handler;
use crate::core::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default number of records retained.
pub const DEFAULT_MEMORY_CAPACITY: usize = 1000;

/// A handled event together with its formatted output.
#[derive(Clone, Debug)]
pub struct Record {
    /// Event as dispatched
    pub event: AuditEvent,
    /// Layout output
    pub formatted: String,
}

/// Bounded in-memory sink. The oldest record is evicted when full.
pub struct MemoryHandler {
    name: String,
    capacity: usize,
    records: RwLock<VecDeque<Record>>,
}

impl MemoryHandler {
    /// Create a handler with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self::named("memory", capacity)
    }

    /// Create a handler with a custom name.
    pub fn named(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    /// Maximum records retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of retained records, oldest first.
    pub fn records(&self) -> Vec<Record> {
        match self.records.read() {
            Ok(records) => records.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Formatted lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.formatted).collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records.
    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
    }
}

impl Default for MemoryHandler {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl Handler for MemoryHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &AuditEvent, formatted: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::handler(&self.name, "buffer lock poisoned"))?;

        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(Record {
            event: event.clone(),
            formatted: formatted.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let handler = MemoryHandler::default();
        handler.handle(&AuditEvent::new("a"), "one").await.unwrap();
        handler.handle(&AuditEvent::new("b"), "two").await.unwrap();

        assert_eq!(handler.len(), 2);
        assert_eq!(handler.lines(), vec!["one", "two"]);
        assert_eq!(handler.records()[1].event.action, "b");
    }

    #[tokio::test]
    async fn test_evicts_oldest() {
        let handler = MemoryHandler::new(2);
        for line in ["one", "two", "three"] {
            handler.handle(&AuditEvent::new(line), line).await.unwrap();
        }

        assert_eq!(handler.lines(), vec!["two", "three"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let handler = MemoryHandler::named("buffer", 4);
        assert_eq!(handler.name(), "buffer");

        handler.handle(&AuditEvent::new("a"), "one").await.unwrap();
        handler.clear();
        assert!(handler.is_empty());
    }

    #[test]
    fn test_handle_blocking() {
        let handler = MemoryHandler::new(1);
        tokio_test::block_on(handler.handle(&AuditEvent::new("a"), "one")).unwrap();
        assert_eq!(handler.lines(), vec!["one"]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        assert_eq!(MemoryHandler::new(0).capacity(), 1);
    }
}
