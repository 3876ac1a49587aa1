//! Audit manager.
//!
//! Owns the dispatch pipeline: callers enqueue events through
//! [`AuditManager::audit`] (or a cloned [`AuditHandle`]); a single worker
//! task formats each event with the layout and hands it to every handler
//! in order.

use crate::audit::commands::{Commands, MetadataMode};
use crate::audit::config::Configuration;
use crate::audit::event::AuditEvent;
use crate::audit::filter::AuditEventFilter;
use crate::audit::handler::Handler;
use crate::audit::layout::{Layout, SimpleLayout};
use crate::audit::management::ManagementConfig;
use crate::audit::metadata::{MetaData, MetaDataSource};
use crate::core::{Error, Result};
use crate::integration::lifecycle::Startable;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of submitting an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Accepted and queued for handlers
    Queued,
    /// Suppressed by a filter
    Filtered,
}

/// Dispatch counters.
#[derive(Debug, Default)]
struct DispatchStats {
    dispatched: AtomicU64,
    filtered: AtomicU64,
    handler_failures: AtomicU64,
    layout_failures: AtomicU64,
}

/// Snapshot of manager state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerStatus {
    /// Whether the manager is running
    pub running: bool,
    /// Events delivered to handlers
    pub dispatched: u64,
    /// Events suppressed by filters
    pub filtered: u64,
    /// Failed handler calls
    pub handler_failures: u64,
    /// Events dropped because the layout failed
    pub layout_failures: u64,
    /// Management config of the current run
    pub management: Option<ManagementConfig>,
}

fn enrich(event: &mut AuditEvent, meta_data: &dyn MetaData) {
    if event.actor.is_none() {
        event.actor = Some(meta_data.actor());
    }
    if event.origin.is_none() {
        event.origin = Some(meta_data.origin());
    }
}

/// Cloneable submission side of a running manager.
///
/// Holds a weak queue reference, so outstanding handles never keep a
/// stopped manager's worker alive.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::WeakSender<AuditEvent>,
    filters: Arc<[Arc<dyn AuditEventFilter>]>,
    meta_data: Arc<dyn MetaData>,
    mode: MetadataMode,
    stats: Arc<DispatchStats>,
}

impl AuditHandle {
    /// Submit an event.
    ///
    /// Missing actor/origin are filled from the metadata provider (on this
    /// task unless `-metadata=async`), then filters run.
    pub async fn audit(&self, mut event: AuditEvent) -> Result<Dispatch> {
        let tx = self.tx.upgrade().ok_or(Error::NotRunning)?;

        if self.mode == MetadataMode::Sync {
            enrich(&mut event, self.meta_data.as_ref());
        }

        if !self.filters.iter().all(|f| f.accepts(&event)) {
            self.stats.filtered.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %event.id, action = %event.action, "audit event filtered");
            return Ok(Dispatch::Filtered);
        }

        tx.send(event).await.map_err(|_| Error::QueueClosed)?;
        Ok(Dispatch::Queued)
    }
}

struct Running {
    tx: mpsc::Sender<AuditEvent>,
    worker: JoinHandle<()>,
    handlers: Vec<Arc<dyn Handler>>,
    handle: AuditHandle,
}

/// Audit manager.
pub struct AuditManager {
    running: Option<Running>,
    stats: Arc<DispatchStats>,
    management: Option<ManagementConfig>,
}

impl AuditManager {
    /// Create a stopped manager.
    pub fn new() -> Self {
        Self {
            running: None,
            stats: Arc::new(DispatchStats::default()),
            management: None,
        }
    }

    /// Whether the manager is running.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start dispatching with `configuration`.
    ///
    /// Commands and dispatch settings are validated first. Then the layout
    /// is initialized, followed by each handler in order. If a handler
    /// fails to initialize, the handlers already initialized are stopped
    /// and the error is returned.
    pub async fn start(&mut self, configuration: Configuration) -> Result<()> {
        if self.running.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let commands = match configuration.commands() {
            Some(raw) => Commands::parse(raw)?,
            None => Commands::default(),
        };
        let mode = commands.metadata_mode()?;
        let hash_events = commands.hash_events()?;
        let dispatch = configuration.dispatch()?;

        let layout: Arc<dyn Layout> = match configuration.layout() {
            Some(layout) => layout.clone(),
            None => Arc::new(SimpleLayout::new()),
        };
        layout.init()?;

        let handlers: Vec<Arc<dyn Handler>> = configuration
            .handlers()
            .map(|h| h.to_vec())
            .unwrap_or_default();
        if handlers.is_empty() {
            warn!("audit manager started without handlers; events will be discarded");
        }

        for (index, handler) in handlers.iter().enumerate() {
            if let Err(e) = handler.init().await {
                warn!(handler = handler.name(), error = %e, "handler init failed");
                for started in &handlers[..index] {
                    if let Err(stop_err) = started.stop().await {
                        warn!(handler = started.name(), error = %stop_err, "handler stop failed");
                    }
                }
                return Err(e);
            }
        }

        let meta_data = match configuration.meta_data() {
            Some(meta_data) => meta_data.clone(),
            None => MetaDataSource::Default.resolve(),
        };
        let filters: Arc<[Arc<dyn AuditEventFilter>]> = configuration
            .filters()
            .map(|f| f.to_vec())
            .unwrap_or_default()
            .into();

        let (tx, rx) = mpsc::channel(dispatch.queue_capacity);

        let worker = tokio::spawn(dispatch_loop(
            rx,
            layout,
            handlers.clone(),
            (mode == MetadataMode::Async).then(|| meta_data.clone()),
            hash_events,
            self.stats.clone(),
        ));

        let handle = AuditHandle {
            tx: tx.downgrade(),
            filters,
            meta_data,
            mode,
            stats: self.stats.clone(),
        };

        self.management = configuration.management().cloned();
        self.running = Some(Running {
            tx,
            worker,
            handlers,
            handle,
        });

        info!(
            handlers = self.running.as_ref().map(|r| r.handlers.len()).unwrap_or(0),
            queue_capacity = dispatch.queue_capacity,
            ?mode,
            hash_events,
            "audit manager started"
        );
        Ok(())
    }

    /// Stop dispatching.
    ///
    /// Drains every queued event, then stops all handlers. Every handler is
    /// asked to stop; the first failure is returned.
    pub async fn stop(&mut self) -> Result<()> {
        let Running {
            tx, worker, handlers, ..
        } = self.running.take().ok_or(Error::NotRunning)?;

        drop(tx);
        let drained = worker
            .await
            .map_err(|e| Error::Internal(format!("dispatch worker failed: {}", e)));

        let results = futures::future::join_all(handlers.iter().map(|h| h.stop())).await;
        let mut first_error = drained.err();
        for (handler, result) in handlers.iter().zip(results) {
            if let Err(e) = result {
                warn!(handler = handler.name(), error = %e, "handler stop failed");
                first_error.get_or_insert(e);
            }
        }

        info!(
            dispatched = self.stats.dispatched.load(Ordering::Relaxed),
            "audit manager stopped"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Submit an event.
    pub async fn audit(&self, event: AuditEvent) -> Result<Dispatch> {
        self.handle()?.audit(event).await
    }

    /// A cloneable submission handle for the current run.
    pub fn handle(&self) -> Result<AuditHandle> {
        self.running
            .as_ref()
            .map(|r| r.handle.clone())
            .ok_or(Error::NotRunning)
    }

    /// Current counters and state.
    pub fn status(&self) -> ManagerStatus {
        ManagerStatus {
            running: self.is_running(),
            dispatched: self.stats.dispatched.load(Ordering::Relaxed),
            filtered: self.stats.filtered.load(Ordering::Relaxed),
            handler_failures: self.stats.handler_failures.load(Ordering::Relaxed),
            layout_failures: self.stats.layout_failures.load(Ordering::Relaxed),
            management: self.management.clone(),
        }
    }
}

impl Default for AuditManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Startable for AuditManager {
    type Config = Configuration;
    type Error = Error;

    async fn start(&mut self, config: Configuration) -> Result<()> {
        AuditManager::start(self, config).await
    }

    async fn stop(&mut self) -> Result<()> {
        AuditManager::stop(self).await
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<AuditEvent>,
    layout: Arc<dyn Layout>,
    handlers: Vec<Arc<dyn Handler>>,
    late_meta_data: Option<Arc<dyn MetaData>>,
    hash_events: bool,
    stats: Arc<DispatchStats>,
) {
    while let Some(mut event) = rx.recv().await {
        if let Some(meta_data) = &late_meta_data {
            enrich(&mut event, meta_data.as_ref());
        }
        if hash_events {
            event.compute_hash();
        }

        let formatted = match layout.format(&event) {
            Ok(formatted) => formatted,
            Err(e) => {
                stats.layout_failures.fetch_add(1, Ordering::Relaxed);
                warn!(event_id = %event.id, error = %e, "layout failed; event dropped");
                continue;
            }
        };

        for handler in &handlers {
            match AssertUnwindSafe(handler.handle(&event, &formatted))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    stats.handler_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(handler = handler.name(), event_id = %event.id, error = %e, "handler failed");
                }
                Err(_) => {
                    stats.handler_failures.fetch_add(1, Ordering::Relaxed);
                    error!(handler = handler.name(), event_id = %event.id, "handler panicked");
                }
            }
        }
        stats.dispatched.fetch_add(1, Ordering::Relaxed);
    }
    debug!("dispatch worker drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::filter::ActionFilter;
    use crate::audit::config::{MAX_QUEUE_CAPACITY, QUEUE_CAPACITY_PROPERTY};
    use crate::audit::handlers::MemoryHandler;
    use crate::audit::layout::JsonLayout;
    use crate::audit::metadata::{RequestScope, ANONYMOUS_PRINCIPAL};
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct FailingHandler {
        fail_init: bool,
        stops: AtomicU64,
    }

    impl FailingHandler {
        fn new(fail_init: bool) -> Self {
            Self {
                fail_init,
                stops: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl Handler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        async fn init(&self) -> Result<()> {
            if self.fail_init {
                Err(Error::handler("failing", "cannot open"))
            } else {
                Ok(())
            }
        }

        async fn handle(&self, _event: &AuditEvent, _formatted: &str) -> Result<()> {
            Err(Error::handler("failing", "sink unavailable"))
        }

        async fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl Handler for PanickingHandler {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _event: &AuditEvent, _formatted: &str) -> Result<()> {
            panic!("handler bug");
        }
    }

    /// Blocks each event until a permit is released.
    struct GatedHandler {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Handler for GatedHandler {
        fn name(&self) -> &str {
            "gated"
        }

        async fn handle(&self, _event: &AuditEvent, _formatted: &str) -> Result<()> {
            self.gate
                .acquire()
                .await
                .map(|permit| permit.forget())
                .map_err(|e| Error::handler("gated", e))
        }
    }

    /// Rejects events whose action is `bad`.
    struct RejectingLayout;

    impl Layout for RejectingLayout {
        fn format(&self, event: &AuditEvent) -> Result<String> {
            if event.action == "bad" {
                return Err(Error::Layout(format!("cannot format {}", event.id)));
            }
            Ok(event.action.clone())
        }
    }

    fn with_queue_capacity(mut config: Configuration, capacity: &str) -> Configuration {
        let mut props = HashMap::new();
        props.insert(QUEUE_CAPACITY_PROPERTY.to_string(), capacity.to_string());
        config.set_properties(Some(props));
        config
    }

    fn config_with(handlers: Vec<Arc<dyn Handler>>) -> Configuration {
        let mut config = Configuration::new();
        config.set_handlers(Some(handlers));
        config
    }

    #[tokio::test]
    async fn test_audit_before_start() {
        let manager = AuditManager::new();
        let result = manager.audit(AuditEvent::new("x")).await;
        assert!(matches!(result, Err(Error::NotRunning)));
        assert!(matches!(manager.handle(), Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn test_double_start_and_stop() {
        let mut manager = AuditManager::new();
        manager.start(Configuration::new()).await.unwrap();
        assert!(matches!(
            manager.start(Configuration::new()).await,
            Err(Error::AlreadyRunning)
        ));

        manager.stop().await.unwrap();
        assert!(matches!(manager.stop().await, Err(Error::NotRunning)));
    }

    #[tokio::test]
    async fn test_stop_drains_in_order() {
        let memory = Arc::new(MemoryHandler::default());
        let mut manager = AuditManager::new();
        manager
            .start(config_with(vec![memory.clone()]))
            .await
            .unwrap();

        for i in 0..50 {
            let event = AuditEvent::new(&format!("action-{}", i)).with_actor("svc");
            assert_eq!(manager.audit(event).await.unwrap(), Dispatch::Queued);
        }
        manager.stop().await.unwrap();

        let actions: Vec<String> = memory.records().into_iter().map(|r| r.event.action).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("action-{}", i)).collect();
        assert_eq!(actions, expected);
        assert_eq!(manager.status().dispatched, 50);
    }

    #[tokio::test]
    async fn test_filters_suppress() {
        let memory = Arc::new(MemoryHandler::default());
        let filters: Vec<Arc<dyn AuditEventFilter>> = vec![Arc::new(ActionFilter::deny(["heartbeat"]))];
        let mut config = config_with(vec![memory.clone()]);
        config.set_filters(Some(filters));

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();

        assert_eq!(
            manager.audit(AuditEvent::new("heartbeat")).await.unwrap(),
            Dispatch::Filtered
        );
        assert_eq!(
            manager.audit(AuditEvent::new("login")).await.unwrap(),
            Dispatch::Queued
        );
        manager.stop().await.unwrap();

        assert_eq!(memory.len(), 1);
        let status = manager.status();
        assert_eq!(status.filtered, 1);
        assert_eq!(status.dispatched, 1);
    }

    #[tokio::test]
    async fn test_handler_failure_isolated() {
        let failing = Arc::new(FailingHandler::new(false));
        let memory = Arc::new(MemoryHandler::default());
        let mut manager = AuditManager::new();
        manager
            .start(config_with(vec![failing.clone(), memory.clone()]))
            .await
            .unwrap();

        manager.audit(AuditEvent::new("a")).await.unwrap();
        manager.audit(AuditEvent::new("b")).await.unwrap();
        manager.stop().await.unwrap();

        assert_eq!(memory.len(), 2);
        assert_eq!(manager.status().handler_failures, 2);
        assert_eq!(failing.stops.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_init_failure_stops_started_handlers() {
        let first = Arc::new(FailingHandler::new(false));
        let broken = Arc::new(FailingHandler::new(true));
        let mut manager = AuditManager::new();

        let result = manager
            .start(config_with(vec![first.clone(), broken.clone()]))
            .await;
        assert!(matches!(result, Err(Error::Handler { .. })));
        assert!(!manager.is_running());
        assert_eq!(first.stops.load(Ordering::Relaxed), 1);
        assert_eq!(broken.stops.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_invalid_commands_fail_start() {
        let mut config = Configuration::new();
        config.set_commands(Some("metadata=async".to_string()));

        let mut manager = AuditManager::new();
        assert!(matches!(
            manager.start(config).await,
            Err(Error::InvalidCommand(_))
        ));
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_metadata_enrichment_sync() {
        let memory = Arc::new(MemoryHandler::default());
        let mut manager = AuditManager::new();
        manager
            .start(config_with(vec![memory.clone()]))
            .await
            .unwrap();

        let scope = RequestScope::new()
            .with_principal("alice")
            .with_remote_addr("192.0.2.7");
        scope
            .scope(manager.audit(AuditEvent::new("login")))
            .await
            .unwrap();
        manager
            .audit(AuditEvent::new("explicit").with_actor("bob"))
            .await
            .unwrap();
        manager.stop().await.unwrap();

        let records = memory.records();
        assert_eq!(records[0].event.actor.as_deref(), Some("alice"));
        assert_eq!(records[0].event.origin.as_deref(), Some("192.0.2.7"));
        assert_eq!(records[1].event.actor.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn test_metadata_enrichment_async() {
        let memory = Arc::new(MemoryHandler::default());
        let mut config = config_with(vec![memory.clone()]);
        config.set_commands(Some("-metadata=async".to_string()));

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();

        // Resolved on the worker, outside the caller's scope.
        RequestScope::new()
            .with_principal("alice")
            .scope(manager.audit(AuditEvent::new("login")))
            .await
            .unwrap();
        manager.stop().await.unwrap();

        assert_eq!(
            memory.records()[0].event.actor.as_deref(),
            Some(ANONYMOUS_PRINCIPAL)
        );
    }

    #[tokio::test]
    async fn test_handle_after_stop() {
        let mut manager = AuditManager::new();
        manager.start(Configuration::new()).await.unwrap();
        let handle = manager.handle().unwrap();

        handle.audit(AuditEvent::new("a")).await.unwrap();
        manager.stop().await.unwrap();

        assert!(matches!(
            handle.audit(AuditEvent::new("b")).await,
            Err(Error::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_status_reports_management_and_restart() {
        let mut props = HashMap::new();
        props.insert("dispatch.queue_capacity".to_string(), "4".to_string());
        let mut config = Configuration::new();
        config.set_management(Some(ManagementConfig::default()));
        config.set_properties(Some(props));

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();
        assert!(manager.status().running);
        assert_eq!(manager.status().management, Some(ManagementConfig::default()));
        manager.stop().await.unwrap();
        assert!(!manager.status().running);

        manager.start(Configuration::new()).await.unwrap();
        assert!(manager.is_running());
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_oversized_queue_capacity_fails_start() {
        // The handler would fail init; the capacity is rejected before that
        let config = with_queue_capacity(
            config_with(vec![Arc::new(FailingHandler::new(true)) as Arc<dyn Handler>]),
            &usize::MAX.to_string(),
        );

        let mut manager = AuditManager::new();
        let result = manager.start(config).await;

        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(!manager.is_running());

        let config = with_queue_capacity(Configuration::new(), &MAX_QUEUE_CAPACITY.to_string());
        manager.start(config).await.unwrap();
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_panic_isolated() {
        let memory = Arc::new(MemoryHandler::default());
        let handlers: Vec<Arc<dyn Handler>> = vec![Arc::new(PanickingHandler), memory.clone()];

        let mut manager = AuditManager::new();
        manager.start(config_with(handlers)).await.unwrap();

        assert_eq!(manager.audit(AuditEvent::new("boom")).await.unwrap(), Dispatch::Queued);
        assert_eq!(manager.audit(AuditEvent::new("login")).await.unwrap(), Dispatch::Queued);
        manager.stop().await.unwrap();

        assert_eq!(memory.len(), 2);
        let status = manager.status();
        assert_eq!(status.handler_failures, 2);
        assert_eq!(status.dispatched, 2);
    }

    #[tokio::test]
    async fn test_layout_failure_drops_only_that_event() {
        let memory = Arc::new(MemoryHandler::default());
        let mut config = config_with(vec![memory.clone() as Arc<dyn Handler>]);
        config.set_layout(Some(Arc::new(RejectingLayout)));

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();
        manager.audit(AuditEvent::new("bad")).await.unwrap();
        manager.audit(AuditEvent::new("good")).await.unwrap();
        manager.stop().await.unwrap();

        assert_eq!(memory.lines(), vec!["good"]);
        let status = manager.status();
        assert_eq!(status.layout_failures, 1);
        assert_eq!(status.dispatched, 1);
    }

    #[tokio::test]
    async fn test_full_queue_applies_back_pressure() {
        let gate = Arc::new(Semaphore::new(0));
        let memory = Arc::new(MemoryHandler::default());
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(GatedHandler { gate: gate.clone() }),
            memory.clone(),
        ];
        let config = with_queue_capacity(config_with(handlers), "1");

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();
        let handle = manager.handle().unwrap();

        // "a" is held by the worker, "b" fills the queue
        handle.audit(AuditEvent::new("a")).await.unwrap();
        handle.audit(AuditEvent::new("b")).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), handle.audit(AuditEvent::new("c"))).await;
        assert!(blocked.is_err());

        let pending = tokio::spawn({
            let handle = handle.clone();
            async move { handle.audit(AuditEvent::new("c")).await }
        });
        tokio::task::yield_now().await;
        gate.add_permits(3);

        assert_eq!(pending.await.unwrap().unwrap(), Dispatch::Queued);
        manager.stop().await.unwrap();

        let actions: Vec<String> = memory.records().into_iter().map(|r| r.event.action).collect();
        assert_eq!(actions, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_hash_command_seals_events() {
        let memory = Arc::new(MemoryHandler::default());
        let mut config = config_with(vec![memory.clone() as Arc<dyn Handler>]);
        config.set_layout(Some(Arc::new(JsonLayout::new())));
        config.set_commands(Some("-hash".to_string()));

        let mut manager = AuditManager::new();
        manager.start(config).await.unwrap();
        manager.audit(AuditEvent::new("login").with_field("method", "sso")).await.unwrap();
        manager.stop().await.unwrap();

        let record = &memory.records()[0];
        assert!(record.event.verify_hash());
        let hash = record.event.hash.as_deref().unwrap();
        assert!(record.formatted.contains(hash));

        // Hashes cover the enriched actor
        let mut tampered = record.event.clone();
        tampered.actor = Some("mallory".to_string());
        assert!(!tampered.verify_hash());
    }

    #[tokio::test]
    async fn test_events_unhashed_by_default() {
        let memory = Arc::new(MemoryHandler::default());
        let mut manager = AuditManager::new();
        manager
            .start(config_with(vec![memory.clone() as Arc<dyn Handler>]))
            .await
            .unwrap();
        manager.audit(AuditEvent::new("login")).await.unwrap();
        manager.stop().await.unwrap();

        assert!(memory.records()[0].event.hash.is_none());
    }
}
