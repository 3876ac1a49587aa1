//! Component factory.
//!
//! Creates layouts, handlers and filters from declarative specs.

use crate::audit::filter::{ActionFilter, AuditEventFilter};
use crate::audit::handler::Handler;
use crate::audit::handlers::{ConsoleHandler, FileHandler, MemoryHandler};
use crate::audit::layout::{JsonLayout, Layout, LayoutType, SimpleLayout};
use crate::audit::settings::{FilterSpec, HandlerSpec};
use std::sync::Arc;

/// Create a layout.
pub fn create_layout(layout: &LayoutType) -> Arc<dyn Layout> {
    match layout {
        LayoutType::Simple => Arc::new(SimpleLayout::new()),
        LayoutType::Json => Arc::new(JsonLayout::new()),
        LayoutType::PrettyJson => Arc::new(JsonLayout::pretty()),
    }
}

/// Create a handler.
pub fn create_handler(spec: &HandlerSpec) -> Arc<dyn Handler> {
    match spec {
        HandlerSpec::Console { target } => Arc::new(ConsoleHandler::new(target.clone())),
        HandlerSpec::File { path } => Arc::new(FileHandler::new(path.clone())),
        HandlerSpec::Memory { capacity } => Arc::new(MemoryHandler::new(*capacity)),
    }
}

/// Create a filter.
pub fn create_filter(spec: &FilterSpec) -> Arc<dyn AuditEventFilter> {
    match spec {
        FilterSpec::DenyActions { actions } => Arc::new(ActionFilter::deny(actions.iter().cloned())),
        FilterSpec::Match(filter) => Arc::new(filter.clone()),
    }
}
