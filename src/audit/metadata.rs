//! Metadata providers.
//!
//! Supply the actor and origin attached to audit events that arrive
//! without them. Providers read the per-request [`RequestScope`] that the
//! host installs around request handling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Actor reported when no authenticated principal is present.
pub const ANONYMOUS_PRINCIPAL: &str = "anonymousUser";

/// Actor reported when the session attribute is missing.
pub const ANONYMOUS_SESSION_ACTOR: &str = "anonymous";

/// Origin reported when no remote address is known.
pub const UNIDENTIFIED_ORIGIN: &str = "unidentified";

tokio::task_local! {
    static REQUEST_SCOPE: RequestScope;
}

/// Request-scoped context visible to metadata providers.
#[derive(Clone, Debug, Default)]
pub struct RequestScope {
    /// Authenticated principal, if any
    pub principal: Option<String>,
    /// Session attributes
    pub session: HashMap<String, String>,
    /// Remote address of the caller
    pub remote_addr: Option<String>,
}

impl RequestScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authenticated principal.
    pub fn with_principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_string());
        self
    }

    /// Set a session attribute.
    pub fn with_session_attribute(mut self, name: &str, value: &str) -> Self {
        self.session.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the remote address.
    pub fn with_remote_addr(mut self, addr: &str) -> Self {
        self.remote_addr = Some(addr.to_string());
        self
    }

    /// Run a future with this scope installed.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        REQUEST_SCOPE.scope(self, fut).await
    }

    /// Run a closure with this scope installed.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        REQUEST_SCOPE.sync_scope(self, f)
    }

    /// Read the current scope, if one is installed.
    pub fn with_current<R>(f: impl FnOnce(&RequestScope) -> R) -> Option<R> {
        REQUEST_SCOPE.try_with(f).ok()
    }
}

fn current_origin() -> String {
    RequestScope::with_current(|scope| scope.remote_addr.clone())
        .flatten()
        .unwrap_or_else(|| UNIDENTIFIED_ORIGIN.to_string())
}

/// Supplies contextual information for audit events.
pub trait MetaData: Send + Sync {
    /// Current actor.
    fn actor(&self) -> String;

    /// Current origin.
    fn origin(&self) -> String;
}

/// Reads the actor from the authenticated principal.
#[derive(Clone, Debug, Default)]
pub struct SecurityContextMetaData;

impl MetaData for SecurityContextMetaData {
    fn actor(&self) -> String {
        RequestScope::with_current(|scope| scope.principal.clone())
            .flatten()
            .unwrap_or_else(|| ANONYMOUS_PRINCIPAL.to_string())
    }

    fn origin(&self) -> String {
        current_origin()
    }
}

/// Reads the actor from a named session attribute.
#[derive(Clone, Debug)]
pub struct SessionAttributeMetaData {
    attribute: String,
}

impl SessionAttributeMetaData {
    /// Create a provider reading `attribute`.
    pub fn new(attribute: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
        }
    }

    /// Session attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl MetaData for SessionAttributeMetaData {
    fn actor(&self) -> String {
        RequestScope::with_current(|scope| scope.session.get(&self.attribute).cloned())
            .flatten()
            .unwrap_or_else(|| ANONYMOUS_SESSION_ACTOR.to_string())
    }

    fn origin(&self) -> String {
        current_origin()
    }
}

/// Which metadata provider to use.
#[derive(Clone)]
pub enum MetaDataSource {
    /// A provider supplied by the host
    Explicit(Arc<dyn MetaData>),
    /// Read the actor from this session attribute
    SessionAttribute(String),
    /// Read the actor from the authenticated principal
    Default,
}

impl MetaDataSource {
    /// Pick a source: an explicit provider wins, then a session attribute
    /// name, then the security-context default.
    pub fn select(explicit: Option<Arc<dyn MetaData>>, session_attribute: Option<&str>) -> Self {
        match (explicit, session_attribute) {
            (Some(provider), _) => MetaDataSource::Explicit(provider),
            (None, Some(name)) => MetaDataSource::SessionAttribute(name.to_string()),
            (None, None) => MetaDataSource::Default,
        }
    }

    /// Resolve into a provider. Explicit providers are returned as-is.
    pub fn resolve(self) -> Arc<dyn MetaData> {
        match self {
            MetaDataSource::Explicit(provider) => provider,
            MetaDataSource::SessionAttribute(name) => Arc::new(SessionAttributeMetaData::new(&name)),
            MetaDataSource::Default => Arc::new(SecurityContextMetaData),
        }
    }
}

impl std::fmt::Debug for MetaDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetaDataSource::Explicit(_) => write!(f, "Explicit(..)"),
            MetaDataSource::SessionAttribute(name) => write!(f, "SessionAttribute({})", name),
            MetaDataSource::Default => write!(f, "Default"),
        }
    }
}
