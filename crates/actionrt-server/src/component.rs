use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::state::{ReplySink, RequestState};

/// Kind of component a process runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Service,
    Middleware,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Service => "service",
            ComponentKind::Middleware => "middleware",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service" => Ok(ComponentKind::Service),
            "middleware" => Ok(ComponentKind::Middleware),
            other => Err(format!("unknown component kind '{other}'")),
        }
    }
}

/// Identity of a running component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub kind: ComponentKind,
    pub name: String,
    pub version: String,
    /// Version of the framework the component was started by.
    pub framework_version: Option<String>,
}

impl ComponentInfo {
    pub fn new(kind: ComponentKind, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: version.into(),
            framework_version: None,
        }
    }

    pub fn with_framework_version(mut self, version: impl Into<String>) -> Self {
        self.framework_version = Some(version.into());
        self
    }

    /// Human readable title, e.g. `service "users" (1.0.0)`.
    pub fn title(&self) -> String {
        format!("{} \"{}\" ({})", self.kind, self.name, self.version)
    }

    /// Identity parts used to derive the default socket name.
    pub fn address_parts(&self) -> [&str; 3] {
        [self.kind.as_str(), &self.name, &self.version]
    }
}

/// Callback that serves one action.
///
/// The handler must answer through `sink` exactly once. Dropping the sink
/// without answering leaves the caller without a reply.
pub trait ActionHandler: Send + Sync + 'static {
    fn call(&self, state: RequestState, sink: ReplySink) -> BoxFuture<'static, ()>;
}

impl<F, Fut> ActionHandler for F
where
    F: Fn(RequestState, ReplySink) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, state: RequestState, sink: ReplySink) -> BoxFuture<'static, ()> {
        Box::pin(self(state, sink))
    }
}

/// Action names mapped to their handlers.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered action names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// User component: the set of actions it serves.
///
/// Built once before the server starts and read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct Component {
    actions: ActionRegistry,
}

impl Component {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action served by a closure or async fn.
    pub fn action<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestState, ReplySink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.actions.register(name, Arc::new(handler));
        self
    }

    /// Register an action served by a shared handler object.
    pub fn action_handler(mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.actions.register(name, handler);
        self
    }

    /// Whether the component serves `name`.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains(name)
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.actions.get(name)
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_formats_kind_name_and_version() {
        let info = ComponentInfo::new(ComponentKind::Middleware, "auth", "2.1.0");
        assert_eq!(info.title(), "middleware \"auth\" (2.1.0)");
        assert_eq!(info.address_parts(), ["middleware", "auth", "2.1.0"]);
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("service".parse::<ComponentKind>(), Ok(ComponentKind::Service));
        assert!("gateway".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn registered_actions_are_queryable() {
        let component = Component::new()
            .action("read", |_state, sink: ReplySink| async move { sink.reply(&1) })
            .action("write", |_state, sink: ReplySink| async move { sink.reply(&2) });

        assert!(component.has_action("read"));
        assert!(!component.has_action("delete"));
        assert!(component.handler("write").is_some());
        assert_eq!(component.actions().names(), vec!["read", "write"]);
    }
}
