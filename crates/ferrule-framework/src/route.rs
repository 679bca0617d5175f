//! A single registered command.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::handler::BoxedHandler;
use crate::matcher::Matcher;

/// Display metadata of a [`Route`]. Used for help listings, never matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub name: String,
    pub description: String,
    pub category: String,
}

/// A matcher, an optional handler, display metadata and an enabled flag.
///
/// Routes are shared as `Arc<Route>` between the router and in-flight
/// invocations. The matcher and handler are fixed at construction. The
/// metadata and the disabled flag may change at any time through `&self`.
///
/// A route without a handler still matches; the dispatcher then does nothing.
/// This lets a route exist purely for documentation.
pub struct Route {
    matcher: Matcher,
    handler: Option<BoxedHandler>,
    meta: RwLock<RouteMeta>,
    disabled: AtomicBool,
}

impl Route {
    /// Creates an enabled route named after its matcher source.
    pub fn new(matcher: Matcher, handler: Option<BoxedHandler>) -> Self {
        let meta = RouteMeta {
            name: matcher.source().to_string(),
            ..RouteMeta::default()
        };
        Self {
            matcher,
            handler,
            meta: RwLock::new(meta),
            disabled: AtomicBool::new(false),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn handler(&self) -> Option<&BoxedHandler> {
        self.handler.as_ref()
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub fn description(&self) -> String {
        self.meta.read().description.clone()
    }

    pub fn category(&self) -> String {
        self.meta.read().category.clone()
    }

    /// Snapshot of all display metadata.
    pub fn meta(&self) -> RouteMeta {
        self.meta.read().clone()
    }

    /// Updates display metadata. An empty argument leaves that field as is.
    pub fn set(&self, name: &str, description: &str, category: &str) -> &Self {
        let mut meta = self.meta.write();
        if !name.is_empty() {
            meta.name = name.to_string();
        }
        if !description.is_empty() {
            meta.description = description.to_string();
        }
        if !category.is_empty() {
            meta.category = category.to_string();
        }
        self
    }

    /// Shorthand for `set("", description, "")`.
    pub fn describe(&self, description: &str) -> &Self {
        self.set("", description, "")
    }

    /// Enables or disables matching. Help listings still show the route.
    pub fn set_disabled(&self, disabled: bool) -> &Self {
        self.disabled.store(disabled, Ordering::Release);
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.matcher.as_str())
            .field("meta", &*self.meta.read())
            .field("has_handler", &self.handler.is_some())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(keyword: &str) -> Route {
        Route::new(Matcher::keyword("", keyword).unwrap(), None)
    }

    #[test]
    fn test_default_name_is_keyword() {
        let r = route("ping");
        assert_eq!(r.name(), "ping");
        assert_eq!(r.description(), "");
        assert_eq!(r.category(), "");
        assert!(!r.is_disabled());
        assert!(r.handler().is_none());
    }

    #[test]
    fn test_set_empty_means_unchanged() {
        let r = route("ping");
        r.set("", "Replies with pong", "general");
        assert_eq!(
            r.meta(),
            RouteMeta {
                name: "ping".into(),
                description: "Replies with pong".into(),
                category: "general".into(),
            }
        );

        r.set("Ping", "", "");
        assert_eq!(r.name(), "Ping");
        assert_eq!(r.description(), "Replies with pong");
        assert_eq!(r.category(), "general");
    }

    #[test]
    fn test_set_disabled_chains() {
        let r = route("ping");
        assert!(r.set_disabled(true).describe("x").is_disabled());
        r.set_disabled(false);
        assert!(!r.is_disabled());
    }
}
