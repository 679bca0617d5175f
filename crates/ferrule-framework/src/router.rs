//! Route table with nested sub-routers.
//!
//! A [`Router`] keeps one ordered list of entries. Each entry is either a
//! [`Route`] or a [`Subrouter`] (a child router behind a gate matcher).
//! Resolution walks that list in registration order and descends into a
//! sub-router as soon as its gate matches, so the first match wins across the
//! whole tree no matter whether it is local or nested:
//!
//! ```text
//! root ─┬─ route "ping"
//!       ├─ subrouter gate "config" ─┬─ route " prefix"
//!       │                           └─ route " admins"
//!       └─ route "help"
//! ```
//!
//! # Concurrency
//!
//! The entry list sits behind a [`parking_lot::RwLock`]. Lookups take the
//! read lock; `on`, `off` and sub-router changes take the write lock. Routes
//! are fully built before they are inserted, so a reader never sees a
//! partially constructed route. Enabling, disabling and metadata updates go
//! through the route itself and never take the router lock.
//!
//! A router must not be added as a sub-router of itself or of its own
//! descendants.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{RouterError, RouterResult};
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::matcher::Matcher;
use crate::module::Registrar;
use crate::route::Route;

/// A matched route and the byte range of the match in the searched text.
pub type RouteMatch = (Arc<Route>, Range<usize>);

/// Prefix of routers created for sub-routers.
pub const SUBROUTER_PREFIX: &str = " ";

// =============================================================================
// Subrouter
// =============================================================================

/// A child router gated by its own matcher.
///
/// When the gate matches but no child route does, the sub-router's own route
/// (if any, and if enabled) is returned instead. That route carries the help
/// entry of the group and may have a handler for direct invocation.
pub struct Subrouter {
    gate: Matcher,
    router: Arc<Router>,
    category: String,
    route: RwLock<Option<Arc<Route>>>,
    disabled: AtomicBool,
}

impl Subrouter {
    pub fn gate(&self) -> &Matcher {
        &self.gate
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The route returned when the gate matches but no child does.
    pub fn route(&self) -> Option<Arc<Route>> {
        self.route.read().clone()
    }

    /// Updates the sub-router's own route metadata, creating a handler-less
    /// route on first use. Empty arguments leave fields unchanged.
    pub fn set(&self, name: &str, description: &str, category: &str) -> Arc<Route> {
        let mut slot = self.route.write();
        let route = slot.get_or_insert_with(|| Arc::new(self.new_route(None)));
        route.set(name, description, category);
        Arc::clone(route)
    }

    /// Gives the sub-router a handler for direct invocation.
    ///
    /// Metadata and the disabled flag of an existing route are carried over.
    pub fn handle(&self, handler: BoxedHandler) -> Arc<Route> {
        let mut slot = self.route.write();
        let route = self.new_route(Some(handler));
        if let Some(previous) = slot.as_ref() {
            let meta = previous.meta();
            route.set(&meta.name, &meta.description, &meta.category);
            route.set_disabled(previous.is_disabled());
        }
        let route = Arc::new(route);
        *slot = Some(Arc::clone(&route));
        route
    }

    fn new_route(&self, handler: Option<BoxedHandler>) -> Route {
        let route = Route::new(self.gate.clone(), handler);
        route.set("", "", &self.category);
        route
    }

    /// Enables or disables the whole group for dispatch.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subrouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subrouter")
            .field("gate", &self.gate.as_str())
            .field("category", &self.category)
            .field("routes", &self.router.len())
            .field("disabled", &self.is_disabled())
            .finish()
    }
}

// =============================================================================
// Router
// =============================================================================

/// One element of a router's ordered entry list.
#[derive(Debug, Clone)]
pub enum Entry {
    Route(Arc<Route>),
    Subrouter(Arc<Subrouter>),
}

impl Entry {
    fn in_category(&self, category: &str) -> bool {
        match self {
            Entry::Route(route) => route.category() == category,
            Entry::Subrouter(s) => s.category() == category,
        }
    }
}

/// An ordered collection of routes and sub-routers.
#[derive(Debug, Default)]
pub struct Router {
    /// Prepended to every keyword compiled by [`on`](Self::on).
    prefix: String,
    entries: RwLock<Vec<Entry>>,
}

impl Router {
    /// Creates a root router (empty prefix).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router whose keyword routes require `prefix` first.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns a registrar that files every registration under `category`.
    pub fn scope(self: &Arc<Self>, category: impl Into<String>) -> Registrar {
        Registrar::new(Arc::clone(self), category, serde_json::Value::Null)
    }

    // ─── Registration ───────────────────────────────────────────────────

    /// Registers a keyword route. The keyword is compiled with this router's
    /// prefix and the trailing boundary.
    pub fn on<H: Handler>(&self, keyword: &str, handler: H) -> RouterResult<Arc<Route>> {
        let matcher = Matcher::keyword(&self.prefix, keyword)?;
        Ok(self.add_route(Route::new(matcher, Some(into_handler(handler)))))
    }

    /// Registers a route matched by `pattern` exactly as given.
    pub fn on_reg<H: Handler>(&self, pattern: &str, handler: H) -> RouterResult<Arc<Route>> {
        let matcher = Matcher::pattern(pattern)?;
        Ok(self.add_route(Route::new(matcher, Some(into_handler(handler)))))
    }

    /// Appends a pre-built route.
    pub fn add_route(&self, route: Route) -> Arc<Route> {
        let route = Arc::new(route);
        debug!(pattern = route.matcher().as_str(), "Route registered");
        self.entries.write().push(Entry::Route(Arc::clone(&route)));
        route
    }

    /// Appends a sub-router gated by `gate`.
    pub fn add_subrouter(
        &self,
        category: impl Into<String>,
        gate: Matcher,
        child: Arc<Router>,
    ) -> Arc<Subrouter> {
        let subrouter = Arc::new(Subrouter {
            gate,
            router: child,
            category: category.into(),
            route: RwLock::new(None),
            disabled: AtomicBool::new(false),
        });
        debug!(gate = subrouter.gate.as_str(), "Subrouter registered");
        self.entries
            .write()
            .push(Entry::Subrouter(Arc::clone(&subrouter)));
        subrouter
    }

    /// Creates a child router with the default sub-router prefix behind a
    /// keyword gate.
    pub fn subrouter(&self, category: impl Into<String>, keyword: &str) -> RouterResult<Arc<Subrouter>> {
        let gate = Matcher::gate(keyword)?;
        Ok(self.add_subrouter(
            category,
            gate,
            Arc::new(Router::with_prefix(SUBROUTER_PREFIX)),
        ))
    }

    // ─── Removal ────────────────────────────────────────────────────────

    /// Removes and returns the first local route whose matcher matches
    /// `probe`.
    pub fn off(&self, probe: &str) -> Option<Arc<Route>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|entry| match entry {
            Entry::Route(route) => route.matcher().is_match(probe),
            Entry::Subrouter(_) => false,
        })?;
        match entries.remove(index) {
            Entry::Route(route) => {
                debug!(route = %route.name(), "Route removed");
                Some(route)
            }
            Entry::Subrouter(_) => None,
        }
    }

    /// Removes `subrouter`. Returns `true` if it was registered here.
    pub fn remove_subrouter(&self, subrouter: &Arc<Subrouter>) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| match entry {
            Entry::Subrouter(s) => !Arc::ptr_eq(s, subrouter),
            Entry::Route(_) => true,
        });
        before != entries.len()
    }

    /// Removes every local route and sub-router filed under `category`.
    /// Returns how many entries were removed.
    pub fn remove_category(&self, category: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| !entry.in_category(category));
        let removed = before - entries.len();
        debug!(category, removed, "Category removed");
        removed
    }

    /// Swaps the local entries filed under `category` for `replacement`.
    ///
    /// The replacement takes the position of the first removed entry, or is
    /// appended when nothing was filed under `category`. Both steps happen
    /// under one write lock, so lookups see either the old or the new
    /// entries. Returns how many entries were removed.
    pub fn replace_category(&self, category: &str, replacement: Vec<Entry>) -> usize {
        let mut entries = self.entries.write();
        let at = entries
            .iter()
            .position(|entry| entry.in_category(category))
            .unwrap_or(entries.len());
        let before = entries.len();
        // Everything before `at` is kept, so `at` stays a valid position.
        entries.retain(|entry| !entry.in_category(category));
        let removed = before - entries.len();
        let added = replacement.len();
        entries.splice(at..at, replacement);
        debug!(category, removed, added, at, "Category replaced");
        removed
    }

    /// Appends entries built elsewhere, e.g. in a scratch router.
    pub fn extend(&self, new: Vec<Entry>) {
        self.entries.write().extend(new);
    }

    // ─── Lookup ─────────────────────────────────────────────────────────

    /// First route matching `text`, disabled ones included.
    pub fn find_match(&self, text: &str) -> Option<RouteMatch> {
        self.find(text, false)
    }

    /// First enabled route matching `text`.
    pub fn find_enabled_match(&self, text: &str) -> Option<RouteMatch> {
        self.find(text, true)
    }

    fn find(&self, text: &str, enabled_only: bool) -> Option<RouteMatch> {
        let entries = self.entries.read();

        for entry in entries.iter() {
            match entry {
                Entry::Route(route) => {
                    if enabled_only && route.is_disabled() {
                        continue;
                    }
                    if let Some(loc) = route.matcher().find(text) {
                        trace!(pattern = route.matcher().as_str(), ?loc, "Route matched");
                        return Some((Arc::clone(route), loc));
                    }
                }
                Entry::Subrouter(sub) => {
                    if enabled_only && sub.is_disabled() {
                        continue;
                    }
                    let Some(loc) = sub.gate.find(text) else {
                        continue;
                    };
                    trace!(gate = sub.gate.as_str(), ?loc, "Subrouter gate matched");

                    if let Some((route, inner)) = sub.router.find(&text[loc.end..], enabled_only) {
                        return Some((route, loc.start..loc.end + inner.end));
                    }
                    if let Some(route) = sub.route()
                        && !(enabled_only && route.is_disabled())
                    {
                        return Some((route, loc));
                    }
                }
            }
        }

        None
    }

    /// Enables or disables the route `name` resolves to.
    pub fn set_disabled(&self, name: &str, disabled: bool) -> RouterResult<()> {
        let (route, _) = self
            .find_match(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;
        route.set_disabled(disabled);
        debug!(route = %route.name(), disabled, "Route toggled");
        Ok(())
    }

    // ─── Introspection ──────────────────────────────────────────────────

    /// Snapshot of the local entry list.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.read().clone()
    }

    /// Local routes only.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.entries
            .read()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Route(route) => Some(Arc::clone(route)),
                Entry::Subrouter(_) => None,
            })
            .collect()
    }

    /// Local sub-routers only.
    pub fn subrouters(&self) -> Vec<Arc<Subrouter>> {
        self.entries
            .read()
            .iter()
            .filter_map(|entry| match entry {
                Entry::Subrouter(s) => Some(Arc::clone(s)),
                Entry::Route(_) => None,
            })
            .collect()
    }

    /// Every route in the tree: local routes in order, and for each
    /// sub-router its own route followed by its children.
    pub fn all_routes(&self) -> Vec<Arc<Route>> {
        let mut routes = Vec::new();
        for entry in self.entries() {
            match entry {
                Entry::Route(route) => routes.push(route),
                Entry::Subrouter(sub) => {
                    routes.extend(sub.route());
                    routes.extend(sub.router.all_routes());
                }
            }
        }
        routes
    }

    /// Number of local entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
