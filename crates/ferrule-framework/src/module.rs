//! Feature modules and their registration scope.
//!
//! A [`Module`] contributes routes to the root router once, at startup. The
//! runtime hands every module a [`Registrar`] scoped to that module's category
//! and configuration block:
//!
//! ```rust,ignore
//! use ferrule_framework::{Module, Registrar, RouterResult, DispatchContext};
//!
//! struct General;
//!
//! async fn ping(ctx: DispatchContext) {
//!     let _ = ctx.reply("pong").await;
//! }
//!
//! impl Module for General {
//!     fn name(&self) -> &str {
//!         "general"
//!     }
//!
//!     fn build(&self, r: &mut Registrar) -> RouterResult<()> {
//!         r.on("ping", ping)?.describe("Replies with pong");
//!         Ok(())
//!     }
//! }
//! ```
//!
//! The category is threaded through the registrar instead of living on the
//! router, so one module's category can never leak into another's routes.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RouterResult;
use crate::handler::{BoxedHandler, Handler, Middleware, into_handler, with_shared_middleware};
use crate::matcher::Matcher;
use crate::route::Route;
use crate::router::{Router, Subrouter};

/// A unit of bot functionality.
pub trait Module: Send + Sync + 'static {
    /// Unique module name, used for selection in configuration.
    fn name(&self) -> &str;

    /// Category filed on every route the module registers.
    fn category(&self) -> &str {
        self.name()
    }

    /// Registers the module's routes.
    fn build(&self, registrar: &mut Registrar) -> RouterResult<()>;
}

/// A boxed module.
pub type BoxedModule = Box<dyn Module>;

/// Registration handle scoped to one router, category and configuration.
#[derive(Clone)]
pub struct Registrar {
    router: Arc<Router>,
    category: String,
    config: Value,
    middleware: Option<Arc<dyn Middleware>>,
}

impl Registrar {
    pub fn new(router: Arc<Router>, category: impl Into<String>, config: Value) -> Self {
        Self {
            router,
            category: category.into(),
            config,
            middleware: None,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The module's raw configuration block (`Null` when absent).
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Deserializes the configuration block, using `T::default()` when absent.
    pub fn config_as<T: DeserializeOwned + Default>(&self) -> Result<T, serde_json::Error> {
        if self.config.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.config.clone())
    }

    /// Returns a registrar whose handlers all run behind `middleware`.
    pub fn with_middleware<M: Middleware>(&self, middleware: M) -> Self {
        Self {
            middleware: Some(Arc::new(middleware)),
            ..self.clone()
        }
    }

    fn wrap<H: Handler>(&self, handler: H) -> BoxedHandler {
        let handler = into_handler(handler);
        match &self.middleware {
            Some(middleware) => with_shared_middleware(Arc::clone(middleware), handler),
            None => handler,
        }
    }

    fn insert(&self, matcher: Matcher, handler: BoxedHandler) -> Arc<Route> {
        let route = Route::new(matcher, Some(handler));
        route.set("", "", &self.category);
        self.router.add_route(route)
    }

    /// Registers a keyword route under this registrar's category.
    pub fn on<H: Handler>(&self, keyword: &str, handler: H) -> RouterResult<Arc<Route>> {
        let matcher = Matcher::keyword(self.router.prefix(), keyword)?;
        Ok(self.insert(matcher, self.wrap(handler)))
    }

    /// Registers a raw-pattern route under this registrar's category.
    pub fn on_reg<H: Handler>(&self, pattern: &str, handler: H) -> RouterResult<Arc<Route>> {
        let matcher = Matcher::pattern(pattern)?;
        Ok(self.insert(matcher, self.wrap(handler)))
    }

    /// Adds a keyword-gated sub-router under this registrar's category.
    pub fn subrouter(&self, keyword: &str) -> RouterResult<Arc<Subrouter>> {
        self.router.subrouter(self.category.clone(), keyword)
    }

    /// Gives `subrouter` a handler for direct invocation.
    pub fn on_subrouter<H: Handler>(&self, subrouter: &Subrouter, handler: H) -> Arc<Route> {
        let route = subrouter.handle(self.wrap(handler));
        route.set("", "", &self.category);
        route
    }

    /// A registrar for the child router of `subrouter`, keeping this
    /// registrar's category, configuration and middleware.
    pub fn nested(&self, subrouter: &Subrouter) -> Self {
        Self {
            router: Arc::clone(subrouter.router()),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("category", &self.category)
            .field("prefix", &self.router.prefix())
            .field("has_middleware", &self.middleware.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DispatchContext;
    use serde::Deserialize;

    async fn noop(_ctx: DispatchContext) {}

    struct Music;

    impl Module for Music {
        fn name(&self) -> &str {
            "music"
        }

        fn build(&self, r: &mut Registrar) -> RouterResult<()> {
            let music = r.subrouter("music|m")?;
            music.set("music", "Music player", "");
            let nested = r.nested(&music);
            nested.on("play", noop)?.describe("Plays a song");
            nested.on("stop", noop)?;
            Ok(())
        }
    }

    #[test]
    fn test_registrar_threads_category() {
        let router = Arc::new(Router::new());
        let registrar = router.scope("general");
        registrar.on("ping", noop).unwrap();

        let mut music = Registrar::new(Arc::clone(&router), Music.category(), Value::Null);
        Music.build(&mut music).unwrap();

        // Registering through a fresh scope is unaffected by earlier ones.
        let late = router.on("late", noop).unwrap();
        assert_eq!(late.category(), "");

        let categories: Vec<(String, String)> = router
            .all_routes()
            .iter()
            .map(|r| (r.name(), r.category()))
            .collect();
        assert_eq!(
            categories,
            vec![
                ("ping".into(), "general".into()),
                ("music".into(), "music".into()),
                ("play".into(), "music".into()),
                ("stop".into(), "music".into()),
                ("late".into(), "".into()),
            ]
        );
    }

    #[test]
    fn test_nested_routes_match_through_gate() {
        let router = Arc::new(Router::new());
        let mut r = router.scope("music");
        Music.build(&mut r).unwrap();

        let (route, _) = router.find_enabled_match("m play song").unwrap();
        assert_eq!(route.description(), "Plays a song");
        let (route, _) = router.find_enabled_match("music").unwrap();
        assert_eq!(route.name(), "music");
    }

    #[test]
    fn test_build_error_propagates() {
        struct Broken;
        impl Module for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn build(&self, r: &mut Registrar) -> RouterResult<()> {
                r.on("ok", noop)?;
                r.on_reg("(unclosed", noop)?;
                Ok(())
            }
        }

        let router = Arc::new(Router::new());
        let mut r = router.scope("broken");
        assert!(Broken.build(&mut r).is_err());
    }

    #[test]
    fn test_config_as() {
        #[derive(Debug, Default, Deserialize, PartialEq)]
        struct NotesConfig {
            #[serde(default)]
            max_notes: usize,
        }

        let router = Arc::new(Router::new());
        let empty = Registrar::new(Arc::clone(&router), "notes", Value::Null);
        assert_eq!(empty.config_as::<NotesConfig>().unwrap(), NotesConfig::default());

        let set = Registrar::new(router, "notes", serde_json::json!({ "max_notes": 5 }));
        assert_eq!(set.config_as::<NotesConfig>().unwrap().max_notes, 5);
    }
}
