//! Handler system for the Ferrule framework.
//!
//! A [`Handler`] receives the [`DispatchContext`] of one invocation and runs to
//! completion on its own task. Any `async fn(DispatchContext)` (or closure
//! returning such a future) is a handler through the blanket implementation.
//!
//! Handlers return `()`. Failures are the handler's own business: the expected
//! pattern is to report them to the user with
//! [`reply_error`](DispatchContext::reply_error).
//!
//! # Example
//!
//! ```rust,ignore
//! use ferrule_framework::{DispatchContext, into_handler};
//!
//! async fn ping(ctx: DispatchContext) {
//!     let _ = ctx.reply("pong").await;
//! }
//!
//! let handler = into_handler(ping);
//! ```
//!
//! # Middleware
//!
//! A [`Middleware`] runs before a handler and may short-circuit the invocation
//! by returning `None`, or pass an enriched context on (typically after
//! writing to its scratch bag). [`with_middleware`] layers one over a handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::DispatchContext;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Handler Trait
// ============================================================================

/// Something a route can invoke.
pub trait Handler: Send + Sync + 'static {
    /// Runs the handler for one invocation.
    fn call(&self, ctx: DispatchContext) -> BoxFuture<'static, ()>;
}

impl<F, Fut> Handler for F
where
    F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: DispatchContext) -> BoxFuture<'static, ()> {
        Box::pin((self)(ctx))
    }
}

/// A type-erased handler that can be stored in routes.
pub type BoxedHandler = Arc<dyn Handler>;

/// Convert a handler into a boxed handler.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

// ============================================================================
// Middleware
// ============================================================================

/// Runs ahead of a handler.
///
/// Returning `None` ends the invocation; the middleware is then responsible
/// for telling the user why (e.g. a permission notice).
pub trait Middleware: Send + Sync + 'static {
    fn before(&self, ctx: DispatchContext) -> BoxFuture<'static, Option<DispatchContext>>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<DispatchContext>> + Send + 'static,
{
    fn before(&self, ctx: DispatchContext) -> BoxFuture<'static, Option<DispatchContext>> {
        Box::pin((self)(ctx))
    }
}

/// A handler wrapped by a middleware.
struct Layered {
    middleware: Arc<dyn Middleware>,
    inner: BoxedHandler,
}

impl Handler for Layered {
    fn call(&self, ctx: DispatchContext) -> BoxFuture<'static, ()> {
        let middleware = Arc::clone(&self.middleware);
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            if let Some(ctx) = middleware.before(ctx).await {
                inner.call(ctx).await;
            }
        })
    }
}

/// Layers `middleware` over `handler`.
pub fn with_middleware<M: Middleware>(middleware: M, handler: BoxedHandler) -> BoxedHandler {
    Arc::new(Layered {
        middleware: Arc::new(middleware),
        inner: handler,
    })
}

/// Layers a shared middleware over `handler`.
///
/// Used when one middleware guards every route of a sub-router.
pub fn with_shared_middleware(middleware: Arc<dyn Middleware>, handler: BoxedHandler) -> BoxedHandler {
    Arc::new(Layered {
        middleware,
        inner: handler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;
    use crate::context::Services;
    use crate::dispatcher::DispatcherConfig;
    use crate::router::Router;
    use ferrule_core::{MemorySession, MemoryStore, MessageEvent, User};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(author: &str) -> DispatchContext {
        let services = Services::new(
            Arc::new(MemorySession::new(User::bot("42", "ferrule"))),
            Arc::new(Router::new()),
            Arc::new(MemoryStore::new()),
            DispatcherConfig::default(),
        );
        let message = MessageEvent::new("c1", User::new(author, author), "!cmd");
        DispatchContext::new(Arc::new(message), Args::default(), None, "!", Arc::new(services))
    }

    fn counting(hits: &Arc<AtomicUsize>) -> BoxedHandler {
        let hits = Arc::clone(hits);
        into_handler(move |ctx: DispatchContext| {
            let hits = Arc::clone(&hits);
            async move {
                let tagged = ctx.get::<&'static str>("tag").unwrap_or("none");
                assert_eq!(tagged, "checked");
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    async fn only_alice(mut ctx: DispatchContext) -> Option<DispatchContext> {
        if ctx.author_id() != "alice" {
            return None;
        }
        ctx.set("tag", "checked");
        Some(ctx)
    }

    #[test]
    fn test_middleware_passes_enriched_context() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = with_middleware(only_alice, counting(&hits));
        tokio_test::block_on(handler.call(context("alice")));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_middleware_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = with_middleware(only_alice, counting(&hits));
        tokio_test::block_on(handler.call(context("mallory")));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_shared_middleware_guards_many_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let shared: Arc<dyn Middleware> = Arc::new(only_alice);
        let first = with_shared_middleware(Arc::clone(&shared), counting(&hits));
        let second = with_shared_middleware(shared, counting(&hits));
        tokio_test::block_on(async {
            first.call(context("alice")).await;
            second.call(context("alice")).await;
            second.call(context("bob")).await;
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
