//! Main runtime orchestration.
//!
//! The runtime owns the root [`Router`], builds the registered modules into
//! it, applies the startup command policy and then pumps an [`EventSource`]
//! into a [`Dispatcher`] until the source closes or shutdown is requested.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use ferrule_runtime::FerruleRuntime;
//!
//! // Simplest way - auto-loads config from current directory
//! let runtime = FerruleRuntime::new();
//!
//! // Custom configuration path
//! let runtime = FerruleRuntime::builder()
//!     .config_file("config/ferrule.toml")
//!     .build()?;
//!
//! runtime.register_module(HelpModule);
//! runtime.run(events, session).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{ConfigLoader, ConfigResult, FerruleConfig, StorageBackend};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use ferrule_core::{
    BoxedSession, BoxedStore, EventSource, GatewayEvent, JsonFileStore, MemoryStore, StoreError,
};
use ferrule_framework::{BoxedModule, Dispatcher, Module, Registrar, Router, Services};

/// The main Ferrule runtime.
///
/// # Simple Usage
///
/// ```rust,ignore
/// use ferrule_runtime::FerruleRuntime;
///
/// // Auto-loads config from ferrule.toml in current directory
/// let runtime = FerruleRuntime::new();
///
/// runtime.register_module(GeneralModule);
/// runtime.run(events, session).await?;
/// ```
pub struct FerruleRuntime {
    /// The configuration.
    config: FerruleConfig,
    /// Root router shared with every dispatcher.
    router: Arc<Router>,
    /// Registered modules, in registration order.
    modules: Mutex<Vec<BoxedModule>>,
    /// Whether the modules have been built into the router.
    built: AtomicBool,
    /// Store override, or the store opened from configuration.
    store: Mutex<Option<BoxedStore>>,
    /// Whether the event loop is running.
    running: AtomicBool,
    /// Cancelling this stops the event loop.
    shutdown: CancellationToken,
}

impl FerruleRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// This will:
    /// 1. Search for `ferrule.toml` in the current directory
    /// 2. Initialize logging based on the configuration
    ///
    /// If no valid configuration is found, default settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                FerruleConfig::default()
            });

        Self::from_config(config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration and initializes logging.
    pub fn from_config(config: FerruleConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            prefix = %config.bot.prefix,
            log_level = %config.logging.level,
            storage = ?config.storage.backend,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            router: Arc::new(Router::new()),
            modules: Mutex::new(Vec::new()),
            built: AtomicBool::new(false),
            store: Mutex::new(None),
            running: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    /// Uses `store` instead of the configured backend.
    pub fn with_store(self, store: BoxedStore) -> Self {
        *self.store.lock() = Some(store);
        self
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &FerruleConfig {
        &self.config
    }

    /// The root router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// A token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Returns whether the event loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Modules
    // =========================================================================

    /// Registers a module.
    ///
    /// Modules are built in registration order when the runtime starts. A
    /// module registered after that is built immediately.
    pub fn register_module<M: Module>(&self, module: M) -> RuntimeResult<()> {
        self.register_boxed(Box::new(module))
    }

    /// Registers several modules at once.
    ///
    /// ```rust,ignore
    /// runtime.register_modules(builtin_modules())?;
    /// ```
    pub fn register_modules(
        &self,
        modules: impl IntoIterator<Item = BoxedModule>,
    ) -> RuntimeResult<()> {
        for module in modules {
            self.register_boxed(module)?;
        }
        Ok(())
    }

    fn register_boxed(&self, module: BoxedModule) -> RuntimeResult<()> {
        let mut modules = self.modules.lock();
        if self.built.load(Ordering::SeqCst) && self.config.modules.is_selected(module.name()) {
            let scratch = self.build_scratch(module.as_ref())?;
            self.router.extend(scratch.entries());
        }
        debug!(module = module.name(), "Registered module");
        modules.push(module);
        Ok(())
    }

    /// Names of all registered modules.
    pub fn module_names(&self) -> Vec<String> {
        self.modules
            .lock()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    fn build_module(&self, router: &Arc<Router>, module: &dyn Module) -> RuntimeResult<()> {
        let name = module.name();
        let mut registrar = Registrar::new(
            Arc::clone(router),
            module.category(),
            self.config.modules.settings_for(name),
        );
        module
            .build(&mut registrar)
            .map_err(|source| RuntimeError::Module {
                module: name.to_string(),
                source,
            })?;
        debug!(module = name, category = module.category(), "Module built");
        Ok(())
    }

    /// Builds `module` into a detached router and applies the command policy
    /// to its routes only, leaving runtime toggles on the root untouched.
    fn build_scratch(&self, module: &dyn Module) -> RuntimeResult<Arc<Router>> {
        let scratch = Arc::new(Router::with_prefix(self.router.prefix()));
        self.build_module(&scratch, module)?;
        self.apply_policy_to(&scratch, false);
        Ok(scratch)
    }

    /// Builds every selected module into the router, then applies the
    /// startup command policy. Later calls do nothing.
    ///
    /// Fails on the first module whose routes cannot be registered.
    pub fn build_routes(&self) -> RuntimeResult<()> {
        let modules = self.modules.lock();
        if self.built.load(Ordering::SeqCst) {
            return Ok(());
        }

        for module in modules.iter() {
            if !self.config.modules.is_selected(module.name()) {
                info!(module = module.name(), "Module skipped by configuration");
                continue;
            }
            self.build_module(&self.router, module.as_ref())?;
        }
        self.built.store(true, Ordering::SeqCst);

        let disabled = self.apply_command_policy();
        info!(
            modules = modules.len(),
            routes = self.router.all_routes().len(),
            disabled,
            "Routes built"
        );
        Ok(())
    }

    /// Builds module `name` again and swaps its routes in.
    ///
    /// The old routes are found by the module's category, so modules sharing
    /// a category are replaced together. The new routes take the place of the
    /// old ones, keeping their precedence over later registrations, and
    /// dispatch never sees the module without routes. Returns the number of
    /// replaced entries.
    pub fn reload_module(&self, name: &str) -> RuntimeResult<usize> {
        let modules = self.modules.lock();
        let module = modules
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| RuntimeError::ModuleNotFound(name.to_string()))?;

        let scratch = self.build_scratch(module.as_ref())?;
        let removed = self
            .router
            .replace_category(module.category(), scratch.entries());
        info!(module = name, removed, "Module reloaded");
        Ok(removed)
    }

    /// Applies `bot.whitelist_commands` and `bot.disabled_commands` to the
    /// whole route tree.
    ///
    /// With a non-empty whitelist every route is disabled first and only the
    /// whitelisted ones are enabled again. Unknown names are logged and
    /// skipped. Returns the number of disabled routes afterwards.
    pub fn apply_command_policy(&self) -> usize {
        self.apply_policy_to(&self.router, true)
    }

    fn apply_policy_to(&self, router: &Router, report_unknown: bool) -> usize {
        let bot = &self.config.bot;
        let not_found = |kind: &str, name: &str| {
            if report_unknown {
                warn!(command = %name, "{kind} command not found");
            } else {
                trace!(command = %name, "{kind} command not in this module");
            }
        };

        if !bot.whitelist_commands.is_empty() {
            for route in router.all_routes() {
                route.set_disabled(true);
            }
            for name in &bot.whitelist_commands {
                if router.set_disabled(name, false).is_err() {
                    not_found("Whitelisted", name);
                }
            }
        }

        for name in &bot.disabled_commands {
            if router.set_disabled(name, true).is_err() {
                not_found("Disabled", name);
            }
        }

        router
            .all_routes()
            .iter()
            .filter(|r| r.is_disabled())
            .count()
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Returns the store, opening the configured backend on first use.
    pub async fn open_store(&self) -> RuntimeResult<BoxedStore> {
        if let Some(store) = self.store.lock().clone() {
            return Ok(store);
        }

        let storage = &self.config.storage;
        let store: BoxedStore = match storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Json => {
                let path = storage.path.as_deref().ok_or_else(|| {
                    StoreError::Backend("storage.path is required for the json backend".into())
                })?;
                Arc::new(JsonFileStore::open(path).await?)
            }
        };
        info!(backend = ?storage.backend, path = ?storage.path, "Store opened");

        Ok(Arc::clone(self.store.lock().get_or_insert(store)))
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Runs until Ctrl+C, SIGTERM, the shutdown token, or the end of `source`.
    pub async fn run<S: EventSource>(&self, source: S, session: BoxedSession) -> RuntimeResult<()> {
        self.run_until(source, session, wait_for_signal()).await
    }

    /// Runs until `shutdown` completes, the shutdown token is cancelled, or
    /// `source` ends.
    ///
    /// `source.next_event()` must be cancel-safe: it is dropped mid-wait when
    /// shutdown wins the race.
    pub async fn run_until<S, F>(
        &self,
        source: S,
        session: BoxedSession,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }
        let result = self.event_loop(source, session, shutdown).await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn event_loop<S, F>(
        &self,
        mut source: S,
        session: BoxedSession,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        self.build_routes()?;
        let store = self.open_store().await?;

        let services = Services::new(
            session,
            Arc::clone(&self.router),
            store,
            self.config.bot.dispatcher_config(),
        );
        let dispatcher = Dispatcher::new(Arc::new(services));

        info!(
            prefix = %self.config.bot.prefix,
            "Ferrule runtime is now running. Press Ctrl+C to stop."
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                event = source.next_event() => match event {
                    Some(event) => Self::handle_event(&dispatcher, event).await,
                    None => {
                        info!("Event source closed");
                        break;
                    }
                },
            }
        }

        let grace = self.config.runtime.shutdown_grace();
        let in_flight = dispatcher.tracker().len();
        if in_flight > 0 {
            info!(in_flight, grace_ms = grace.as_millis() as u64, "Waiting for running handlers");
        }
        if !dispatcher.shutdown(grace).await {
            warn!(
                still_running = dispatcher.tracker().len(),
                "Shutdown grace period elapsed with handlers still running"
            );
        }

        info!("Runtime stopped");
        Ok(())
    }

    async fn handle_event(dispatcher: &Dispatcher, event: GatewayEvent) {
        trace!(event = event.event_name(), "Event received");
        match event {
            GatewayEvent::Ready(ready) => {
                info!(
                    user = %ready.user.name,
                    user_id = %ready.user.id,
                    guilds = ready.guild_count,
                    "Connected"
                );
            }
            GatewayEvent::MessageCreate(message) => {
                let message_id = message.id.clone();
                let outcome = dispatcher.handle_message(message).await;
                trace!(%message_id, ?outcome, "Message handled");
            }
        }
    }
}

impl Default for FerruleRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
///
/// If no signal handler can be installed this never completes, leaving
/// shutdown to the token or the event source.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => match result {
                        Ok(()) => info!("Received Ctrl+C, shutting down"),
                        Err(e) => {
                            warn!(error = %e, "Failed to listen for Ctrl+C");
                            sigterm.recv().await;
                            info!("Received SIGTERM, shutting down");
                        }
                    },
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `FerruleRuntime` with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = FerruleRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Overrides one configuration value by dotted key path.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<FerruleRuntime> {
        let config = self.config_loader.load()?;
        Ok(FerruleRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
