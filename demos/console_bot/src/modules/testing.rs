//! In-memory harness for exercising modules through a real dispatcher.

use std::sync::Arc;
use std::time::Duration;

use ferrule::core::{MemorySession, MemoryStore, MessageEvent, User};
use ferrule::framework::{BoxedModule, DispatchOutcome, Services};
use ferrule::prelude::*;
use serde_json::Value;

pub struct TestBot {
    pub dispatcher: Dispatcher,
    pub session: Arc<MemorySession>,
}

impl TestBot {
    pub fn new(modules: Vec<BoxedModule>) -> Self {
        Self::with_settings(modules, Value::Null)
    }

    /// Builds every module with the same settings block.
    pub fn with_settings(modules: Vec<BoxedModule>, settings: Value) -> Self {
        let router = Arc::new(Router::new());
        for module in &modules {
            let mut r = Registrar::new(Arc::clone(&router), module.category(), settings.clone());
            module.build(&mut r).unwrap();
        }

        let session = Arc::new(MemorySession::new(User::bot("1000", "ferrule")));
        let services = Services::new(
            Arc::clone(&session) as _,
            router,
            Arc::new(MemoryStore::new()),
            DispatcherConfig::default(),
        );
        Self {
            dispatcher: Dispatcher::new(Arc::new(services)),
            session,
        }
    }

    /// Dispatches without waiting for the handler.
    pub async fn send(&self, content: &str) -> DispatchOutcome {
        let message = MessageEvent::new("c1", User::new("42", "tester"), content).in_guild("g1");
        self.dispatcher.handle_message(message).await
    }

    pub async fn settle(&self) {
        while !self.dispatcher.tracker().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// Texts sent so far, drained.
    pub fn replies(&self) -> Vec<String> {
        self.session
            .take_sent()
            .iter()
            .filter_map(|sent| sent.text().map(str::to_string))
            .collect()
    }

    /// Dispatches, waits for the handler and returns its replies.
    pub async fn say(&self, content: &str) -> Vec<String> {
        self.send(content).await;
        self.settle().await;
        self.replies()
    }
}
