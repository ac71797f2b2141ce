//! Command handler trait and the registry binding handler keys to implementations.

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::router::{HandlerContext, Invocation};

/// The body of a command.
///
/// Handlers receive the canonical [`Invocation`] (including its responder) and a
/// [`HandlerContext`] giving access to the session manager and the catalog. They
/// never see the raw platform event, cooldown state or session storage.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Any error is logged by the router and reported to the caller as a generic
    /// failure; its details are never shown to the user.
    async fn execute(&self, invocation: Invocation, context: HandlerContext) -> anyhow::Result<()>;
}

/// Handler built from an async closure.
pub struct FnHandler<F> {
    func: F,
}

/// Wraps an async closure into a shareable [`CommandHandler`].
pub fn handler_fn<F, Fut>(func: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Invocation, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler {
        func: move |invocation: Invocation,
                    context: HandlerContext|
              -> BoxFuture<'static, anyhow::Result<()>> {
            Box::pin(func(invocation, context))
        },
    })
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(Invocation, HandlerContext) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    async fn execute(&self, invocation: Invocation, context: HandlerContext) -> anyhow::Result<()> {
        (self.func)(invocation, context).await
    }
}

/// Maps handler keys named in command sources to their implementations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `key`, replacing any previous binding.
    pub fn register(&mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(key.into().to_ascii_lowercase(), handler);
    }

    /// Builder form of [`HandlerRegistry::register`].
    pub fn with(mut self, key: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        self.register(key, handler);
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&key.to_ascii_lowercase()).cloned()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &keys)
            .finish()
    }
}
