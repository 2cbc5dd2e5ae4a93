//! Fire-and-forget handoff of flushed batches to the batch handler.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Consumes one flushed batch.
///
/// Every invocation runs on its own detached task. The executor never sees
/// whether it finished, failed or panicked, so retries, logging and error
/// reporting belong inside the handler.
#[async_trait]
pub trait BatchHandler<T>: Send + Sync + 'static {
    async fn handle(&self, batch: Vec<T>);
}

#[async_trait]
impl<T, F, Fut> BatchHandler<T> for F
where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, batch: Vec<T>) {
        (self)(batch).await
    }
}

/// Spawns one task per batch and never joins it.
pub struct Dispatcher<T> {
    handler: Arc<dyn BatchHandler<T>>,
}

impl<T: Send + 'static> Dispatcher<T> {
    pub fn new<H: BatchHandler<T>>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, batch: Vec<T>) {
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            handler.handle(batch).await;
        });
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}
