pub mod document_store;
pub mod memory_store;
pub mod redis_store;

pub use document_store::{Document, DocumentClient, DocumentStore};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use shared::Result;
use stash::{BackendFactory, CacheBackend, CacheFacade, ExpiryScheduler, Initialised, TokioScheduler};
use std::sync::Arc;

/// Builds the stock backends: [`MemoryStore`] in process and [`RedisStore`] for remote
#[derive(Clone)]
pub struct DefaultBackendFactory {
    scheduler: Arc<dyn ExpiryScheduler>,
}

impl DefaultBackendFactory {
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(TokioScheduler::new()))
    }

    pub fn with_scheduler(scheduler: Arc<dyn ExpiryScheduler>) -> Self {
        Self { scheduler }
    }
}

impl Default for DefaultBackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn in_process(&self) -> Arc<dyn CacheBackend> {
        Arc::new(MemoryStore::with_scheduler(self.scheduler.clone()))
    }

    fn key_value(&self, address: &str) -> Arc<dyn CacheBackend> {
        Arc::new(RedisStore::new(address))
    }
}

/// Initialise a cache facade using the stock backends
pub async fn initialise(address: &str, use_remote: bool) -> Result<Initialised> {
    CacheFacade::initialise(&DefaultBackendFactory::new(), address, use_remote).await
}
