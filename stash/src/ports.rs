#![deny(clippy::all)]

use crate::domain::response::{DeleteResponse, GetResponse, PutResponse};
use crate::domain::{BackendKind, ExpiringRecord, Record, Value};
use async_trait::async_trait;
use futures::future::BoxFuture;
use shared::{Key, Result};
use std::sync::Arc;
use std::time::Duration;

// Ports are the pluggable extension points for underlying cache implementations

/// Operation set every storage backend satisfies
#[async_trait]
pub trait CacheBackend: Send + Sync + 'static {
    fn kind(&self) -> BackendKind;

    /// Backend-specific setup; a ready backend answers with [`crate::READINESS_TOKEN`]
    async fn initialise(&self) -> Result<String>;

    /// Insert or overwrite the record under its normalized key
    async fn store_record(&self, record: Record) -> Result<PutResponse>;

    /// Insert immediately and delete the key once the record's ttl has elapsed
    async fn store_expiring_record(&self, record: ExpiringRecord) -> Result<PutResponse>;

    /// Absent keys come back as `Error::NotFound`
    async fn read_cache(&self, key: &Key) -> Result<GetResponse<Value>>;

    /// Succeeds whether or not the key was present
    async fn delete_from_cache(&self, key: &Key) -> Result<DeleteResponse>;
}

/// Port for creating backends
/// This allows different storage engines to be plugged into the facade
pub trait BackendFactory: Send + Sync + 'static {
    fn in_process(&self) -> Arc<dyn CacheBackend>;
    fn key_value(&self, address: &str) -> Arc<dyn CacheBackend>;
}

/// Deferred work run once by an [`ExpiryScheduler`]
pub type ExpiryTask = BoxFuture<'static, ()>;

/// Port for one-shot delayed work, used to expire records
pub trait ExpiryScheduler: Send + Sync + 'static {
    /// Run `task` after `delay` without blocking the caller
    fn schedule(&self, delay: Duration, task: ExpiryTask);
}
