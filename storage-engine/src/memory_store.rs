use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{Error, Key, Result};
use stash::domain::response::{DeleteResponse, GetResponse, PutResponse};
use stash::{BackendKind, CacheBackend, ExpiringRecord, ExpiryScheduler, READINESS_TOKEN, Record, TokioScheduler, Value};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

type Table = Arc<Mutex<HashMap<Key, Value>>>;

/// In-process cache with self-expiring records.
///
/// Every read, write and delete, including the deletes fired by expiry
/// timers, takes the one table lock for a single map operation. The lock is
/// never held across a suspension point.
///
/// Expiry timers are never cancelled. Re-storing or deleting a key does not
/// disarm a timer already pending for it, and a firing timer removes whatever
/// value occupies the key at that moment.
pub struct MemoryStore {
    table: Table,
    scheduler: Arc<dyn ExpiryScheduler>,
}

impl MemoryStore {
    /// Create an empty store that expires records on the Tokio runtime
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(TokioScheduler::new()))
    }

    pub fn with_scheduler(scheduler: Arc<dyn ExpiryScheduler>) -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            scheduler,
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::InProcess
    }

    async fn initialise(&self) -> Result<String> {
        info!("Memory store - online");
        Ok(READINESS_TOKEN.to_string())
    }

    async fn store_record(&self, record: Record) -> Result<PutResponse> {
        self.table.lock().insert(record.key, record.value);
        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn store_expiring_record(&self, record: ExpiringRecord) -> Result<PutResponse> {
        let ExpiringRecord { key, value, ttl } = record;

        self.table.lock().insert(key.clone(), Value::Scalar(value));

        let table = Arc::clone(&self.table);
        self.scheduler.schedule(
            ttl,
            Box::pin(async move {
                let removed = table.lock().remove(&key).is_some();
                debug!("Expiry fired for key '{}' (removed: {})", key, removed);
            }),
        );

        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn read_cache(&self, key: &Key) -> Result<GetResponse<Value>> {
        let value = self.table.lock().get(key).cloned();
        match value {
            Some(value) => Ok(GetResponse::new(value)),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn delete_from_cache(&self, key: &Key) -> Result<DeleteResponse> {
        let existed = self.table.lock().remove(key).is_some();
        Ok(DeleteResponse::new(existed))
    }
}

impl Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash::ExpiryTask;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Holds scheduled tasks until the test fires them explicitly
    #[derive(Default)]
    struct ManualScheduler {
        pending: Mutex<Vec<(Duration, ExpiryTask)>>,
    }

    impl ManualScheduler {
        fn delays(&self) -> Vec<Duration> {
            self.pending.lock().iter().map(|(d, _)| *d).collect()
        }

        async fn fire(&self, index: usize) {
            let (_, task) = self.pending.lock().remove(index);
            task.await;
        }
    }

    impl ExpiryScheduler for ManualScheduler {
        fn schedule(&self, delay: Duration, task: ExpiryTask) {
            self.pending.lock().push((delay, task));
        }
    }

    fn key(raw: &str) -> Key {
        Key::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_initialise_returns_readiness_token() {
        let store = MemoryStore::new();
        assert_eq!(store.initialise().await.unwrap(), "PONG");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_put_and_get_case_insensitive() {
        let store = MemoryStore::new();

        let put = store
            .store_record(Record::new("ABC12", "38240").unwrap())
            .await
            .unwrap();
        assert!(put.stored);

        let get = store.read_cache(&key("abc12")).await.unwrap();
        assert!(get.found);
        assert_eq!(get.value, Value::from("38240"));
    }

    #[tokio::test]
    async fn test_memory_store_structured_value() {
        let store = MemoryStore::new();
        let mut map = stash::domain::ValueMap::new();
        map.insert("value".to_string(), serde_json::json!("FFA45722AA7"));
        map.insert("seats".to_string(), serde_json::json!(5));

        store
            .store_record(Record::new("38212", map.clone()).unwrap())
            .await
            .unwrap();

        let get = store.read_cache(&key("38212")).await.unwrap();
        assert_eq!(get.value.as_map(), Some(&map));
    }

    #[tokio::test]
    async fn test_memory_store_get_nonexistent() {
        let store = MemoryStore::new();

        let result = store.read_cache(&key("38225")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store_delete() {
        let store = MemoryStore::new();
        store
            .store_record(Record::new("test_key", "test_value").unwrap())
            .await
            .unwrap();

        let deleted = store.delete_from_cache(&key("test_key")).await.unwrap();
        assert!(deleted.deleted);
        assert!(deleted.existed);

        let result = store.read_cache(&key("test_key")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store_delete_absent_key_is_success() {
        let store = MemoryStore::new();

        let deleted = store.delete_from_cache(&key("never-stored")).await.unwrap();
        assert!(deleted.deleted);
        assert!(!deleted.existed);
    }

    #[tokio::test]
    async fn test_memory_store_overwrite() {
        let store = MemoryStore::new();

        store.store_record(Record::new("key", "value1").unwrap()).await.unwrap();
        store.store_record(Record::new("KEY", "value2").unwrap()).await.unwrap();

        let get = store.read_cache(&key("key")).await.unwrap();
        assert_eq!(get.value, Value::from("value2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_expiring_record() {
        let store = MemoryStore::new();

        store
            .store_expiring_record(
                ExpiringRecord::new("XYZ99", "1", Duration::from_millis(300)).unwrap(),
            )
            .await
            .unwrap();

        let get = store.read_cache(&key("xyz99")).await.unwrap();
        assert_eq!(get.value, Value::from("1"));

        sleep(Duration::from_millis(400)).await;

        let result = store.read_cache(&key("xyz99")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_memory_store_long_ttl_survives_short_ones() {
        let store = MemoryStore::new();

        store
            .store_expiring_record(
                ExpiringRecord::new("FFA45722AA7", "38240", Duration::from_secs(10)).unwrap(),
            )
            .await
            .unwrap();
        store
            .store_expiring_record(
                ExpiringRecord::new("FFA45722A12", "38245", Duration::from_millis(100)).unwrap(),
            )
            .await
            .unwrap();

        sleep(Duration::from_millis(250)).await;

        assert!(store.read_cache(&key("FFA45722AA7")).await.is_ok());
        assert!(store.read_cache(&key("FFA45722A12")).await.is_err());
    }

    #[tokio::test]
    async fn test_expiry_does_not_block_caller() {
        let scheduler = Arc::new(ManualScheduler::default());
        let store = MemoryStore::with_scheduler(scheduler.clone());

        store
            .store_expiring_record(
                ExpiringRecord::new("pending", "v", Duration::from_secs(3600)).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(scheduler.delays(), vec![Duration::from_secs(3600)]);
        assert!(store.read_cache(&key("pending")).await.is_ok());
    }

    #[tokio::test]
    async fn test_expiry_deletes_overwritten_value() {
        let scheduler = Arc::new(ManualScheduler::default());
        let store = MemoryStore::with_scheduler(scheduler.clone());

        store
            .store_expiring_record(
                ExpiringRecord::new("device", "first", Duration::from_millis(300)).unwrap(),
            )
            .await
            .unwrap();
        store
            .store_record(Record::new("device", "second").unwrap())
            .await
            .unwrap();

        scheduler.fire(0).await;

        let result = store.read_cache(&key("device")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refreshed_expiring_record_keeps_earlier_timer() {
        let scheduler = Arc::new(ManualScheduler::default());
        let store = MemoryStore::with_scheduler(scheduler.clone());

        store
            .store_expiring_record(
                ExpiringRecord::new("FFA45722A11", "38245", Duration::from_millis(300)).unwrap(),
            )
            .await
            .unwrap();
        store
            .store_expiring_record(
                ExpiringRecord::new("FFA45722A11", "38246", Duration::from_secs(10)).unwrap(),
            )
            .await
            .unwrap();

        // Both timers stay armed
        assert_eq!(
            scheduler.delays(),
            vec![Duration::from_millis(300), Duration::from_secs(10)]
        );

        // The earlier timer removes the refreshed value
        scheduler.fire(0).await;
        assert!(store.read_cache(&key("FFA45722A11")).await.is_err());

        // The later one finds nothing and is harmless
        store
            .store_record(Record::new("FFA45722A11", "38247").unwrap())
            .await
            .unwrap();
        scheduler.fire(0).await;
        assert!(store.read_cache(&key("FFA45722A11")).await.is_err());
    }

    #[tokio::test]
    async fn test_expiry_after_explicit_delete_is_noop() {
        let scheduler = Arc::new(ManualScheduler::default());
        let store = MemoryStore::with_scheduler(scheduler.clone());

        store
            .store_expiring_record(
                ExpiringRecord::new("gone", "v", Duration::from_millis(10)).unwrap(),
            )
            .await
            .unwrap();
        store.delete_from_cache(&key("gone")).await.unwrap();

        scheduler.fire(0).await;
        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_memory_store_concurrent_distinct_keys() {
        let store = Arc::new(MemoryStore::new());
        let n = 64;

        let writers: Vec<_> = (0..n)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .store_record(Record::new(format!("key-{i}"), format!("value-{i}")).unwrap())
                        .await
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        let readers: Vec<_> = (0..n)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let get = store.read_cache(&key(&format!("KEY-{i}"))).await.unwrap();
                    assert_eq!(get.value, Value::Scalar(format!("value-{i}")));
                })
            })
            .collect();
        for reader in readers {
            reader.await.unwrap();
        }

        assert_eq!(store.len(), n);
    }
}
