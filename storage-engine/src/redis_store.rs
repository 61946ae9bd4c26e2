use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use shared::{Error, Key, Result};
use stash::domain::response::{DeleteResponse, GetResponse, PutResponse};
use stash::{BackendKind, CacheBackend, ExpiringRecord, Record, Value};
use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Key-value remote backend over Redis.
///
/// The connection is opened by `initialise`; every other operation fails with
/// `BackendUnavailable` until that has succeeded. Expiry uses the server's
/// own `PX` option rather than a local timer.
pub struct RedisStore {
    address: String,
    connection: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// `address` is either `host:port` or a full `redis://` / `rediss://` URL
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connection: OnceCell::new(),
        }
    }

    async fn connect(&self) -> Result<ConnectionManager> {
        let url = connection_url(&self.address);
        let client = redis::Client::open(url.as_str())
            .map_err(|e| Error::BackendUnavailable(format!("Invalid redis address '{}': {}", self.address, e)))?;

        match tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client)).await {
            Ok(Ok(manager)) => Ok(manager),
            Ok(Err(e)) => Err(Error::BackendUnavailable(format!(
                "Failed to connect to redis at {}: {}",
                self.address, e
            ))),
            Err(_) => Err(Error::BackendUnavailable(format!(
                "Timed out connecting to redis at {}",
                self.address
            ))),
        }
    }

    fn connection(&self) -> Result<ConnectionManager> {
        self.connection
            .get()
            .cloned()
            .ok_or_else(|| Error::BackendUnavailable("Redis client is not initialised".to_string()))
    }
}

/// Accept bare `host:port` as well as complete connection URLs
fn connection_url(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{}/", address)
    }
}

/// Redis `PX` takes whole milliseconds and rejects zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheBackend for RedisStore {
    fn kind(&self) -> BackendKind {
        BackendKind::KeyValue
    }

    async fn initialise(&self) -> Result<String> {
        let mut conn = self
            .connection
            .get_or_try_init(|| self.connect())
            .await?
            .clone();

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::BackendUnavailable(format!("PING to {} failed: {}", self.address, e)))?;

        info!("Redis server - online at {}", self.address);
        Ok(pong)
    }

    async fn store_record(&self, record: Record) -> Result<PutResponse> {
        let Value::Scalar(value) = record.value else {
            return Err(Error::WriteFailure(format!(
                "Structured value for key '{}' is not supported by the key-value store",
                record.key
            )));
        };

        let mut conn = self.connection()?;
        let _: () = conn
            .set(record.key.as_str(), value)
            .await
            .map_err(|e| Error::WriteFailure(format!("Failed adding record '{}': {}", record.key, e)))?;

        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn store_expiring_record(&self, record: ExpiringRecord) -> Result<PutResponse> {
        let mut conn = self.connection()?;
        let millis = ttl_millis(record.ttl);

        let _: () = redis::cmd("SET")
            .arg(record.key.as_str())
            .arg(&record.value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::WriteFailure(format!("Failed adding record '{}': {}", record.key, e)))?;

        debug!("Stored key '{}' with {}ms expiry", record.key, millis);
        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn read_cache(&self, key: &Key) -> Result<GetResponse<Value>> {
        let mut conn = self.connection()?;
        let value: Option<String> = conn
            .get(key.as_str())
            .await
            .map_err(|e| Error::BackendUnavailable(format!("Failed reading key '{}': {}", key, e)))?;

        match value {
            Some(value) => Ok(GetResponse::new(Value::Scalar(value))),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn delete_from_cache(&self, key: &Key) -> Result<DeleteResponse> {
        let mut conn = self.connection()?;
        let removed: i64 = conn
            .del(key.as_str())
            .await
            .map_err(|e| Error::WriteFailure(format!("Error deleting value at key '{}': {}", key, e)))?;

        Ok(DeleteResponse::new(removed > 0))
    }
}

impl Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}
