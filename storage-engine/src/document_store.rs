use async_trait::async_trait;
use shared::config::Config;
use shared::{Error, Key, Result};
use stash::domain::ValueMap;
use stash::domain::response::{DeleteResponse, GetResponse, PutResponse};
use stash::{BackendKind, CacheBackend, ExpiringRecord, ExpiryScheduler, READINESS_TOKEN, Record, TokioScheduler, Value};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A stored document: field name to arbitrary JSON value
pub type Document = ValueMap;

/// Reserved field marking a document that holds a scalar record
pub const SCALAR_MARKER_FIELD: &str = "__stash_scalar";

/// Client for an external document database, addressed by collection and document id.
/// Credential resolution and transport are the client's concern.
#[async_trait]
pub trait DocumentClient: Send + Sync + 'static {
    async fn connect(&self) -> Result<()>;
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;
    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()>;
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;
}

/// Document-store backend.
///
/// Each record becomes one document in `collection`, keyed by the normalized
/// key. Scalars are written as `{ <value_field>: value, __stash_scalar: true }`
/// and only documents carrying that marker read back as scalars. Structured
/// values are written as the document itself and may not use the marker field.
/// Expiring records are deleted by the local scheduler since document stores
/// have no native per-document TTL.
pub struct DocumentStore {
    client: Arc<dyn DocumentClient>,
    collection: String,
    value_field: String,
    scheduler: Arc<dyn ExpiryScheduler>,
    connected: AtomicBool,
}

impl DocumentStore {
    pub fn new(
        client: Arc<dyn DocumentClient>,
        collection: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self {
            client,
            collection: collection.into(),
            value_field: value_field.into(),
            scheduler: Arc::new(TokioScheduler::new()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn ExpiryScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn from_config(client: Arc<dyn DocumentClient>, config: &Config) -> Self {
        Self::new(client, &config.document_collection, &config.document_value_field)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::BackendUnavailable("Document client is not initialised".to_string()))
        }
    }

    fn scalar_document(&self, value: String) -> Document {
        let mut document = Document::new();
        document.insert(self.value_field.clone(), serde_json::Value::String(value));
        document.insert(SCALAR_MARKER_FIELD.to_string(), serde_json::Value::Bool(true));
        document
    }

    fn document_value(&self, key: &Key, mut document: Document) -> Result<Value> {
        if document.get(SCALAR_MARKER_FIELD) != Some(&serde_json::Value::Bool(true)) {
            return Ok(Value::Map(document));
        }
        match document.remove(&self.value_field) {
            Some(serde_json::Value::String(s)) => Ok(Value::Scalar(s)),
            _ => Err(Error::Internal(format!(
                "Scalar document '{}' has no string '{}' field",
                key, self.value_field
            ))),
        }
    }

    async fn write(&self, key: &Key, document: Document) -> Result<()> {
        self.client
            .set(&self.collection, key.as_str(), document)
            .await
            .map_err(|e| match e {
                Error::WriteFailure(msg) => Error::WriteFailure(msg),
                other => Error::WriteFailure(format!("Failed adding record '{}': {}", key, other)),
            })
    }
}

#[async_trait]
impl CacheBackend for DocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    async fn initialise(&self) -> Result<String> {
        self.client.connect().await.map_err(|e| match e {
            Error::BackendUnavailable(msg) => Error::BackendUnavailable(msg),
            other => Error::BackendUnavailable(other.to_string()),
        })?;
        self.connected.store(true, Ordering::Release);

        info!("Document store - online (collection '{}')", self.collection);
        Ok(READINESS_TOKEN.to_string())
    }

    async fn store_record(&self, record: Record) -> Result<PutResponse> {
        self.ensure_connected()?;

        let document = match record.value {
            Value::Scalar(s) => self.scalar_document(s),
            Value::Map(m) if m.contains_key(SCALAR_MARKER_FIELD) => {
                return Err(Error::WriteFailure(format!(
                    "Structured value for key '{}' uses reserved field '{}'",
                    record.key, SCALAR_MARKER_FIELD
                )));
            }
            Value::Map(m) => m,
        };
        self.write(&record.key, document).await?;

        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn store_expiring_record(&self, record: ExpiringRecord) -> Result<PutResponse> {
        self.ensure_connected()?;

        let ExpiringRecord { key, value, ttl } = record;
        self.write(&key, self.scalar_document(value)).await?;

        let client = Arc::clone(&self.client);
        let collection = self.collection.clone();
        self.scheduler.schedule(
            ttl,
            Box::pin(async move {
                match client.delete(&collection, key.as_str()).await {
                    Ok(removed) => debug!("Expiry fired for document '{}' (removed: {})", key, removed),
                    Err(e) => warn!("Expiry of document '{}' failed: {}", key, e),
                }
            }),
        );

        Ok(PutResponse::new(true, "Successfully inserted"))
    }

    async fn read_cache(&self, key: &Key) -> Result<GetResponse<Value>> {
        self.ensure_connected()?;

        match self.client.get(&self.collection, key.as_str()).await? {
            Some(document) => Ok(GetResponse::new(self.document_value(key, document)?)),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    async fn delete_from_cache(&self, key: &Key) -> Result<DeleteResponse> {
        self.ensure_connected()?;

        let existed = self
            .client
            .delete(&self.collection, key.as_str())
            .await
            .map_err(|e| Error::WriteFailure(format!("Error deleting value at key '{}': {}", key, e)))?;

        Ok(DeleteResponse::new(existed))
    }
}

impl Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("collection", &self.collection)
            .field("value_field", &self.value_field)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish()
    }
}
