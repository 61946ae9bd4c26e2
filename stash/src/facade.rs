use crate::domain::response::{DeleteResponse, GetResponse, PutResponse};
use crate::domain::{BackendKind, ExpiringRecord, READINESS_TOKEN, Record, Value};
use crate::ports::{BackendFactory, CacheBackend};
use shared::{Error, Key, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle over the single backend chosen at initialisation.
///
/// The selection never changes for the life of the handle; initialising again
/// yields a new handle with a fresh backend. Cloning shares the same backend.
#[derive(Clone)]
pub struct CacheFacade {
    backend: Arc<dyn CacheBackend>,
}

/// Outcome of facade initialisation.
///
/// `ready` is false when the requested backend did not come up and the
/// in-process backend was installed in its place. That case is not an error,
/// so callers must look at `ready` even on `Ok`.
pub struct Initialised {
    pub cache: CacheFacade,
    pub ready: bool,
}

impl CacheFacade {
    /// Select a backend from the remote flag and address
    pub async fn initialise(
        factory: &dyn BackendFactory,
        address: &str,
        use_remote: bool,
    ) -> Result<Initialised> {
        if !use_remote {
            return Self::start(factory.in_process(), factory).await;
        }

        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidConfiguration(
                "remote cache requested but no address supplied".to_string(),
            ));
        }

        Self::start(factory.key_value(address), factory).await
    }

    /// Install an externally built backend, such as a document store,
    /// with the same readiness check and fallback as [`CacheFacade::initialise`]
    pub async fn with_backend(
        backend: Arc<dyn CacheBackend>,
        factory: &dyn BackendFactory,
    ) -> Result<Initialised> {
        Self::start(backend, factory).await
    }

    async fn start(
        backend: Arc<dyn CacheBackend>,
        factory: &dyn BackendFactory,
    ) -> Result<Initialised> {
        let kind = backend.kind();
        match backend.initialise().await {
            Ok(token) if token == READINESS_TOKEN => {
                info!("{} cache backend ready", kind);
                return Ok(Initialised {
                    cache: Self { backend },
                    ready: true,
                });
            }
            Ok(token) if kind == BackendKind::InProcess => {
                warn!("in-process cache answered '{}' instead of readiness token", token);
                return Ok(Initialised {
                    cache: Self { backend },
                    ready: false,
                });
            }
            Ok(token) => {
                warn!(
                    "{} cache answered '{}' instead of readiness token, falling back to in-process cache",
                    kind, token
                );
            }
            Err(e) => {
                // In-process setup failures are genuine and surface to the caller
                if kind == BackendKind::InProcess {
                    return Err(e);
                }
                warn!(
                    "{} cache failed to start: {}. Falling back to in-process cache",
                    kind, e
                );
            }
        }

        let fallback = factory.in_process();
        fallback.initialise().await?;
        Ok(Initialised {
            cache: Self { backend: fallback },
            ready: false,
        })
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn store_record(&self, record: Record) -> Result<PutResponse> {
        self.backend.store_record(record).await
    }

    pub async fn store_expiring_record(&self, record: ExpiringRecord) -> Result<PutResponse> {
        self.backend.store_expiring_record(record).await
    }

    pub async fn read_cache(&self, key: &Key) -> Result<GetResponse<Value>> {
        self.backend.read_cache(key).await
    }

    pub async fn delete_from_cache(&self, key: &Key) -> Result<DeleteResponse> {
        self.backend.delete_from_cache(key).await
    }
}

impl std::fmt::Debug for CacheFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheFacade")
            .field("backend", &self.backend.kind())
            .finish()
    }
}
