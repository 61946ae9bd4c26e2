pub mod domain;
pub mod facade;
pub mod ports;
pub mod scheduler;

pub use domain::{BackendKind, ExpiringRecord, READINESS_TOKEN, Record, Value};
pub use facade::{CacheFacade, Initialised};
pub use ports::{BackendFactory, CacheBackend, ExpiryScheduler, ExpiryTask};
pub use scheduler::TokioScheduler;
