pub mod audit;
pub mod client;
pub mod probe;
pub mod registry;
pub mod store;

pub use audit::{AuditSink, TracingAuditSink};
pub use probe::{ProbeConfig, ProbeDispatcher};
pub use registry::{RegistryError, WatchdogGrpcService, WatchdogRegistry};
pub use store::{MemoryStore, RecordStore, SqliteStore, StoreError};
