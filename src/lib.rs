//! Typed lazy-singleton service registry with pluggable cache backends.
//!
//! The crate provides the data/integration layer of a client application:
//! a [`ServiceRegistry`] that constructs each client handle at most once per
//! (purpose, type key) and serves later requests from a configurable cache,
//! plus a [`DataManager`] facade wiring the registry to an external
//! [`ClientBuilder`] and [`StorageBackend`].

pub mod cache;
pub mod config;
pub mod errors;
pub mod manager;
pub mod registry;
pub mod storage;

// Re-export commonly used items for convenience
pub use cache::{CacheBackend, CacheKind, CachePurpose, Instance, PutOutcome, TypeKey};
pub use config::{CacheConfig, SlotConfig};
pub use errors::{ClientBuildError, ConfigError, DataError, RegistryError, StorageError};
pub use manager::{ClientBuilder, DataManager};
pub use registry::{RegistryStats, ServiceRegistry};
pub use storage::{DirectoryStorage, MemoryStorage, StorageBackend};
