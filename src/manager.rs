//! The data-layer facade: memoized client lookup plus pass-through storage.
//!
//! `DataManager` owns the [`ServiceRegistry`] and wires it to the two external
//! collaborators: a [`ClientBuilder`] per purpose for constructing client
//! handles, and a [`StorageBackend`] for key/value persistence. Model code
//! talks to this facade only.

use crate::cache::{CachePurpose, Instance, TypeKey};
use crate::errors::{ClientBuildError, DataError, RegistryError, StorageError};
use crate::registry::ServiceRegistry;
use crate::storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Builds a typed client from a type descriptor. Owned by the transport or
/// data-access subsystem; the registry only memoizes what it returns.
pub trait ClientBuilder: Send + Sync {
    fn build(&self, descriptor: &TypeKey) -> Result<Instance, ClientBuildError>;
}

pub struct DataManager {
    registry: ServiceRegistry,
    remote_builder: Arc<dyn ClientBuilder>,
    data_access_builder: Arc<dyn ClientBuilder>,
    storage: Arc<dyn StorageBackend>,
}

impl DataManager {
    pub fn new(
        remote_builder: Arc<dyn ClientBuilder>,
        data_access_builder: Arc<dyn ClientBuilder>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self::with_registry(
            ServiceRegistry::new(),
            remote_builder,
            data_access_builder,
            storage,
        )
    }

    /// Facade over an explicitly configured registry.
    pub fn with_registry(
        registry: ServiceRegistry,
        remote_builder: Arc<dyn ClientBuilder>,
        data_access_builder: Arc<dyn ClientBuilder>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            registry,
            remote_builder,
            data_access_builder,
            storage,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Memoized remote-API client for `T`, built on first request.
    pub fn obtain_remote_service<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, DataError> {
        self.obtain_client::<T>(CachePurpose::RemoteClientCache, &self.remote_builder)
    }

    /// Memoized cache-backed data-access client for `T`.
    pub fn obtain_data_access_service<T: Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, DataError> {
        self.obtain_client::<T>(CachePurpose::DataAccessClientCache, &self.data_access_builder)
    }

    fn obtain_client<T: Send + Sync + 'static>(
        &self,
        purpose: CachePurpose,
        builder: &Arc<dyn ClientBuilder>,
    ) -> Result<Arc<T>, DataError> {
        let key = TypeKey::of::<T>();
        let instance = self
            .registry
            .obtain_erased(purpose, key.clone(), || Ok(builder.build(&key)?))?;
        let instance = instance
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeCast {
                purpose,
                key,
                expected: std::any::type_name::<T>(),
            })?;
        Ok(instance)
    }

    /// Evict every cached client; later lookups rebuild from scratch.
    pub fn clear_all_cache(&self) {
        self.registry.clear_all();
    }

    /// Persist a value under `key`, serializing at the facade edge. Returns
    /// whether the backend accepted the write.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.storage.ensure_initialized()?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StorageError::Serialize(key.to_string(), e))?;
        self.storage.put(key, bytes)
    }

    /// Load and deserialize the value stored under `key`, if any.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        if key.trim().is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.storage.ensure_initialized()?;
        match self.storage.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Deserialize(key.to_string(), e)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UserApi {
        base_url: String,
    }

    struct CachedFeed;

    /// Builder that knows how to construct the test client types.
    struct StubBuilder {
        builds: AtomicUsize,
    }

    impl StubBuilder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                builds: AtomicUsize::new(0),
            })
        }
    }

    impl ClientBuilder for StubBuilder {
        fn build(&self, descriptor: &TypeKey) -> Result<Instance, ClientBuildError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if descriptor == &TypeKey::of::<UserApi>() {
                Ok(Arc::new(UserApi {
                    base_url: "https://api.example.com".to_string(),
                }))
            } else if descriptor == &TypeKey::of::<CachedFeed>() {
                Ok(Arc::new(CachedFeed))
            } else {
                Err(ClientBuildError::new(
                    descriptor.as_str(),
                    "unknown client type",
                ))
            }
        }
    }

    fn manager() -> (DataManager, Arc<StubBuilder>, Arc<StubBuilder>) {
        let remote = StubBuilder::new();
        let data_access = StubBuilder::new();
        let manager = DataManager::new(
            remote.clone(),
            data_access.clone(),
            Arc::new(MemoryStorage::new()),
        );
        (manager, remote, data_access)
    }

    #[test]
    fn remote_service_is_memoized() {
        let (manager, remote, _) = manager();

        let first = manager.obtain_remote_service::<UserApi>().unwrap();
        let second = manager.obtain_remote_service::<UserApi>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.base_url, "https://api.example.com");
        assert_eq!(remote.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn purposes_use_their_own_builder() {
        let (manager, remote, data_access) = manager();

        let _ = manager.obtain_remote_service::<UserApi>().unwrap();
        let _ = manager.obtain_data_access_service::<CachedFeed>().unwrap();

        assert_eq!(remote.builds.load(Ordering::SeqCst), 1);
        assert_eq!(data_access.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn builder_failure_surfaces_and_is_retryable() {
        #[derive(Debug)]
        struct Unknown;
        let (manager, remote, _) = manager();

        let err = manager.obtain_remote_service::<Unknown>().unwrap_err();
        assert!(matches!(
            err,
            DataError::Registry(RegistryError::Builder { .. })
        ));

        // The failure cached nothing; a later request tries again.
        let _ = manager.obtain_remote_service::<Unknown>().unwrap_err();
        assert_eq!(remote.builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_all_cache_forces_rebuild() {
        let (manager, remote, _) = manager();

        let first = manager.obtain_remote_service::<UserApi>().unwrap();
        manager.clear_all_cache();
        let rebuilt = manager.obtain_remote_service::<UserApi>().unwrap();

        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(remote.builds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (manager, _, _) = manager();

        assert!(manager.save("user.name", &"ada".to_string()).unwrap());
        let name: Option<String> = manager.load("user.name").unwrap();
        assert_eq!(name.as_deref(), Some("ada"));

        let missing: Option<String> = manager.load("user.email").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn save_rejects_empty_key() {
        let (manager, _, _) = manager();
        assert!(matches!(
            manager.save("", &1u32),
            Err(StorageError::EmptyKey)
        ));
        assert!(matches!(
            manager.load::<u32>(" "),
            Err(StorageError::EmptyKey)
        ));
    }
}
