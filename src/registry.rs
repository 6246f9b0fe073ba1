//! The memoizing service registry.
//!
//! One [`CacheSlot`] per [`CachePurpose`], created lazily on first use with an
//! atomic create-if-absent on the slot map. Within a slot, the check-then-build
//! sequence runs under the slot's own lock, so at most one builder invocation
//! wins per (purpose, key) while different purposes never contend with each
//! other.

use crate::cache::{CacheBackend, CacheKind, CachePurpose, Instance, PutOutcome, TypeKey};
use crate::cache::DEFAULT_CLIENT_CACHE_CAPACITY;
use crate::config::CacheConfig;
use crate::errors::RegistryError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The lazily created mapping for one cache purpose.
struct CacheSlot {
    backend: Mutex<Box<dyn CacheBackend>>,
}

/// Internal atomic counters.
#[derive(Default)]
struct InnerStats {
    total_obtains: AtomicUsize,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    evictions: AtomicUsize,
}

/// Snapshot of registry counters.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_obtains: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub evictions: usize,
}

impl RegistryStats {
    pub fn total(&self) -> usize {
        self.total_obtains
    }

    pub fn hit_rate(&self) -> f64 {
        if self.total_obtains == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_obtains as f64
        }
    }
}

/// Typed lazy-singleton registry: one instance per (purpose, key), built on
/// first request and served from the purpose's cache afterwards.
///
/// Cloning is cheap and shares the underlying caches; the registry is an
/// explicitly constructed value handed to its consumers rather than ambient
/// global state.
#[derive(Clone)]
pub struct ServiceRegistry {
    slots: Arc<DashMap<CachePurpose, Arc<CacheSlot>>>,
    kinds: Arc<HashMap<CachePurpose, CacheKind>>,
    stats: Arc<InnerStats>,
}

impl ServiceRegistry {
    /// Registry with the default purpose mapping (bounded LRU client caches).
    pub fn new() -> Self {
        let kinds = CachePurpose::ALL
            .into_iter()
            .map(|purpose| {
                (
                    purpose,
                    CacheKind::Lru {
                        capacity: DEFAULT_CLIENT_CACHE_CAPACITY,
                    },
                )
            })
            .collect();
        Self::with_kinds(kinds)
    }

    /// Registry configured from a [`CacheConfig`]. Kind names and capacities
    /// are validated here, before the first `obtain` call.
    pub fn with_config(config: &CacheConfig) -> Result<Self, RegistryError> {
        Ok(Self::with_kinds(config.resolve()?))
    }

    fn with_kinds(kinds: HashMap<CachePurpose, CacheKind>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            kinds: Arc::new(kinds),
            stats: Arc::new(InnerStats::default()),
        }
    }

    fn kind_for(&self, purpose: CachePurpose) -> CacheKind {
        self.kinds.get(&purpose).copied().unwrap_or(CacheKind::Lru {
            capacity: DEFAULT_CLIENT_CACHE_CAPACITY,
        })
    }

    /// Get or atomically create the slot for `purpose`.
    fn slot(&self, purpose: CachePurpose) -> Result<Arc<CacheSlot>, RegistryError> {
        if let Some(slot) = self.slots.get(&purpose) {
            return Ok(slot.clone());
        }
        let kind = self.kind_for(purpose);
        let slot = self
            .slots
            .entry(purpose)
            .or_try_insert_with(|| {
                let backend = kind.build(purpose)?;
                debug!(%purpose, kind = kind.name(), "created cache slot");
                Ok::<_, RegistryError>(Arc::new(CacheSlot {
                    backend: Mutex::new(backend),
                }))
            })?
            .clone();
        Ok(slot)
    }

    /// Obtain the memoized instance for (purpose, key), building it with
    /// `builder` on first request.
    ///
    /// On a miss the builder runs under the slot lock: concurrent requesters
    /// for the same slot wait for the winner's result instead of building a
    /// duplicate. A failing builder commits nothing.
    pub fn obtain<T, F>(
        &self,
        purpose: CachePurpose,
        key: TypeKey,
        builder: F,
    ) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, Box<dyn std::error::Error + Send + Sync>>,
    {
        let instance = self.obtain_erased(purpose, key.clone(), || {
            let built = builder()?;
            Ok(Arc::new(built) as Instance)
        })?;
        instance
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeCast {
                purpose,
                key,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Type-erased variant of [`obtain`](Self::obtain), used when the builder
    /// itself is behind a trait object.
    pub fn obtain_erased<F>(
        &self,
        purpose: CachePurpose,
        key: TypeKey,
        builder: F,
    ) -> Result<Instance, RegistryError>
    where
        F: FnOnce() -> Result<Instance, Box<dyn std::error::Error + Send + Sync>>,
    {
        self.stats.total_obtains.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(purpose)?;
        let mut backend = slot.backend.lock();

        if let Some(instance) = backend.get(&key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(%purpose, %key, "cache hit");
            return Ok(instance);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        debug!(%purpose, %key, "cache miss, building instance");
        let instance = match builder() {
            Ok(instance) => instance,
            Err(source) => {
                warn!(%purpose, %key, error = %source, "builder failed, nothing cached");
                return Err(RegistryError::Builder {
                    purpose,
                    key,
                    source,
                });
            }
        };
        if let PutOutcome::Evicted(evicted) = backend.put(key, instance.clone()) {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(%purpose, key = %evicted, "evicted least recently used entry");
        }
        Ok(instance)
    }

    /// Evict every entry cached under `purpose`. Subsequent `obtain` calls
    /// rebuild from scratch.
    pub fn clear(&self, purpose: CachePurpose) {
        if let Some(slot) = self.slots.get(&purpose) {
            let mut backend = slot.backend.lock();
            let evicted = backend.len();
            backend.clear();
            self.stats.evictions.fetch_add(evicted, Ordering::Relaxed);
            debug!(%purpose, evicted, "cleared cache slot");
        }
    }

    /// Evict every entry in every purpose.
    pub fn clear_all(&self) {
        for purpose in CachePurpose::ALL {
            self.clear(purpose);
        }
    }

    /// Number of instances currently cached under `purpose`.
    pub fn cached_len(&self, purpose: CachePurpose) -> usize {
        self.slots
            .get(&purpose)
            .map(|slot| slot.backend.lock().len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_obtains: self.stats.total_obtains.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        self.stats().hit_rate()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
