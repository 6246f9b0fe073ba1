//! Cache purposes, type keys and the pluggable backend abstraction.
//!
//! Each [`CachePurpose`] names one memoization cache owned by the registry;
//! the concrete mapping behind it is a [`CacheBackend`] selected through a
//! [`CacheKind`] at configuration time.

pub mod bounded;
pub mod unbounded;

pub use bounded::LruBackend;
pub use unbounded::UnboundedBackend;

use crate::errors::RegistryError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A cached, type-erased service instance. Shared by the backend and every
/// caller that obtained it; eviction never invalidates handles already
/// returned.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Default capacity for the bounded client caches.
pub const DEFAULT_CLIENT_CACHE_CAPACITY: usize = 150;

/// The fixed, closed set of cache purposes the registry serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePurpose {
    /// Memoized remote-API client handles.
    RemoteClientCache,
    /// Memoized cache-backed data-access client handles.
    DataAccessClientCache,
}

impl CachePurpose {
    pub const ALL: [CachePurpose; 2] = [
        CachePurpose::RemoteClientCache,
        CachePurpose::DataAccessClientCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CachePurpose::RemoteClientCache => "remote_client_cache",
            CachePurpose::DataAccessClientCache => "data_access_client_cache",
        }
    }
}

impl fmt::Display for CachePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier for a requested service type.
///
/// Two requests for the same service must produce equal keys; the canonical
/// constructor is [`TypeKey::of`], which uses the full Rust type path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Key derived from a Rust type (canonical type name).
    pub fn of<T: ?Sized>() -> Self {
        TypeKey(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Key from an explicit name. Empty or whitespace-only names are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::InvalidKey(
                "type key must not be empty".to_string(),
            ));
        }
        Ok(TypeKey(Cow::Owned(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What happened to existing entries when a value was inserted.
///
/// Replacement and policy eviction are distinct: a replaced entry shared the
/// inserted key, an evicted one was pushed out to make room. The registry
/// counts only the latter in its eviction statistics.
pub enum PutOutcome {
    /// New entry; nothing was displaced.
    Inserted,
    /// The same key was already present; its old instance is returned.
    Replaced(Instance),
    /// The backend's policy pushed out an unrelated entry to make room.
    Evicted(TypeKey),
}

/// Mapping from [`TypeKey`] to a cached [`Instance`].
///
/// Backends exclusively own stored instances until they are evicted or the
/// registry is torn down. All mutation goes through the registry; backends are
/// kept behind a per-slot lock, so `Send` is the only thread-safety bound.
pub trait CacheBackend: Send {
    /// Look up a key. Takes `&mut self` because recency-tracking backends
    /// update their internal order on read.
    fn get(&mut self, key: &TypeKey) -> Option<Instance>;

    /// Insert a value, reporting any entry displaced by the insert.
    fn put(&mut self, key: TypeKey, value: Instance) -> PutOutcome;

    fn remove(&mut self, key: &TypeKey) -> Option<Instance>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Backend kind name, for logging and error messages.
    fn kind(&self) -> &'static str;
}

/// Enumerated backend selection. Decided once per purpose when the slot is
/// created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Plain map, never evicts.
    Unbounded,
    /// Size-bounded map with least-recently-used eviction.
    Lru { capacity: usize },
}

impl CacheKind {
    pub fn name(&self) -> &'static str {
        match self {
            CacheKind::Unbounded => "unbounded",
            CacheKind::Lru { .. } => "lru",
        }
    }

    /// Instantiate the concrete backend for `purpose`.
    pub fn build(&self, purpose: CachePurpose) -> Result<Box<dyn CacheBackend>, RegistryError> {
        match *self {
            CacheKind::Unbounded => Ok(Box::new(UnboundedBackend::new())),
            CacheKind::Lru { capacity } => {
                let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
                    RegistryError::BackendConstruction {
                        purpose,
                        kind: "lru",
                        reason: "capacity must be greater than zero".to_string(),
                    }
                })?;
                Ok(Box::new(LruBackend::new(capacity)))
            }
        }
    }
}
