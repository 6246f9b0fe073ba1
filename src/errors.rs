use crate::cache::{CachePurpose, TypeKey};
use thiserror::Error;

/// Errors surfaced by the service registry and its cache backends.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid type key: {0}")]
    InvalidKey(String),
    #[error("Unsupported cache kind '{0}'")]
    UnsupportedCacheKind(String),
    #[error("Cannot build '{kind}' backend for {purpose}: {reason}")]
    BackendConstruction {
        purpose: CachePurpose,
        kind: &'static str,
        reason: String,
    },
    /// The supplied builder failed. Nothing was cached; the next `obtain`
    /// for the same key retries construction.
    #[error("Builder failed for '{key}' in {purpose}: {source}")]
    Builder {
        purpose: CachePurpose,
        key: TypeKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Cached instance for '{key}' in {purpose} is not a '{expected}'")]
    TypeCast {
        purpose: CachePurpose,
        key: TypeKey,
        expected: &'static str,
    },
}

/// Failure reported by an external [`ClientBuilder`](crate::manager::ClientBuilder).
#[derive(Debug, Error)]
#[error("Client construction failed for '{descriptor}': {reason}")]
pub struct ClientBuildError {
    pub descriptor: String,
    pub reason: String,
}

impl ClientBuildError {
    pub fn new(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from the key/value storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage initialization failed: {0}")]
    Init(String),
    #[error("Storage I/O error while {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("Failed to serialize value for key '{0}': {1}")]
    Serialize(String, #[source] serde_json::Error),
    #[error("Failed to deserialize value for key '{0}': {1}")]
    Deserialize(String, #[source] serde_json::Error),
    #[error("Empty storage key")]
    EmptyKey,
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML cache configuration: {0}")]
    TomlParse(#[source] toml::de::Error),
    #[error("Invalid cache configuration: {0}")]
    Invalid(#[from] RegistryError),
}

/// Aggregate error for callers of the [`DataManager`](crate::manager::DataManager) facade.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
