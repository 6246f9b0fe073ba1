//! Cache configuration: the purpose → backend-kind mapping.
//!
//! Configuration is the only tunable surface of the registry. Raw kind names
//! are resolved to [`CacheKind`] values up front so that misconfiguration is
//! rejected at startup, before the first `obtain` call.

use crate::cache::{CacheKind, CachePurpose, DEFAULT_CLIENT_CACHE_CAPACITY};
use crate::errors::{ConfigError, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Backend selection for a single cache purpose, as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// Backend kind name: `"lru"` or `"unbounded"`.
    pub kind: String,
    /// Capacity for bounded kinds. Ignored by `"unbounded"`.
    pub capacity: Option<usize>,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            kind: "lru".to_string(),
            capacity: Some(DEFAULT_CLIENT_CACHE_CAPACITY),
        }
    }
}

impl SlotConfig {
    pub fn unbounded() -> Self {
        Self {
            kind: "unbounded".to_string(),
            capacity: None,
        }
    }

    pub fn lru(capacity: usize) -> Self {
        Self {
            kind: "lru".to_string(),
            capacity: Some(capacity),
        }
    }

    fn resolve(&self, purpose: CachePurpose) -> Result<CacheKind, RegistryError> {
        match self.kind.as_str() {
            "unbounded" => Ok(CacheKind::Unbounded),
            "lru" => {
                let capacity = self.capacity.unwrap_or(DEFAULT_CLIENT_CACHE_CAPACITY);
                if capacity == 0 {
                    return Err(RegistryError::BackendConstruction {
                        purpose,
                        kind: "lru",
                        reason: "capacity must be greater than zero".to_string(),
                    });
                }
                Ok(CacheKind::Lru { capacity })
            }
            other => Err(RegistryError::UnsupportedCacheKind(other.to_string())),
        }
    }
}

/// The full purpose → kind table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub remote_client_cache: SlotConfig,
    pub data_access_client_cache: SlotConfig,
}

impl CacheConfig {
    /// Parse from a TOML document. Missing sections fall back to defaults;
    /// unknown kinds and bad capacities are rejected here, not on first use.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(ConfigError::TomlParse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.display().to_string(), e))?;
        Self::from_toml_str(&raw)
    }

    fn slot_for(&self, purpose: CachePurpose) -> &SlotConfig {
        match purpose {
            CachePurpose::RemoteClientCache => &self.remote_client_cache,
            CachePurpose::DataAccessClientCache => &self.data_access_client_cache,
        }
    }

    /// Resolve every purpose to a validated [`CacheKind`].
    pub fn resolve(&self) -> Result<HashMap<CachePurpose, CacheKind>, RegistryError> {
        let mut kinds = HashMap::with_capacity(CachePurpose::ALL.len());
        for purpose in CachePurpose::ALL {
            kinds.insert(purpose, self.slot_for(purpose).resolve(purpose)?);
        }
        Ok(kinds)
    }

    /// Validation without keeping the resolved table.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.resolve().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_bounded_lru() {
        let kinds = CacheConfig::default().resolve().unwrap();
        assert_eq!(
            kinds[&CachePurpose::RemoteClientCache],
            CacheKind::Lru {
                capacity: DEFAULT_CLIENT_CACHE_CAPACITY
            }
        );
        assert_eq!(
            kinds[&CachePurpose::DataAccessClientCache],
            CacheKind::Lru {
                capacity: DEFAULT_CLIENT_CACHE_CAPACITY
            }
        );
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = CacheConfig::from_toml_str(
            r#"
            [remote_client_cache]
            kind = "unbounded"
        "#,
        )
        .unwrap();

        let kinds = config.resolve().unwrap();
        assert_eq!(kinds[&CachePurpose::RemoteClientCache], CacheKind::Unbounded);
        // Unspecified section keeps the default.
        assert_eq!(
            kinds[&CachePurpose::DataAccessClientCache],
            CacheKind::Lru {
                capacity: DEFAULT_CLIENT_CACHE_CAPACITY
            }
        );
    }

    #[test]
    fn unknown_kind_is_rejected_up_front() {
        let err = CacheConfig::from_toml_str(
            r#"
            [data_access_client_cache]
            kind = "arc"
        "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Invalid(RegistryError::UnsupportedCacheKind(kind)) => {
                assert_eq!(kind, "arc")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_capacity_is_a_backend_construction_error() {
        assert!(matches!(
            CacheConfig::from_toml_str(
                r#"
                [remote_client_cache]
                kind = "lru"
                capacity = 0
            "#,
            ),
            Err(ConfigError::Invalid(
                RegistryError::BackendConstruction { .. }
            ))
        ));
    }

    #[test]
    fn loads_from_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cache.toml");
        std::fs::write(
            &path,
            r#"
            [remote_client_cache]
            kind = "lru"
            capacity = 16
        "#,
        )
        .unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        let kinds = config.resolve().unwrap();
        assert_eq!(
            kinds[&CachePurpose::RemoteClientCache],
            CacheKind::Lru { capacity: 16 }
        );

        assert!(matches!(
            CacheConfig::from_file(tmp.path().join("missing.toml")),
            Err(ConfigError::FileRead(_, _))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            CacheConfig::from_toml_str("kind = [not toml"),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn slot_config_helpers() {
        assert_eq!(
            SlotConfig::unbounded()
                .resolve(CachePurpose::RemoteClientCache)
                .unwrap(),
            CacheKind::Unbounded
        );
        assert_eq!(
            SlotConfig::lru(32)
                .resolve(CachePurpose::RemoteClientCache)
                .unwrap(),
            CacheKind::Lru { capacity: 32 }
        );
    }
}
