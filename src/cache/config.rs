//! Cache construction options.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::events::EventHandler;

/// Where a cache keeps its entries.
///
/// Deserializes through [`StorageType::parse_lossy`], so unknown names
/// become [`StorageType::Shared`] instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum StorageType {
    /// The single store shared by every shared cache of a registry.
    #[default]
    Shared,
    /// A store owned by one cache instance.
    Private,
}

impl StorageType {
    /// Parse a storage type, falling back to [`StorageType::Shared`] for
    /// anything unrecognized. `"window"` and `"internal"` are accepted as
    /// older names for shared and private.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "shared" | "window" => Self::Shared,
            "private" | "internal" => Self::Private,
            other => {
                debug!("Unknown storage type '{}', using shared", other);
                Self::Shared
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Private => "private",
        }
    }
}

impl FromStr for StorageType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_lossy(s))
    }
}

impl From<String> for StorageType {
    fn from(s: String) -> Self {
        Self::parse_lossy(&s)
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for building a [`Cache`](super::Cache).
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Shared (default) or private storage.
    pub storage_type: StorageType,

    /// Event hub to bridge onto. `None` means the process-wide bus.
    pub event_handler: Option<Arc<dyn EventHandler>>,
}

impl CacheOptions {
    /// Options for a cache on the shared store and the global bus.
    pub fn shared() -> Self {
        Self::default()
    }

    /// Options for a cache with its own private store.
    pub fn private() -> Self {
        Self::default().storage_type(StorageType::Private)
    }

    /// Set the storage type (builder pattern).
    #[must_use]
    pub fn storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    /// Use the given event hub instead of the global bus.
    #[must_use]
    pub fn event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }
}

impl std::fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOptions")
            .field("storage_type", &self.storage_type)
            .field("custom_event_handler", &self.event_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lossy() {
        assert_eq!(StorageType::parse_lossy("shared"), StorageType::Shared);
        assert_eq!(StorageType::parse_lossy("window"), StorageType::Shared);
        assert_eq!(StorageType::parse_lossy(" Private "), StorageType::Private);
        assert_eq!(StorageType::parse_lossy("internal"), StorageType::Private);
        assert_eq!(StorageType::parse_lossy("disk"), StorageType::Shared);
        assert_eq!(StorageType::parse_lossy(""), StorageType::Shared);
        assert_eq!("private".parse::<StorageType>(), Ok(StorageType::Private));
    }

    #[test]
    fn test_deserialize() {
        let parsed: StorageType = serde_json::from_str("\"internal\"").unwrap();
        assert_eq!(parsed, StorageType::Private);
        let parsed: StorageType = serde_json::from_str("\"shared\"").unwrap();
        assert_eq!(parsed, StorageType::Shared);
        let parsed: StorageType = serde_json::from_str("\"Private\"").unwrap();
        assert_eq!(parsed, StorageType::Private);
        let parsed: StorageType = serde_json::from_str("\"disk\"").unwrap();
        assert_eq!(parsed, StorageType::Shared);
    }

    #[test]
    fn test_builder() {
        assert_eq!(CacheOptions::default().storage_type, StorageType::Shared);
        assert_eq!(CacheOptions::private().storage_type, StorageType::Private);
        assert!(CacheOptions::shared().event_handler.is_none());
    }
}
