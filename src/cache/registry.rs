//! Store registry - owner of the shared store.

use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, info};

use super::{CacheStore, StorageType};

static GLOBAL_REGISTRY: Lazy<StoreRegistry> = Lazy::new(StoreRegistry::new);

/// Hands out stores to caches according to their [`StorageType`].
///
/// The shared store is created on first request and lives as long as the
/// registry. Nothing tears it down when caches go away.
///
/// ## Example
///
/// ```rust
/// use backcache::cache::{StoreRegistry, StorageType};
///
/// let registry = StoreRegistry::new();
/// let a = registry.select(StorageType::Shared);
/// let b = registry.select(StorageType::Shared);
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone, Default)]
pub struct StoreRegistry {
    shared: Arc<OnceCell<Arc<CacheStore>>>,
}

impl StoreRegistry {
    /// Create a registry with no shared store yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`Cache::new`](super::Cache::new).
    pub fn global() -> &'static StoreRegistry {
        &GLOBAL_REGISTRY
    }

    /// The shared store, created on first use.
    pub fn shared(&self) -> Arc<CacheStore> {
        Arc::clone(self.shared.get_or_init(|| {
            info!("Shared cache store initialized");
            Arc::new(CacheStore::new())
        }))
    }

    /// Whether the shared store has been created yet.
    pub fn is_initialized(&self) -> bool {
        self.shared.get().is_some()
    }

    /// Store for a new cache: the shared one, or a fresh private one.
    pub fn select(&self, storage_type: StorageType) -> Arc<CacheStore> {
        match storage_type {
            StorageType::Shared => self.shared(),
            StorageType::Private => {
                debug!("Allocating private cache store");
                Arc::new(CacheStore::new())
            }
        }
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("shared_initialized", &self.is_initialized())
            .finish()
    }
}
