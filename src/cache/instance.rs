//! Cache instance: namespace operations plus the event bridge.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::store::resolve_namespace;
use super::{CacheOptions, CacheStore, StorageType, StoreRegistry};
use crate::events::{self, EventBridge, EventBus, EventHandler};

/// The store/hub pair the operations act on. Event handlers hold a weak
/// reference to this, never to the [`Cache`] itself.
pub(crate) struct CacheCore {
    store: Arc<CacheStore>,
    storage_type: StorageType,
    events: Arc<dyn EventHandler>,
}

impl CacheCore {
    pub(crate) fn create_cache(&self, namespace: Option<&str>) -> bool {
        self.store.create_namespace(resolve_namespace(namespace))
    }

    pub(crate) fn clear_cache(&self, namespace: Option<&str>) {
        self.store.reset_namespace(resolve_namespace(namespace));
    }

    pub(crate) fn add_to_cache(&self, key: &str, value: Value, namespace: Option<&str>) {
        self.store.insert(resolve_namespace(namespace), key, value);
    }

    pub(crate) fn remove_from_cache(&self, key: &str, namespace: Option<&str>) -> bool {
        self.store.tombstone(resolve_namespace(namespace), key)
    }

    pub(crate) fn get_from_cache(&self, key: &str, namespace: Option<&str>) -> Option<Value> {
        let namespace = resolve_namespace(namespace);
        self.store.create_namespace(namespace);

        // The store lock is released before publishing; listeners may write back.
        let value = self.store.get(namespace, key);
        match &value {
            Some(v) => self.events.publish(events::RESPONSE, std::slice::from_ref(v)),
            None => self.respond_empty(),
        }
        value
    }

    /// Publish `cache.response` with no payload.
    pub(crate) fn respond_empty(&self) {
        self.events.publish(events::RESPONSE, &[]);
    }
}

/// A namespaced key-value cache reachable directly or through its event hub.
///
/// Every operation takes an optional namespace; `None` or `""` means
/// `"global"`. Values are arbitrary JSON.
///
/// Dropping the cache (or calling [`Cache::teardown`]) removes its event
/// subscriptions. A shared store outlives it; a private store goes with it.
///
/// ## Example
///
/// ```rust
/// use backcache::cache::{Cache, CacheOptions};
/// use serde_json::json;
///
/// let cache = Cache::new(CacheOptions::private());
/// cache.add_to_cache("user:1", json!({"name": "Ann"}), None);
/// assert_eq!(cache.get_from_cache("user:1", None), Some(json!({"name": "Ann"})));
/// assert!(cache.remove_from_cache("user:1", None));
/// assert_eq!(cache.get_from_cache("user:1", None), None);
/// ```
pub struct Cache {
    core: Arc<CacheCore>,
    bridge: EventBridge,
}

impl Cache {
    /// Build a cache on the global registry and subscribe it to its hub.
    pub fn new(options: CacheOptions) -> Self {
        Self::with_registry(options, StoreRegistry::global())
    }

    /// Build a cache whose shared store comes from `registry`, subscribed.
    pub fn with_registry(options: CacheOptions, registry: &StoreRegistry) -> Self {
        let cache = Self::unsubscribed(options, registry);
        cache.subscribe();
        cache
    }

    /// Build a cache without touching its hub. Call [`Cache::subscribe`] to
    /// wire it up.
    pub fn unsubscribed(options: CacheOptions, registry: &StoreRegistry) -> Self {
        let CacheOptions {
            storage_type,
            event_handler,
        } = options;

        let store = registry.select(storage_type);
        let events: Arc<dyn EventHandler> = match event_handler {
            Some(handler) => handler,
            None => EventBus::global(),
        };

        debug!("Cache created with {} storage", storage_type);

        Self {
            core: Arc::new(CacheCore {
                store,
                storage_type,
                events: Arc::clone(&events),
            }),
            bridge: EventBridge::new(events),
        }
    }

    /// Subscribe all cache events. Returns `false` if already subscribed.
    pub fn subscribe(&self) -> bool {
        self.bridge.subscribe(&self.core)
    }

    pub fn is_subscribed(&self) -> bool {
        self.bridge.is_subscribed()
    }

    /// Unsubscribe from the hub and drop this instance.
    pub fn teardown(self) {
        drop(self);
    }

    /// Create `namespace` if it does not exist. Returns `true` if created;
    /// an existing namespace is left untouched.
    pub fn create_cache(&self, namespace: Option<&str>) -> bool {
        self.core.create_cache(namespace)
    }

    /// Reset `namespace` to empty, creating it if needed.
    pub fn clear_cache(&self, namespace: Option<&str>) {
        self.core.clear_cache(namespace);
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn add_to_cache(&self, key: &str, value: Value, namespace: Option<&str>) {
        self.core.add_to_cache(key, value, namespace);
    }

    /// Tombstone `key`. Returns `false` if there was no live entry.
    pub fn remove_from_cache(&self, key: &str, namespace: Option<&str>) -> bool {
        self.core.remove_from_cache(key, namespace)
    }

    /// Look up `key` and publish `cache.response` with the result.
    pub fn get_from_cache(&self, key: &str, namespace: Option<&str>) -> Option<Value> {
        self.core.get_from_cache(key, namespace)
    }

    pub fn storage_type(&self) -> StorageType {
        self.core.storage_type
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.core.store
    }

    pub fn event_handler(&self) -> &Arc<dyn EventHandler> {
        &self.core.events
    }

    /// Whether both caches read and write the same store.
    pub fn shares_store_with(&self, other: &Cache) -> bool {
        Arc::ptr_eq(&self.core.store, &other.core.store)
    }

    pub fn has_namespace(&self, namespace: Option<&str>) -> bool {
        self.core.store.has_namespace(resolve_namespace(namespace))
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.core.store.namespaces()
    }

    /// Whether `key` is present, tombstoned keys included.
    pub fn contains_key(&self, key: &str, namespace: Option<&str>) -> bool {
        self.core.store.contains_key(resolve_namespace(namespace), key)
    }

    /// Keys in `namespace`, tombstoned keys included.
    pub fn keys(&self, namespace: Option<&str>) -> Vec<String> {
        self.core.store.keys(resolve_namespace(namespace))
    }

    /// Number of live entries in `namespace`.
    pub fn len(&self, namespace: Option<&str>) -> usize {
        self.core.store.len(resolve_namespace(namespace))
    }

    pub fn is_empty(&self, namespace: Option<&str>) -> bool {
        self.core.store.is_empty(resolve_namespace(namespace))
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.bridge.unsubscribe_all();
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("storage_type", &self.core.storage_type)
            .field("subscribed", &self.is_subscribed())
            .field("store", &self.core.store)
            .finish()
    }
}
