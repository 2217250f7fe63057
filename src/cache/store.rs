//! Namespaced backing store.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

/// Namespace used whenever an operation is given no namespace (or an empty one).
pub const DEFAULT_NAMESPACE: &str = "global";

/// Resolve an optional namespace argument to the one actually used.
pub fn resolve_namespace(namespace: Option<&str>) -> &str {
    match namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => DEFAULT_NAMESPACE,
    }
}

/// A slot inside a namespace. Removed entries keep their key with a tombstone.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(Value),
    Tombstone,
}

impl Slot {
    fn value(&self) -> Option<&Value> {
        match self {
            Slot::Value(v) => Some(v),
            Slot::Tombstone => None,
        }
    }
}

/// Key -> slot mapping for one namespace.
pub type NamespaceMap = HashMap<String, Slot>;

/// Mapping from namespace to its entries.
///
/// A store is either the one shared by every shared-mode cache of a
/// [`StoreRegistry`](super::StoreRegistry) or private to a single cache.
/// Accessors clone values out so no shard lock outlives a call.
#[derive(Default)]
pub struct CacheStore {
    namespaces: DashMap<String, NamespaceMap>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `namespace` if missing. Returns `true` if it was created.
    pub fn create_namespace(&self, namespace: &str) -> bool {
        let mut created = false;
        self.namespaces.entry(namespace.to_string()).or_insert_with(|| {
            created = true;
            NamespaceMap::new()
        });
        if created {
            debug!("Created namespace: {}", namespace);
        }
        created
    }

    /// Replace `namespace` with an empty map, whether or not it existed.
    pub fn reset_namespace(&self, namespace: &str) {
        self.namespaces
            .insert(namespace.to_string(), NamespaceMap::new());
        debug!("Reset namespace: {}", namespace);
    }

    /// Set `key` in `namespace`, creating the namespace on demand.
    pub fn insert(&self, namespace: &str, key: &str, value: Value) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), Slot::Value(value));
    }

    /// Tombstone a live entry. Returns `false` for a missing namespace,
    /// a missing key, or a key that is already tombstoned.
    pub fn tombstone(&self, namespace: &str, key: &str) -> bool {
        let Some(mut entries) = self.namespaces.get_mut(namespace) else {
            return false;
        };
        match entries.get_mut(key) {
            Some(slot) if matches!(slot, Slot::Value(_)) => {
                *slot = Slot::Tombstone;
                true
            }
            _ => false,
        }
    }

    /// Live value for `key`, if any.
    pub fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.namespaces
            .get(namespace)
            .and_then(|entries| entries.get(key).and_then(Slot::value).cloned())
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Whether `key` is present in `namespace`. Tombstoned keys count as present.
    pub fn contains_key(&self, namespace: &str, key: &str) -> bool {
        self.namespaces
            .get(namespace)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Keys in `namespace`, tombstoned ones included, sorted.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .namespaces
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of live (non-tombstoned) entries in `namespace`.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces.get(namespace).map_or(0, |entries| {
            entries
                .values()
                .filter(|slot| matches!(slot, Slot::Value(_)))
                .count()
        })
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Names of all namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("namespace_count", &self.namespaces.len())
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
