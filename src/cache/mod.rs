//! Cache module - namespaced key-value storage.
//!
//! ## Architecture
//!
//! - `StoreRegistry` - Owns the shared store and hands out private ones
//! - `CacheStore` - Namespace -> key -> value mapping with tombstones
//! - `Cache` - The five operations, plus its subscriptions on an event hub
//!
//! ## Usage
//!
//! ```rust
//! use backcache::cache::{Cache, CacheOptions};
//! use serde_json::json;
//!
//! // Shared storage on the global bus
//! let cache = Cache::new(CacheOptions::default());
//!
//! cache.create_cache(Some("users"));
//! cache.add_to_cache("42", json!({"name": "Ann"}), Some("users"));
//! let user = cache.get_from_cache("42", Some("users"));
//! ```

mod config;
mod instance;
mod registry;
mod store;

pub use config::{CacheOptions, StorageType};
pub use instance::Cache;
pub(crate) use instance::CacheCore;
pub use registry::StoreRegistry;
pub use store::{CacheStore, DEFAULT_NAMESPACE, NamespaceMap, Slot, resolve_namespace};
