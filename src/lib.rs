//! backcache - namespaced in-process cache over a pub/sub hub.
//!
//! ## Architecture
//!
//! - `cache` - Stores, storage selection and the cache operations
//! - `events` - Event hub capability, default bus and the cache's event bridge
//! - `config` - Environment configuration for the console
//! - `console` - Line-oriented front end that drives a cache through events

pub mod cache;
pub mod config;
pub mod console;
pub mod events;

pub use cache::{Cache, CacheOptions, StorageType, StoreRegistry};
pub use events::{EventBus, EventHandler};
