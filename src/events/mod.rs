//! Event hub capability and the cache's event channel.
//!
//! The cache never inherits pub/sub behavior. It holds an [`EventHandler`]
//! handed to it at construction, defaulting to the process-wide [`EventBus`].
//!
//! ## Event channel
//!
//! | event                   | arguments                 |
//! |-------------------------|---------------------------|
//! | `cache.createCache`     | `(namespace?)`            |
//! | `cache.addToCache`      | `(key, value, namespace?)`|
//! | `cache.getFromCache`    | `(key, namespace?)`       |
//! | `cache.removeFromCache` | `(key, namespace?)`       |
//! | `cache.clearCache`      | `(namespace?)`            |
//! | `cache.response`        | `(value?)`                |

mod bridge;
mod bus;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use bridge::{BridgeError, CACHE_EVENTS, CacheCommand, EventBridge};
pub use bus::EventBus;

pub const CREATE_CACHE: &str = "cache.createCache";
pub const ADD_TO_CACHE: &str = "cache.addToCache";
pub const GET_FROM_CACHE: &str = "cache.getFromCache";
pub const REMOVE_FROM_CACHE: &str = "cache.removeFromCache";
pub const CLEAR_CACHE: &str = "cache.clearCache";
pub const RESPONSE: &str = "cache.response";

/// Callback invoked with the positional arguments of a published event.
pub type Handler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Token returned by [`EventHandler::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Publish/subscribe capability required by the cache.
///
/// Implementations must not hold internal locks while running handlers:
/// handlers are allowed to publish and subscribe re-entrantly.
pub trait EventHandler: Send + Sync {
    /// Register `handler` for `event`.
    fn subscribe(&self, event: &str, handler: Handler) -> SubscriptionId;

    /// Invoke every handler currently subscribed to `event`, in subscription order.
    fn publish(&self, event: &str, args: &[Value]);

    /// Drop a subscription. Returns `false` if it was not registered for `event`.
    fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool;
}

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&[Value]) + Send + Sync + 'static,
{
    Arc::new(f)
}
