//! Default in-process event hub.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use super::{EventHandler, Handler, SubscriptionId};

static GLOBAL_BUS: Lazy<Arc<EventBus>> = Lazy::new(|| {
    info!("Global event bus initialized");
    Arc::new(EventBus::new())
});

/// Synchronous, in-process pub/sub hub.
///
/// Publishing runs every subscriber on the calling thread before returning.
/// Subscribers are dispatched from a snapshot, so a handler may publish or
/// subscribe while it runs.
pub struct EventBus {
    subscribers: RwLock<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The process-wide bus used when a cache is built without its own hub.
    pub fn global() -> Arc<EventBus> {
        Arc::clone(&GLOBAL_BUS)
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.read().get(event).map_or(0, Vec::len)
    }

    /// Names of events with at least one subscriber.
    pub fn events(&self) -> Vec<String> {
        self.subscribers.read().keys().cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for EventBus {
    fn subscribe(&self, event: &str, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        debug!("Subscribed {} to {}", id, event);
        id
    }

    fn publish(&self, event: &str, args: &[Value]) {
        // Snapshot first: handlers may call back into the bus.
        let handlers: Vec<Handler> = match self.subscribers.read().get(event) {
            Some(subs) => subs.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => return,
        };

        for handler in handlers {
            handler(args);
        }
    }

    fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(subs) = subscribers.get_mut(event) else {
            return false;
        };

        let before = subs.len();
        subs.retain(|(sub_id, _)| *sub_id != id);
        let removed = subs.len() != before;

        if subs.is_empty() {
            subscribers.remove(event);
        }
        if removed {
            debug!("Unsubscribed {} from {}", id, event);
        }
        removed
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("EventBus")
            .field("event_count", &subscribers.len())
            .field(
                "subscription_count",
                &subscribers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::handler;
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_publish_reaches_all_subscribers_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(
                "ping",
                handler(move |args| seen.lock().push((tag, args.to_vec()))),
            );
        }

        bus.publish("ping", &[json!(1)]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("a", vec![json!(1)]));
        assert_eq!(seen[1], ("b", vec![json!(1)]));
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish("nobody.listens", &[]);
        assert_eq!(bus.subscriber_count("nobody.listens"), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let id = bus.subscribe("tick", handler(move |_| *counter.lock() += 1));

        bus.publish("tick", &[]);
        assert!(bus.unsubscribe("tick", id));
        assert!(!bus.unsubscribe("tick", id));
        assert!(!bus.unsubscribe("other", id));
        bus.publish("tick", &[]);

        assert_eq!(*hits.lock(), 1);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_handler_can_publish_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let echoed = Arc::new(Mutex::new(Vec::new()));

        let inner = Arc::clone(&bus);
        bus.subscribe(
            "request",
            handler(move |args| inner.publish("reply", args)),
        );
        let sink = Arc::clone(&echoed);
        bus.subscribe("reply", handler(move |args| sink.lock().extend_from_slice(args)));

        bus.publish("request", &[json!("hello")]);

        assert_eq!(*echoed.lock(), vec![json!("hello")]);
    }
}
