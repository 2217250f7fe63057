//! Event bridge - routes cache events on a hub to cache operations.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::{
    ADD_TO_CACHE, CLEAR_CACHE, CREATE_CACHE, EventHandler, GET_FROM_CACHE, REMOVE_FROM_CACHE,
    SubscriptionId, handler,
};
use crate::cache::CacheCore;

/// Events a cache listens to, in subscription order.
pub const CACHE_EVENTS: [&str; 5] = [
    CREATE_CACHE,
    ADD_TO_CACHE,
    GET_FROM_CACHE,
    REMOVE_FROM_CACHE,
    CLEAR_CACHE,
];

/// A published cache event whose arguments could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("{event}: missing argument `{name}`")]
    MissingArgument {
        event: &'static str,
        name: &'static str,
    },

    #[error("{event}: argument `{name}` must be a string, got {found}")]
    NotAString {
        event: &'static str,
        name: &'static str,
        found: String,
    },

    #[error("unknown cache event `{0}`")]
    UnknownEvent(String),
}

/// A cache operation as carried on the event channel.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheCommand {
    Create {
        namespace: Option<String>,
    },
    Add {
        key: String,
        value: Value,
        namespace: Option<String>,
    },
    Get {
        key: String,
        namespace: Option<String>,
    },
    Remove {
        key: String,
        namespace: Option<String>,
    },
    Clear {
        namespace: Option<String>,
    },
}

impl CacheCommand {
    /// Decode the positional arguments of `event`.
    ///
    /// Trailing arguments may be omitted. A `null` namespace means the
    /// default one; a missing value on add stores `null`.
    pub fn decode(event: &str, args: &[Value]) -> Result<Self, BridgeError> {
        match event {
            CREATE_CACHE => Ok(Self::Create {
                namespace: namespace_arg(CREATE_CACHE, args, 0)?,
            }),
            ADD_TO_CACHE => Ok(Self::Add {
                key: key_arg(ADD_TO_CACHE, args)?,
                value: args.get(1).cloned().unwrap_or(Value::Null),
                namespace: namespace_arg(ADD_TO_CACHE, args, 2)?,
            }),
            GET_FROM_CACHE => Ok(Self::Get {
                key: key_arg(GET_FROM_CACHE, args)?,
                namespace: namespace_arg(GET_FROM_CACHE, args, 1)?,
            }),
            REMOVE_FROM_CACHE => Ok(Self::Remove {
                key: key_arg(REMOVE_FROM_CACHE, args)?,
                namespace: namespace_arg(REMOVE_FROM_CACHE, args, 1)?,
            }),
            CLEAR_CACHE => Ok(Self::Clear {
                namespace: namespace_arg(CLEAR_CACHE, args, 0)?,
            }),
            other => Err(BridgeError::UnknownEvent(other.to_string())),
        }
    }

    /// Event name and positional arguments for publishing this command.
    pub fn encode(&self) -> (&'static str, Vec<Value>) {
        fn with_namespace(mut args: Vec<Value>, namespace: &Option<String>) -> Vec<Value> {
            if let Some(ns) = namespace {
                args.push(Value::String(ns.clone()));
            }
            args
        }

        match self {
            Self::Create { namespace } => (CREATE_CACHE, with_namespace(Vec::new(), namespace)),
            Self::Add {
                key,
                value,
                namespace,
            } => (
                ADD_TO_CACHE,
                with_namespace(vec![Value::String(key.clone()), value.clone()], namespace),
            ),
            Self::Get { key, namespace } => (
                GET_FROM_CACHE,
                with_namespace(vec![Value::String(key.clone())], namespace),
            ),
            Self::Remove { key, namespace } => (
                REMOVE_FROM_CACHE,
                with_namespace(vec![Value::String(key.clone())], namespace),
            ),
            Self::Clear { namespace } => (CLEAR_CACHE, with_namespace(Vec::new(), namespace)),
        }
    }

    /// Publish this command on `hub`.
    pub fn publish(&self, hub: &dyn EventHandler) {
        let (event, args) = self.encode();
        hub.publish(event, &args);
    }

    pub(crate) fn apply(self, core: &CacheCore) {
        match self {
            Self::Create { namespace } => {
                core.create_cache(namespace.as_deref());
            }
            Self::Add {
                key,
                value,
                namespace,
            } => core.add_to_cache(&key, value, namespace.as_deref()),
            Self::Get { key, namespace } => {
                core.get_from_cache(&key, namespace.as_deref());
            }
            Self::Remove { key, namespace } => {
                core.remove_from_cache(&key, namespace.as_deref());
            }
            Self::Clear { namespace } => core.clear_cache(namespace.as_deref()),
        }
    }
}

fn key_arg(event: &'static str, args: &[Value]) -> Result<String, BridgeError> {
    match args.first() {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(other) => Err(BridgeError::NotAString {
            event,
            name: "key",
            found: other.to_string(),
        }),
        None => Err(BridgeError::MissingArgument { event, name: "key" }),
    }
}

fn namespace_arg(
    event: &'static str,
    args: &[Value],
    index: usize,
) -> Result<Option<String>, BridgeError> {
    match args.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(ns)) => Ok(Some(ns.clone())),
        Some(other) => Err(BridgeError::NotAString {
            event,
            name: "namespace",
            found: other.to_string(),
        }),
    }
}

/// Subscriptions one cache holds on its hub.
///
/// Either all of [`CACHE_EVENTS`] are subscribed or none are.
pub struct EventBridge {
    events: Arc<dyn EventHandler>,
    subscriptions: Mutex<Vec<(&'static str, SubscriptionId)>>,
}

impl EventBridge {
    pub fn new(events: Arc<dyn EventHandler>) -> Self {
        Self {
            events,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe every cache event to `core`. Returns `false` if already subscribed.
    pub(crate) fn subscribe(&self, core: &Arc<CacheCore>) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            return false;
        }

        for event in CACHE_EVENTS {
            let target: Weak<CacheCore> = Arc::downgrade(core);
            let id = self.events.subscribe(
                event,
                handler(move |args| {
                    let Some(core) = target.upgrade() else {
                        return;
                    };
                    match CacheCommand::decode(event, args) {
                        Ok(command) => command.apply(&core),
                        Err(e) => {
                            warn!("Dropped cache event: {}", e);
                            // A get always answers, even when it can't be served.
                            if event == GET_FROM_CACHE {
                                core.respond_empty();
                            }
                        }
                    }
                }),
            );
            subscriptions.push((event, id));
        }

        debug!("Cache subscribed to {} events", subscriptions.len());
        true
    }

    pub fn is_subscribed(&self) -> bool {
        !self.subscriptions.lock().is_empty()
    }

    /// Remove every subscription this bridge made.
    pub fn unsubscribe_all(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        if subscriptions.is_empty() {
            return;
        }
        for (event, id) in &subscriptions {
            self.events.unsubscribe(event, *id);
        }
        debug!("Cache unsubscribed from {} events", subscriptions.len());
    }
}

impl std::fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("subscriptions", &*self.subscriptions.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, CacheOptions, StoreRegistry};
    use crate::events::{EventBus, Handler, RESPONSE};
    use serde_json::json;

    /// Hub double that records subscribe/unsubscribe calls and forwards to a real bus.
    #[derive(Default)]
    struct RecordingHub {
        bus: EventBus,
        subscribed: Mutex<Vec<String>>,
        unsubscribed: Mutex<Vec<String>>,
    }

    impl EventHandler for RecordingHub {
        fn subscribe(&self, event: &str, handler: Handler) -> SubscriptionId {
            self.subscribed.lock().push(event.to_string());
            self.bus.subscribe(event, handler)
        }

        fn publish(&self, event: &str, args: &[Value]) {
            self.bus.publish(event, args);
        }

        fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
            self.unsubscribed.lock().push(event.to_string());
            self.bus.unsubscribe(event, id)
        }
    }

    fn cache_on(hub: Arc<dyn EventHandler>, options: CacheOptions) -> Cache {
        Cache::with_registry(options.event_handler(hub), &StoreRegistry::new())
    }

    fn collect_responses(hub: &dyn EventHandler) -> Arc<Mutex<Vec<Vec<Value>>>> {
        let responses = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&responses);
        hub.subscribe(RESPONSE, handler(move |args| sink.lock().push(args.to_vec())));
        responses
    }

    #[test]
    fn test_subscribe_is_explicit_and_complete() {
        let hub = Arc::new(RecordingHub::default());
        let cache = Cache::unsubscribed(
            CacheOptions::private().event_handler(hub.clone()),
            &StoreRegistry::new(),
        );
        assert!(hub.subscribed.lock().is_empty());
        assert!(!cache.is_subscribed());

        assert!(cache.subscribe());
        assert!(cache.is_subscribed());
        assert_eq!(*hub.subscribed.lock(), CACHE_EVENTS.map(String::from).to_vec());

        assert!(!cache.subscribe());
        assert_eq!(hub.subscribed.lock().len(), CACHE_EVENTS.len());
    }

    #[test]
    fn test_teardown_unsubscribes_everything() {
        let hub = Arc::new(RecordingHub::default());
        let cache = cache_on(hub.clone(), CacheOptions::shared());

        cache.teardown();

        assert_eq!(*hub.unsubscribed.lock(), CACHE_EVENTS.map(String::from).to_vec());
        for event in CACHE_EVENTS {
            assert_eq!(hub.bus.subscriber_count(event), 0);
        }
    }

    #[test]
    fn test_published_add_matches_direct_call() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let cache = cache_on(hub.clone(), CacheOptions::shared());

        hub.publish(ADD_TO_CACHE, &[json!("x"), json!(42)]);

        assert_eq!(cache.get_from_cache("x", None), Some(json!(42)));
    }

    #[test]
    fn test_published_get_responds() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let cache = cache_on(hub.clone(), CacheOptions::shared());
        let responses = collect_responses(hub.as_ref());

        cache.add_to_cache("x", json!(42), None);
        hub.publish(GET_FROM_CACHE, &[json!("x")]);
        hub.publish(GET_FROM_CACHE, &[json!("missing")]);

        assert_eq!(*responses.lock(), vec![vec![json!(42)], vec![]]);
    }

    #[test]
    fn test_all_events_route_to_operations() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let cache = cache_on(hub.clone(), CacheOptions::private());

        hub.publish(CREATE_CACHE, &[json!("ns")]);
        assert!(cache.has_namespace(Some("ns")));

        hub.publish(ADD_TO_CACHE, &[json!("k"), json!({"a": 1}), json!("ns")]);
        assert_eq!(cache.get_from_cache("k", Some("ns")), Some(json!({"a": 1})));

        hub.publish(REMOVE_FROM_CACHE, &[json!("k"), json!("ns")]);
        assert_eq!(cache.get_from_cache("k", Some("ns")), None);
        assert!(cache.contains_key("k", Some("ns")));

        hub.publish(ADD_TO_CACHE, &[json!("k2"), json!(true), json!("ns")]);
        hub.publish(CLEAR_CACHE, &[json!("ns")]);
        assert!(cache.keys(Some("ns")).is_empty());

        hub.publish(CREATE_CACHE, &[]);
        assert!(cache.has_namespace(None));
    }

    #[test]
    fn test_malformed_get_still_responds() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let cache = cache_on(hub.clone(), CacheOptions::private());
        let responses = collect_responses(hub.as_ref());

        hub.publish(GET_FROM_CACHE, &[json!(7)]);
        hub.publish(GET_FROM_CACHE, &[]);
        hub.publish(GET_FROM_CACHE, &[json!("k"), json!(false)]);

        assert_eq!(*responses.lock(), vec![Vec::<Value>::new(); 3]);
        assert!(cache.namespaces().is_empty());
    }

    #[test]
    fn test_fan_out_to_every_instance() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let a = cache_on(hub.clone(), CacheOptions::private());
        let b = cache_on(hub.clone(), CacheOptions::private());

        hub.publish(ADD_TO_CACHE, &[json!("x"), json!(1)]);

        assert_eq!(a.get_from_cache("x", None), Some(json!(1)));
        assert_eq!(b.get_from_cache("x", None), Some(json!(1)));
    }

    #[test]
    fn test_dropped_cache_stops_reacting() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let registry = StoreRegistry::new();
        let options = CacheOptions::shared().event_handler(hub.clone());
        let listener = Cache::with_registry(options.clone(), &registry);
        drop(listener);

        hub.publish(ADD_TO_CACHE, &[json!("x"), json!(1)]);

        let observer = Cache::unsubscribed(options, &registry);
        assert_eq!(observer.get_from_cache("x", None), None);
    }

    #[test]
    fn test_malformed_events_are_ignored() {
        let hub: Arc<dyn EventHandler> = Arc::new(EventBus::new());
        let cache = cache_on(hub.clone(), CacheOptions::private());

        hub.publish(ADD_TO_CACHE, &[]);
        hub.publish(ADD_TO_CACHE, &[json!(7), json!("v")]);
        hub.publish(ADD_TO_CACHE, &[json!("k"), json!("v"), json!(3)]);

        assert!(cache.namespaces().is_empty());
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            CacheCommand::decode(ADD_TO_CACHE, &[json!("k")]),
            Ok(CacheCommand::Add {
                key: "k".into(),
                value: Value::Null,
                namespace: None,
            })
        );
        assert_eq!(
            CacheCommand::decode(GET_FROM_CACHE, &[json!("k"), Value::Null]),
            Ok(CacheCommand::Get {
                key: "k".into(),
                namespace: None,
            })
        );
        assert_eq!(
            CacheCommand::decode(REMOVE_FROM_CACHE, &[]),
            Err(BridgeError::MissingArgument {
                event: REMOVE_FROM_CACHE,
                name: "key",
            })
        );
        assert_eq!(
            CacheCommand::decode(CLEAR_CACHE, &[json!(1)]),
            Err(BridgeError::NotAString {
                event: CLEAR_CACHE,
                name: "namespace",
                found: "1".into(),
            })
        );
        assert!(matches!(
            CacheCommand::decode("cache.unknown", &[]),
            Err(BridgeError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_encode_matches_event_table() {
        let add = CacheCommand::Add {
            key: "k".into(),
            value: json!(1),
            namespace: Some("ns".into()),
        };
        assert_eq!(
            add.encode(),
            (ADD_TO_CACHE, vec![json!("k"), json!(1), json!("ns")])
        );
        assert_eq!(
            CacheCommand::Clear { namespace: None }.encode(),
            (CLEAR_CACHE, vec![])
        );
    }
}
