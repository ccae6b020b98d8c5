//! Synchronous event bus
//!
//! Delivers each published [`Event`] to every handler subscribed for
//! that event's [`EventKind`], in subscription order, before `publish`
//! returns. Handlers may publish further events from inside their own
//! invocation; the bus snapshots the handler list before dispatching,
//! so re-entrant publish and subscribe calls never deadlock on the
//! dispatch table.
//!
//! Failure isolation: a handler that returns `Err` or panics is logged
//! and skipped; delivery to the remaining handlers continues. Panics
//! are contained with `catch_unwind` so one misbehaving handler cannot
//! tear down the dispatch chain.

use parking_lot::RwLock;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::events::{Event, EventKind};
use crate::metrics::CascadeMetrics;

/// Handler invoked for each matching event
///
/// Handlers receive the bus itself so they can publish follow-up
/// events re-entrantly.
pub type EventHandler = Arc<dyn Fn(&EventBus, &Event) -> Result<()> + Send + Sync>;

/// Opaque handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    name: String,
    handler: EventHandler,
}

thread_local! {
    // Diagnostic only: the domain's chains stay within three hops, so
    // no recursion guard is enforced.
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Typed publish/subscribe dispatcher keyed by [`EventKind`]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Registration>>>,
    next_id: AtomicU64,
    metrics: Option<Arc<CascadeMetrics>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics: None,
        }
    }

    /// Create a bus that records dispatch metrics
    pub fn with_metrics(metrics: Arc<CascadeMetrics>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics: Some(metrics),
        }
    }

    /// Register a handler for one event kind
    ///
    /// `name` identifies the handler in failure logs. Handlers for the
    /// same kind run in subscription order.
    pub fn subscribe(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        handler: EventHandler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Registration {
            id,
            name: name.into(),
            handler,
        };
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(registration);
        id
    }

    /// Register a closure for one event kind
    pub fn subscribe_fn<F>(&self, kind: EventKind, name: impl Into<String>, f: F) -> SubscriptionId
    where
        F: Fn(&EventBus, &Event) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(kind, name, Arc::new(f))
    }

    /// Remove a handler; returns whether it was still registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        for registrations in handlers.values_mut() {
            if let Some(pos) = registrations.iter().position(|r| r.id == id) {
                registrations.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver an event to every handler subscribed for its kind
    ///
    /// Synchronous: all handlers (and any events they publish
    /// re-entrantly) complete before this returns. Returns the number
    /// of handlers invoked for the outer event.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind();
        let depth = DISPATCH_DEPTH.with(|d| {
            let depth = d.get() + 1;
            d.set(depth);
            depth
        });

        debug!(kind = %kind, depth, payload = ?event, "publishing event");
        if let Some(metrics) = &self.metrics {
            metrics.record_event_published(kind);
        }

        // Snapshot so handlers can subscribe/publish without deadlock.
        let snapshot: Vec<Registration> = {
            let handlers = self.handlers.read();
            handlers.get(&kind).cloned().unwrap_or_default()
        };

        let mut invoked = 0;
        for registration in &snapshot {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| (registration.handler)(self, &event)));
            invoked += 1;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_handler_failure(kind);
                    }
                    warn!(
                        kind = %kind,
                        handler = %registration.name,
                        error = %err,
                        "event handler failed"
                    );
                }
                Err(panic_err) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_handler_failure(kind);
                    }
                    let info = {
                        let any = &*panic_err;
                        if let Some(msg) = any.downcast_ref::<&'static str>() {
                            (*msg).to_string()
                        } else if let Some(msg) = any.downcast_ref::<String>() {
                            msg.clone()
                        } else {
                            "unknown panic".to_string()
                        }
                    };
                    error!(
                        kind = %kind,
                        handler = %registration.name,
                        panic = %info,
                        "event handler panicked"
                    );
                }
            }
        }

        DISPATCH_DEPTH.with(|d| d.set(d.get() - 1));
        invoked
    }

    /// Number of handlers currently registered for a kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers
            .read()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Subscription counts for every kind, in taxonomy order
    pub fn subscription_counts(&self) -> Vec<(EventKind, usize)> {
        let handlers = self.handlers.read();
        EventKind::ALL
            .iter()
            .map(|kind| (*kind, handlers.get(kind).map(Vec::len).unwrap_or(0)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let total: usize = handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("kinds", &handlers.len())
            .field("handlers", &total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use crate::types::RecipientRole;

    fn notification(message: &str) -> Event {
        Event::NotificationSent {
            recipient: RecipientRole::Company,
            message: message.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.subscribe_fn(EventKind::NotificationSent, tag, move |_, _| {
                order.lock().push(tag);
                Ok(())
            });
        }

        let invoked = bus.publish(notification("order check"));
        assert_eq!(invoked, 3);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_publish_only_reaches_matching_kind() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&hits);
        bus.subscribe_fn(EventKind::FlightImpeded, "impeded-only", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(notification("wrong kind"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.publish(Event::FlightImpeded {
            flight_id: "FL1".to_string(),
            reason: "Weather impact: fog at JFK".to_string(),
            new_departure_time: Utc::now(),
            timestamp: Utc::now(),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let reached = Arc::new(AtomicU64::new(0));

        bus.subscribe_fn(EventKind::NotificationSent, "erroring", |_, _| {
            Err(crate::error::CascadeError::runtime("handler error"))
        });
        bus.subscribe_fn(EventKind::NotificationSent, "panicking", |_, _| {
            panic!("handler panic")
        });
        let counter = Arc::clone(&reached);
        bus.subscribe_fn(EventKind::NotificationSent, "surviving", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let invoked = bus.publish(notification("isolation check"));
        assert_eq!(invoked, 3);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_publish_dispatches_immediately() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let inner_order = Arc::clone(&order);
        bus.subscribe_fn(EventKind::FlightImpeded, "inner", move |_, _| {
            inner_order.lock().push("inner");
            Ok(())
        });

        let outer_order = Arc::clone(&order);
        bus.subscribe_fn(EventKind::NotificationSent, "outer", move |bus, _| {
            outer_order.lock().push("outer-before");
            bus.publish(Event::FlightImpeded {
                flight_id: "FL1".to_string(),
                reason: "nested".to_string(),
                new_departure_time: Utc::now(),
                timestamp: Utc::now(),
            });
            outer_order.lock().push("outer-after");
            Ok(())
        });

        bus.publish(notification("re-entrant check"));
        assert_eq!(*order.lock(), vec!["outer-before", "inner", "outer-after"]);
    }

    #[test]
    fn test_reentrant_subscribe_does_not_deadlock() {
        let bus = EventBus::new();
        bus.subscribe_fn(EventKind::NotificationSent, "registrar", |bus, _| {
            bus.subscribe_fn(EventKind::FlightImpeded, "late", |_, _| Ok(()));
            Ok(())
        });

        bus.publish(notification("subscribe inside dispatch"));
        assert_eq!(bus.subscriber_count(EventKind::FlightImpeded), 1);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&hits);
        let id = bus.subscribe_fn(EventKind::NotificationSent, "removable", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(notification("before"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(notification("after"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(EventKind::NotificationSent), 0);
    }

    #[test]
    fn test_subscription_counts_cover_all_kinds() {
        let bus = EventBus::new();
        bus.subscribe_fn(EventKind::WeatherImpactDetected, "a", |_, _| Ok(()));
        bus.subscribe_fn(EventKind::WeatherImpactDetected, "b", |_, _| Ok(()));

        let counts = bus.subscription_counts();
        assert_eq!(counts.len(), EventKind::ALL.len());
        assert!(counts.contains(&(EventKind::WeatherImpactDetected, 2)));
        assert!(counts.contains(&(EventKind::FlightRedirected, 0)));
    }
}
