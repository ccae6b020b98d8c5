//! Notification storage handler
//!
//! Subscribes to `NotificationSent`, classifies each message by
//! content, and retains a bounded newest-first history. The
//! classification tag is derived from the rendered text, a retrieval
//! convenience rather than a second source of truth about the
//! triggering event.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::bus::{EventBus, SubscriptionId};
use crate::events::{Event, EventKind};
use crate::metrics::CascadeMetrics;
use crate::types::{NotificationKind, RecipientRole};

/// Most recent notifications retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// A notification retained in history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    /// Monotonic-unique id assigned at storage time
    pub id: u64,
    /// Addressed role
    pub recipient: RecipientRole,
    /// Rendered message
    pub message: String,
    /// Derived category, `type` on the wire
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// When the notification was sent
    pub timestamp: DateTime<Utc>,
}

/// Bounded newest-first notification history
pub struct NotificationStore {
    history: RwLock<VecDeque<StoredNotification>>,
    next_id: AtomicU64,
    capacity: usize,
    metrics: Option<Arc<CascadeMetrics>>,
}

impl NotificationStore {
    /// Create a store retaining the default 100 entries
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a store with an explicit retention cap
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            capacity,
            metrics: None,
        }
    }

    /// Record history-size metrics
    pub fn with_metrics(mut self, metrics: Arc<CascadeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe this store to `NotificationSent` on the bus
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> SubscriptionId {
        let store = Arc::clone(self);
        bus.subscribe_fn(
            EventKind::NotificationSent,
            "notification-store",
            move |_, event| {
                if let Event::NotificationSent {
                    recipient,
                    message,
                    timestamp,
                } = event
                {
                    store.record(*recipient, message.clone(), *timestamp);
                }
                Ok(())
            },
        )
    }

    /// Classify and store one notification, evicting the oldest past
    /// the cap
    pub fn record(
        &self,
        recipient: RecipientRole,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> StoredNotification {
        let kind = NotificationKind::classify(&message);
        let stored = StoredNotification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            recipient,
            message,
            kind,
            timestamp,
        };
        info!(
            id = stored.id,
            recipient = %stored.recipient,
            kind = %stored.kind,
            message = %stored.message,
            "notification sent"
        );

        let len = {
            let mut history = self.history.write();
            history.push_front(stored.clone());
            history.truncate(self.capacity);
            history.len()
        };
        if let Some(metrics) = &self.metrics {
            metrics.set_notification_history(len);
        }
        stored
    }

    /// All retained notifications, newest first
    pub fn all(&self) -> Vec<StoredNotification> {
        self.history.read().iter().cloned().collect()
    }

    /// Retained notifications of one kind, newest first
    pub fn by_kind(&self, kind: NotificationKind) -> Vec<StoredNotification> {
        self.history
            .read()
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    /// Retained notifications addressed to one role, newest first
    pub fn by_recipient(&self, recipient: RecipientRole) -> Vec<StoredNotification> {
        self.history
            .read()
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Number of retained notifications
    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    /// Whether history is empty
    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }

    /// Replace history with records loaded from persistence
    ///
    /// Keeps the given newest-first order, re-applies the cap, and
    /// advances the id counter past the highest restored id.
    pub fn restore(&self, notifications: Vec<StoredNotification>) {
        let mut history = self.history.write();
        history.clear();
        let mut max_id = 0;
        for notification in notifications.into_iter().take(self.capacity) {
            max_id = max_id.max(notification.id);
            history.push_back(notification);
        }
        drop(history);
        self.next_id.store(max_id + 1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.set_notification_history(self.len());
        }
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationStore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NotificationStore {
        NotificationStore::new()
    }

    #[test]
    fn test_history_is_newest_first() {
        let store = store();
        for i in 0..3 {
            store.record(
                RecipientRole::Company,
                format!("notice {i}"),
                Utc::now(),
            );
        }

        let all = store.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].message, "notice 2");
        assert_eq!(all[2].message, "notice 0");
    }

    #[test]
    fn test_history_truncates_at_capacity() {
        let store = NotificationStore::with_capacity(5);
        for i in 0..12 {
            store.record(
                RecipientRole::Operator,
                format!("notice {i}"),
                Utc::now(),
            );
        }

        let all = store.all();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].message, "notice 11");
        assert_eq!(all[4].message, "notice 7");
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let store = store();
        let first = store.record(RecipientRole::Company, "a".to_string(), Utc::now());
        let second = store.record(RecipientRole::Company, "b".to_string(), Utc::now());
        assert!(second.id > first.id);
    }

    #[test]
    fn test_classification_round_trips_templates() {
        let store = store();
        store.record(
            RecipientRole::Company,
            "Flight FL1 delayed by 30 minutes due to Weather impact: rain".to_string(),
            Utc::now(),
        );
        store.record(
            RecipientRole::Authority,
            "Flight FL1 is impeded due to Weather impact: fog at JFK. \
             New departure time: 2026-01-01T14:00:00.000Z"
                .to_string(),
            Utc::now(),
        );
        store.record(
            RecipientRole::Passengers,
            "EMERGENCY: Flight FL2 redirected from LAX to SFO due to \
             Catastrophic earthquake at LAX - redirected to SFO. \
             Passengers will be informed of new arrival procedures."
                .to_string(),
            Utc::now(),
        );
        store.record(RecipientRole::Cco, "misc announcement".to_string(), Utc::now());

        assert_eq!(store.by_kind(NotificationKind::Delay).len(), 1);
        assert_eq!(store.by_kind(NotificationKind::Impediment).len(), 1);
        assert_eq!(store.by_kind(NotificationKind::Redirection).len(), 1);
        assert_eq!(store.by_kind(NotificationKind::General).len(), 1);
    }

    #[test]
    fn test_query_by_recipient() {
        let store = store();
        store.record(RecipientRole::Company, "for company".to_string(), Utc::now());
        store.record(RecipientRole::Cco, "for cco".to_string(), Utc::now());
        store.record(RecipientRole::Company, "for company again".to_string(), Utc::now());

        let company = store.by_recipient(RecipientRole::Company);
        assert_eq!(company.len(), 2);
        assert_eq!(company[0].message, "for company again");
        assert!(store.by_recipient(RecipientRole::Passengers).is_empty());
    }

    #[test]
    fn test_attach_stores_published_notifications() {
        let bus = EventBus::new();
        let store = Arc::new(NotificationStore::new());
        store.attach(&bus);

        bus.publish(Event::NotificationSent {
            recipient: RecipientRole::Company,
            message: "Flight FL1 delayed by 60 minutes due to Weather impact: storm".to_string(),
            timestamp: Utc::now(),
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].kind, NotificationKind::Delay);
    }

    #[test]
    fn test_stored_notification_wire_shape() {
        let store = store();
        let stored = store.record(
            RecipientRole::Company,
            "Flight FL1 delayed by 60 minutes due to Weather impact: storm".to_string(),
            Utc::now(),
        );

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json.get("type").unwrap(), "delay");
        assert_eq!(json.get("recipient").unwrap(), "company");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_restore_resumes_id_sequence() {
        let store = store();
        let loaded = vec![
            StoredNotification {
                id: 41,
                recipient: RecipientRole::Company,
                message: "latest".to_string(),
                kind: NotificationKind::General,
                timestamp: Utc::now(),
            },
            StoredNotification {
                id: 40,
                recipient: RecipientRole::Company,
                message: "older".to_string(),
                kind: NotificationKind::General,
                timestamp: Utc::now(),
            },
        ];

        store.restore(loaded);
        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[0].message, "latest");

        let next = store.record(RecipientRole::Cco, "new".to_string(), Utc::now());
        assert_eq!(next.id, 42);
    }
}
