//! Live notification push gateway
//!
//! Best-effort fan-out of sent notifications to connected subscribers
//! over a broadcast channel. Each pushed copy gets its own delivery id
//! and a fresh delivery timestamp; the push never blocks dispatch and
//! a missing subscriber is not an error. A subscriber that falls
//! behind receives an explicit lag item instead of silently losing
//! track.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::bus::{EventBus, SubscriptionId};
use crate::clock::SharedClock;
use crate::events::{Event, EventKind};
use crate::types::RecipientRole;

/// Broadcast buffer before slow subscribers start lagging
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Wire shape of one pushed notification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushedNotification {
    /// Generated delivery id, unique per push
    pub id: String,
    /// Addressed role
    pub recipient: RecipientRole,
    /// Rendered message
    pub message: String,
    /// Delivery time, not the originating event time
    pub timestamp: DateTime<Utc>,
}

/// Item yielded by a [`NotificationStream`]
#[derive(Debug, Clone)]
pub enum PushUpdate {
    /// A delivered notification
    Notification(PushedNotification),
    /// The subscriber fell behind and missed `missed` notifications
    Lagged { missed: u64 },
}

/// Pushes sent notifications to live subscribers
pub struct NotificationGateway {
    tx: broadcast::Sender<PushedNotification>,
    clock: SharedClock,
}

impl NotificationGateway {
    /// Create a gateway with the default buffer
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity(clock, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a gateway with an explicit buffer size
    pub fn with_capacity(clock: SharedClock, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, clock }
    }

    /// Subscribe this gateway to `NotificationSent` on the bus
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> SubscriptionId {
        let gateway = Arc::clone(self);
        bus.subscribe_fn(
            EventKind::NotificationSent,
            "push-gateway",
            move |_, event| {
                if let Event::NotificationSent {
                    recipient, message, ..
                } = event
                {
                    gateway.push(*recipient, message.clone());
                }
                Ok(())
            },
        )
    }

    /// Push one notification to all current subscribers
    pub fn push(&self, recipient: RecipientRole, message: String) -> PushedNotification {
        let pushed = PushedNotification {
            id: Uuid::new_v4().to_string(),
            recipient,
            message,
            timestamp: self.clock.now(),
        };
        debug!(id = %pushed.id, recipient = %recipient, "broadcasting notification");
        // Ignore send errors (no receivers).
        let _ = self.tx.send(pushed.clone());
        pushed
    }

    /// Open a live stream of pushed notifications
    pub fn subscribe(&self) -> NotificationStream {
        NotificationStream {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving end of the push gateway
pub struct NotificationStream {
    rx: broadcast::Receiver<PushedNotification>,
}

impl NotificationStream {
    /// Receive the next update
    ///
    /// Returns `None` once the gateway is dropped. Falling behind the
    /// broadcast buffer yields a [`PushUpdate::Lagged`] item and the
    /// stream then resumes from the oldest retained notification.
    pub async fn recv(&mut self) -> Option<PushUpdate> {
        match self.rx.recv().await {
            Ok(notification) => Some(PushUpdate::Notification(notification)),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                Some(PushUpdate::Lagged { missed })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Adapt this stream to a `futures::Stream`
    pub fn into_stream(self) -> impl Stream<Item = PushUpdate> {
        futures::stream::unfold(self, |mut stream| async move {
            stream.recv().await.map(|update| (update, stream))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use futures::StreamExt;

    fn gateway() -> Arc<NotificationGateway> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        Arc::new(NotificationGateway::new(Arc::new(clock)))
    }

    #[tokio::test]
    async fn test_subscriber_receives_pushed_notification() {
        let gateway = gateway();
        let mut stream = gateway.subscribe();

        gateway.push(RecipientRole::Passengers, "boarding changed".to_string());

        match stream.recv().await {
            Some(PushUpdate::Notification(pushed)) => {
                assert_eq!(pushed.recipient, RecipientRole::Passengers);
                assert_eq!(pushed.message, "boarding changed");
                assert!(!pushed.id.is_empty());
            }
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_each_push_gets_distinct_delivery_id() {
        let gateway = gateway();
        let mut stream = gateway.subscribe();

        gateway.push(RecipientRole::Company, "same text".to_string());
        gateway.push(RecipientRole::Company, "same text".to_string());

        let first = match stream.recv().await {
            Some(PushUpdate::Notification(n)) => n.id,
            other => panic!("unexpected update {other:?}"),
        };
        let second = match stream.recv().await {
            Some(PushUpdate::Notification(n)) => n.id,
            other => panic!("unexpected update {other:?}"),
        };
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_gets_explicit_item() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());
        let gateway = NotificationGateway::with_capacity(Arc::new(clock), 2);
        let mut stream = gateway.subscribe();

        for i in 0..5 {
            gateway.push(RecipientRole::Operator, format!("update {i}"));
        }

        match stream.recv().await {
            Some(PushUpdate::Lagged { missed }) => assert_eq!(missed, 3),
            other => panic!("unexpected update {other:?}"),
        }
        // Resumes from the oldest retained notification.
        match stream.recv().await {
            Some(PushUpdate::Notification(n)) => assert_eq!(n.message, "update 3"),
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_recv_stays_pending_until_a_push_arrives() {
        let gateway = gateway();
        let mut stream = gateway.subscribe();

        let mut recv = tokio_test::task::spawn(stream.recv());
        tokio_test::assert_pending!(recv.poll());

        gateway.push(RecipientRole::Company, "now there is one".to_string());

        match recv.await {
            Some(PushUpdate::Notification(n)) => assert_eq!(n.message, "now there is one"),
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stream_ends_when_gateway_dropped() {
        let gateway = gateway();
        let mut stream = gateway.subscribe();
        drop(gateway);
        assert!(stream.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_push_without_subscribers_is_not_an_error() {
        let gateway = gateway();
        let pushed = gateway.push(RecipientRole::Authority, "nobody listening".to_string());
        assert_eq!(pushed.recipient, RecipientRole::Authority);
        assert_eq!(gateway.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_into_stream_yields_updates() {
        let gateway = gateway();
        let stream = gateway.subscribe().into_stream();
        futures::pin_mut!(stream);

        gateway.push(RecipientRole::Cco, "streamed".to_string());

        match stream.next().await {
            Some(PushUpdate::Notification(n)) => assert_eq!(n.message, "streamed"),
            other => panic!("unexpected update {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gateway_attached_to_bus_pushes_sent_notifications() {
        let bus = EventBus::new();
        let gateway = gateway();
        gateway.attach(&bus);
        let mut stream = gateway.subscribe();

        bus.publish(Event::NotificationSent {
            recipient: RecipientRole::Company,
            message: "via bus".to_string(),
            timestamp: Utc::now(),
        });

        match stream.recv().await {
            Some(PushUpdate::Notification(n)) => assert_eq!(n.message, "via bus"),
            other => panic!("unexpected update {other:?}"),
        }
    }
}
