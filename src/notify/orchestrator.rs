//! Notification orchestrator
//!
//! Expands each disruption event into one `NotificationSent` per
//! recipient role. Recipient sets are fixed per trigger and the
//! message templates are a wire contract: downstream consumers parse
//! them, so the wording must not drift.

use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::bus::{EventBus, SubscriptionId};
use crate::clock::SharedClock;
use crate::events::{Event, EventKind};
use crate::metrics::CascadeMetrics;
use crate::types::RecipientRole;

const DELAY_RECIPIENTS: [RecipientRole; 3] = [
    RecipientRole::Company,
    RecipientRole::Cco,
    RecipientRole::Operator,
];

const IMPEDIMENT_RECIPIENTS: [RecipientRole; 4] = [
    RecipientRole::Company,
    RecipientRole::Cco,
    RecipientRole::Operator,
    RecipientRole::Authority,
];

const REDIRECTION_RECIPIENTS: [RecipientRole; 5] = [
    RecipientRole::Company,
    RecipientRole::Cco,
    RecipientRole::Operator,
    RecipientRole::Authority,
    RecipientRole::Passengers,
];

/// Fans disruption events out into role-targeted notifications
pub struct NotificationOrchestrator {
    clock: SharedClock,
    metrics: Option<Arc<CascadeMetrics>>,
}

impl NotificationOrchestrator {
    /// Create an orchestrator stamping notifications from `clock`
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            metrics: None,
        }
    }

    /// Record fan-out metrics
    pub fn with_metrics(mut self, metrics: Arc<CascadeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe this orchestrator to the three disruption triggers
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Vec<SubscriptionId> {
        let mut ids = Vec::with_capacity(3);

        let orchestrator = Arc::clone(self);
        ids.push(bus.subscribe_fn(
            EventKind::OperationalDelayDetected,
            "notify-delay",
            move |bus, event| {
                if let Event::OperationalDelayDetected {
                    flight_id,
                    delay_minutes,
                    reason,
                    ..
                } = event
                {
                    orchestrator.notify_delay(bus, flight_id, *delay_minutes, reason);
                }
                Ok(())
            },
        ));

        let orchestrator = Arc::clone(self);
        ids.push(bus.subscribe_fn(
            EventKind::FlightImpeded,
            "notify-impediment",
            move |bus, event| {
                if let Event::FlightImpeded {
                    flight_id,
                    reason,
                    new_departure_time,
                    ..
                } = event
                {
                    orchestrator.notify_impeded(bus, flight_id, reason, *new_departure_time);
                }
                Ok(())
            },
        ));

        let orchestrator = Arc::clone(self);
        ids.push(bus.subscribe_fn(
            EventKind::FlightRedirected,
            "notify-redirection",
            move |bus, event| {
                if let Event::FlightRedirected {
                    flight_id,
                    original_destination,
                    new_destination,
                    reason,
                    ..
                } = event
                {
                    orchestrator.notify_redirected(
                        bus,
                        flight_id,
                        original_destination,
                        new_destination,
                        reason,
                    );
                }
                Ok(())
            },
        ));

        ids
    }

    /// Notify a delay: company, cco, operator
    pub fn notify_delay(&self, bus: &EventBus, flight_id: &str, delay_minutes: i64, reason: &str) {
        let message = format!(
            "Flight {} delayed by {} minutes due to {}",
            flight_id, delay_minutes, reason
        );
        self.fan_out(bus, &DELAY_RECIPIENTS, message);
    }

    /// Notify an impediment: company, cco, operator, authority
    pub fn notify_impeded(
        &self,
        bus: &EventBus,
        flight_id: &str,
        reason: &str,
        new_departure_time: DateTime<Utc>,
    ) {
        let message = format!(
            "Flight {} is impeded due to {}. New departure time: {}",
            flight_id,
            reason,
            new_departure_time.to_rfc3339_opts(SecondsFormat::Millis, true)
        );
        self.fan_out(bus, &IMPEDIMENT_RECIPIENTS, message);
    }

    /// Notify a redirection: company, cco, operator, authority, passengers
    pub fn notify_redirected(
        &self,
        bus: &EventBus,
        flight_id: &str,
        original_destination: &str,
        new_destination: &str,
        reason: &str,
    ) {
        let message = format!(
            "EMERGENCY: Flight {} redirected from {} to {} due to {}. Passengers will be informed of new arrival procedures.",
            flight_id, original_destination, new_destination, reason
        );
        self.fan_out(bus, &REDIRECTION_RECIPIENTS, message);
    }

    fn fan_out(&self, bus: &EventBus, recipients: &[RecipientRole], message: String) {
        debug!(recipients = recipients.len(), message = %message, "fanning out notification");
        for recipient in recipients {
            if let Some(metrics) = &self.metrics {
                metrics.record_notification_sent(*recipient);
            }
            bus.publish(Event::NotificationSent {
                recipient: *recipient,
                message: message.clone(),
                timestamp: self.clock.now(),
            });
        }
    }
}
