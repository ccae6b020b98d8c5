//! Disruption event taxonomy
//!
//! Every event the engine publishes is a variant of [`Event`], tagged
//! by the closed [`EventKind`] enum. Dispatch is keyed by the tag, so
//! the set of routable events is fixed at compile time. Events are
//! immutable timestamped value objects; handlers receive them by
//! reference and clone what they keep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Airport, Flight, RecipientRole, Severity};

/// Closed tag identifying an event variant, the dispatch key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A weather impact was reported at an airport
    WeatherImpactDetected,
    /// Airport-wide operational friction was derived from an impact
    OperationalDelayDetected,
    /// A flight's departure was pushed back
    FlightImpeded,
    /// A flight's destination was substituted mid-flight
    FlightRedirected,
    /// A notification was addressed to one recipient role
    NotificationSent,
    /// An airport was registered
    AirportCreated,
    /// A flight was registered
    FlightCreated,
}

impl EventKind {
    /// All routable kinds, in taxonomy order
    pub const ALL: [EventKind; 7] = [
        EventKind::WeatherImpactDetected,
        EventKind::OperationalDelayDetected,
        EventKind::FlightImpeded,
        EventKind::FlightRedirected,
        EventKind::NotificationSent,
        EventKind::AirportCreated,
        EventKind::FlightCreated,
    ];

    /// Stable name used for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WeatherImpactDetected => "WeatherImpactDetected",
            EventKind::OperationalDelayDetected => "OperationalDelayDetected",
            EventKind::FlightImpeded => "FlightImpeded",
            EventKind::FlightRedirected => "FlightRedirected",
            EventKind::NotificationSent => "NotificationSent",
            EventKind::AirportCreated => "AirportCreated",
            EventKind::FlightCreated => "FlightCreated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A disruption event flowing through the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Event {
    /// External trigger: weather reported at an airport
    WeatherImpactDetected {
        airport_code: String,
        impact_type: String,
        severity: Severity,
        duration_minutes: i64,
        is_catastrophe: bool,
        timestamp: DateTime<Utc>,
    },
    /// Airport-wide friction; `flight_id` is synthetic, not a registry key
    OperationalDelayDetected {
        flight_id: String,
        delay_minutes: i64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Departure pushed back for a registered flight
    FlightImpeded {
        flight_id: String,
        reason: String,
        new_departure_time: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    /// Destination substituted for a flight already in transit
    FlightRedirected {
        flight_id: String,
        original_destination: String,
        new_destination: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// One notification addressed to one recipient role
    NotificationSent {
        recipient: RecipientRole,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// An airport entered the registry
    AirportCreated {
        airport: Airport,
        timestamp: DateTime<Utc>,
    },
    /// A flight entered the registry
    FlightCreated {
        flight: Flight,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Dispatch tag of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::WeatherImpactDetected { .. } => EventKind::WeatherImpactDetected,
            Event::OperationalDelayDetected { .. } => EventKind::OperationalDelayDetected,
            Event::FlightImpeded { .. } => EventKind::FlightImpeded,
            Event::FlightRedirected { .. } => EventKind::FlightRedirected,
            Event::NotificationSent { .. } => EventKind::NotificationSent,
            Event::AirportCreated { .. } => EventKind::AirportCreated,
            Event::FlightCreated { .. } => EventKind::FlightCreated,
        }
    }

    /// When the event was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::WeatherImpactDetected { timestamp, .. }
            | Event::OperationalDelayDetected { timestamp, .. }
            | Event::FlightImpeded { timestamp, .. }
            | Event::FlightRedirected { timestamp, .. }
            | Event::NotificationSent { timestamp, .. }
            | Event::AirportCreated { timestamp, .. }
            | Event::FlightCreated { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_covers_every_variant() {
        let now = Utc::now();
        let events = [
            Event::WeatherImpactDetected {
                airport_code: "JFK".to_string(),
                impact_type: "storm".to_string(),
                severity: Severity::High,
                duration_minutes: 60,
                is_catastrophe: false,
                timestamp: now,
            },
            Event::OperationalDelayDetected {
                flight_id: "FLIGHT-JFK-1700000000000".to_string(),
                delay_minutes: 60,
                reason: "Weather impact: storm".to_string(),
                timestamp: now,
            },
            Event::FlightImpeded {
                flight_id: "FL1".to_string(),
                reason: "Weather impact: fog at JFK".to_string(),
                new_departure_time: now,
                timestamp: now,
            },
            Event::FlightRedirected {
                flight_id: "FL2".to_string(),
                original_destination: "LAX".to_string(),
                new_destination: "SFO".to_string(),
                reason: "Catastrophic earthquake at LAX - redirected to SFO".to_string(),
                timestamp: now,
            },
            Event::NotificationSent {
                recipient: RecipientRole::Company,
                message: "Flight FL1 delayed by 60 minutes due to Weather impact: storm"
                    .to_string(),
                timestamp: now,
            },
        ];

        let kinds: Vec<EventKind> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::WeatherImpactDetected,
                EventKind::OperationalDelayDetected,
                EventKind::FlightImpeded,
                EventKind::FlightRedirected,
                EventKind::NotificationSent,
            ]
        );
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = Event::FlightImpeded {
            flight_id: "FL1".to_string(),
            reason: "Weather impact: fog at JFK".to_string(),
            new_departure_time: Utc::now(),
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json.get("type").unwrap(), "FlightImpeded");
        assert!(json.get("flightId").is_some());
        assert!(json.get("newDepartureTime").is_some());
    }

    #[test]
    fn test_all_lists_every_kind_once() {
        let mut seen = std::collections::HashSet::new();
        for kind in EventKind::ALL {
            assert!(seen.insert(kind), "duplicate kind {kind}");
        }
        assert_eq!(seen.len(), 7);
    }
}
