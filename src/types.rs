//! Core domain types for the cascade engine
//!
//! ## Table of Contents
//! - **Airport**: Registered airport with a derived flight list
//! - **Flight**: Scheduled flight with disruption status overlays
//! - **AirportSpec** / **FlightSpec**: Registration payloads
//! - **Severity**: Weather impact severity scale
//! - **FlightPhase**: Time-derived lifecycle phase
//! - **RecipientRole** / **NotificationKind**: Notification taxonomy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CascadeError, Result};

/// Severity of a weather impact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Negligible operational effect
    Low,
    /// Noticeable delays expected
    Medium,
    /// Major delays expected
    High,
    /// Airport-wide emergency; in-flight traffic may be diverted
    Catastrophic,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Catastrophic => "catastrophic",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle phase of a flight, derived from the clock and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightPhase {
    /// Departure time is still in the future
    Scheduled,
    /// Between departure and arrival (inclusive)
    Active,
    /// Arrival time has passed
    Completed,
}

/// Stakeholder role addressed by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    /// Operating airline
    Company,
    /// Chief commercial officer desk
    Cco,
    /// Ground/flight operator
    Operator,
    /// Aviation authority
    Authority,
    /// Affected passengers
    Passengers,
}

impl RecipientRole {
    /// Wire-format name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientRole::Company => "company",
            RecipientRole::Cco => "cco",
            RecipientRole::Operator => "operator",
            RecipientRole::Authority => "authority",
            RecipientRole::Passengers => "passengers",
        }
    }

    /// Parse a wire-format role name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(RecipientRole::Company),
            "cco" => Some(RecipientRole::Cco),
            "operator" => Some(RecipientRole::Operator),
            "authority" => Some(RecipientRole::Authority),
            "passengers" => Some(RecipientRole::Passengers),
            _ => None,
        }
    }
}

impl fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived category of a stored notification
///
/// Classified from the rendered message text by the storage handler.
/// This is a convenience tag for retrieval, not a second source of
/// truth about the triggering event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Operational delay announcement
    Delay,
    /// Departure pushed back
    Impediment,
    /// Destination substituted mid-flight
    Redirection,
    /// Anything that matches no known template
    General,
}

impl NotificationKind {
    /// Classify a rendered message by keyword
    pub fn classify(message: &str) -> Self {
        if message.contains("delayed") {
            NotificationKind::Delay
        } else if message.contains("impeded") {
            NotificationKind::Impediment
        } else if message.contains("redirected") || message.contains("EMERGENCY") {
            NotificationKind::Redirection
        } else {
            NotificationKind::General
        }
    }

    /// Wire-format name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Delay => "delay",
            NotificationKind::Impediment => "impediment",
            NotificationKind::Redirection => "redirection",
            NotificationKind::General => "general",
        }
    }

    /// Parse a wire-format kind name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "delay" => Some(NotificationKind::Delay),
            "impediment" => Some(NotificationKind::Impediment),
            "redirection" => Some(NotificationKind::Redirection),
            "general" => Some(NotificationKind::General),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registered airport
///
/// Immutable after registration except for `flights`, a derived
/// back-reference list of flight ids touching this airport, kept for
/// query convenience only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    /// IATA-style code, primary key
    pub code: String,
    /// Airport name
    pub name: String,
    /// City served
    pub city: String,
    /// Country
    pub country: String,
    /// Latitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Derived flight ids touching this airport (not a source of truth)
    #[serde(default)]
    pub flights: Vec<String>,
}

/// Registration payload for an airport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportSpec {
    /// IATA-style code, primary key
    pub code: String,
    /// Airport name
    pub name: String,
    /// City served
    pub city: String,
    /// Country
    pub country: String,
    /// Latitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl AirportSpec {
    /// Create a new airport spec
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            city: city.into(),
            country: country.into(),
            latitude: None,
            longitude: None,
        }
    }

    /// Set coordinates
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Build the airport record with an empty derived flight list
    pub fn into_airport(self) -> Airport {
        Airport {
            code: self.code,
            name: self.name,
            city: self.city,
            country: self.country,
            latitude: self.latitude,
            longitude: self.longitude,
            flights: Vec::new(),
        }
    }
}

/// Scheduled flight
///
/// `impeded`/`redirected` are status overlays set by disruption
/// processing and never cleared automatically. `destination` is
/// rewritten at most once, by a diversion; the original destination
/// survives only in the emitted `FlightRedirected` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    /// Flight identifier, primary key
    pub id: String,
    /// Departure airport code
    pub departure_point: String,
    /// Destination airport code
    pub destination: String,
    /// Scheduled departure
    pub departure_time: DateTime<Utc>,
    /// Scheduled arrival
    pub arrival_time: DateTime<Utc>,
    /// Operating company
    pub company: String,
    /// Departure pushed back by an overlapping disruption
    #[serde(default)]
    pub impeded: bool,
    /// Destination substituted by a catastrophic disruption
    #[serde(default)]
    pub redirected: bool,
    /// Why the flight was redirected, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirection_reason: Option<String>,
}

impl Flight {
    /// Lifecycle phase at `now`
    pub fn phase(&self, now: DateTime<Utc>) -> FlightPhase {
        if now < self.departure_time {
            FlightPhase::Scheduled
        } else if now <= self.arrival_time {
            FlightPhase::Active
        } else {
            FlightPhase::Completed
        }
    }

    /// Whether the flight is airborne at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.phase(now) == FlightPhase::Active
    }

    /// Whether the flight departs from or arrives at `code`
    pub fn touches(&self, code: &str) -> bool {
        self.departure_point == code || self.destination == code
    }
}

/// Registration payload for a flight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSpec {
    /// Flight identifier, primary key
    pub id: String,
    /// Departure airport code
    pub departure_point: String,
    /// Destination airport code
    pub destination: String,
    /// Scheduled departure
    pub departure_time: DateTime<Utc>,
    /// Scheduled arrival
    pub arrival_time: DateTime<Utc>,
    /// Operating company
    pub company: String,
}

impl FlightSpec {
    /// Create a new flight spec
    pub fn new(
        id: impl Into<String>,
        departure_point: impl Into<String>,
        destination: impl Into<String>,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        company: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            departure_point: departure_point.into(),
            destination: destination.into(),
            departure_time,
            arrival_time,
            company: company.into(),
        }
    }

    /// Reject schedules where departure is not strictly before arrival
    ///
    /// The evaluator's overlap and in-flight checks assume this
    /// ordering, so violations are surfaced to the caller instead of
    /// being stored.
    pub fn validate(&self) -> Result<()> {
        if self.departure_time >= self.arrival_time {
            return Err(CascadeError::invalid_schedule(format!(
                "flight {}: departure {} is not before arrival {}",
                self.id, self.departure_time, self.arrival_time
            )));
        }
        Ok(())
    }

    /// Build the flight record with cleared status overlays
    pub fn into_flight(self) -> Flight {
        Flight {
            id: self.id,
            departure_point: self.departure_point,
            destination: self.destination,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            company: self.company,
            impeded: false,
            redirected: false,
            redirection_reason: None,
        }
    }
}

/// Trigger payload for a simulated weather impact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherImpactRequest {
    /// Affected airport code
    pub airport_code: String,
    /// Kind of weather, e.g. "storm", "fog", "earthquake"
    pub impact_type: String,
    /// Severity of the impact
    pub severity: Severity,
    /// How long the impact lasts
    pub duration_minutes: i64,
    /// Explicit catastrophe flag; defaults from severity when omitted
    #[serde(default)]
    pub is_catastrophe: Option<bool>,
}

impl WeatherImpactRequest {
    /// Create a new trigger payload
    pub fn new(
        airport_code: impl Into<String>,
        impact_type: impl Into<String>,
        severity: Severity,
        duration_minutes: i64,
    ) -> Self {
        Self {
            airport_code: airport_code.into(),
            impact_type: impact_type.into(),
            severity,
            duration_minutes,
            is_catastrophe: None,
        }
    }

    /// Set the explicit catastrophe flag
    pub fn with_catastrophe(mut self, is_catastrophe: bool) -> Self {
        self.is_catastrophe = Some(is_catastrophe);
        self
    }

    /// Effective catastrophe flag: explicit value, or derived from severity
    pub fn resolved_catastrophe(&self) -> bool {
        self.is_catastrophe
            .unwrap_or(self.severity == Severity::Catastrophic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_flight_phase_derivation() {
        let now = Utc::now();
        let flight = FlightSpec::new(
            "FL1",
            "JFK",
            "LAX",
            now + Duration::hours(1),
            now + Duration::hours(4),
            "TestAir",
        )
        .into_flight();

        assert_eq!(flight.phase(now), FlightPhase::Scheduled);
        assert_eq!(flight.phase(now + Duration::hours(2)), FlightPhase::Active);
        assert_eq!(
            flight.phase(now + Duration::hours(5)),
            FlightPhase::Completed
        );
        // Boundaries are inclusive on both ends of the active window.
        assert_eq!(flight.phase(flight.departure_time), FlightPhase::Active);
        assert_eq!(flight.phase(flight.arrival_time), FlightPhase::Active);
    }

    #[test]
    fn test_flight_spec_rejects_inverted_schedule() {
        let now = Utc::now();
        let spec = FlightSpec::new(
            "FL2",
            "JFK",
            "LAX",
            now + Duration::hours(4),
            now + Duration::hours(1),
            "TestAir",
        );
        assert!(matches!(
            spec.validate(),
            Err(CascadeError::InvalidSchedule(_))
        ));

        let equal = FlightSpec::new("FL3", "JFK", "LAX", now, now, "TestAir");
        assert!(equal.validate().is_err());
    }

    #[test]
    fn test_classification_keywords() {
        assert_eq!(
            NotificationKind::classify("Flight FL1 delayed by 60 minutes due to Weather impact: storm"),
            NotificationKind::Delay
        );
        assert_eq!(
            NotificationKind::classify(
                "Flight FL1 is impeded due to Weather impact: fog at JFK. New departure time: 2026-01-01T00:00:00.000Z"
            ),
            NotificationKind::Impediment
        );
        assert_eq!(
            NotificationKind::classify("EMERGENCY: Flight FL1 redirected from LAX to SFO due to earthquake. Passengers will be informed of new arrival procedures."),
            NotificationKind::Redirection
        );
        assert_eq!(
            NotificationKind::classify("scheduled maintenance tonight"),
            NotificationKind::General
        );
    }

    #[test]
    fn test_recipient_role_round_trip() {
        for role in [
            RecipientRole::Company,
            RecipientRole::Cco,
            RecipientRole::Operator,
            RecipientRole::Authority,
            RecipientRole::Passengers,
        ] {
            assert_eq!(RecipientRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(RecipientRole::parse("press"), None);
    }

    #[test]
    fn test_catastrophe_defaults_from_severity() {
        let explicit = WeatherImpactRequest::new("LAX", "earthquake", Severity::Catastrophic, 120)
            .with_catastrophe(false);
        assert!(!explicit.resolved_catastrophe());

        let derived = WeatherImpactRequest::new("LAX", "earthquake", Severity::Catastrophic, 120);
        assert!(derived.resolved_catastrophe());

        let mild = WeatherImpactRequest::new("JFK", "fog", Severity::Medium, 90);
        assert!(!mild.resolved_catastrophe());
    }

    #[test]
    fn test_flight_wire_contract_field_names() {
        let now = Utc::now();
        let flight = FlightSpec::new(
            "FL9",
            "JFK",
            "LAX",
            now,
            now + Duration::hours(3),
            "TestAir",
        )
        .into_flight();

        let json = serde_json::to_value(&flight).unwrap();
        assert!(json.get("departurePoint").is_some());
        assert!(json.get("departureTime").is_some());
        assert!(json.get("arrivalTime").is_some());
        assert!(json.get("redirectionReason").is_none());
    }
}
