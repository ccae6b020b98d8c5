//! Impact evaluator
//!
//! Translates a weather impact into flight-level consequences. Two
//! paths run for every impact, in order:
//!
//! 1. Airport-wide friction: severity maps to a flat delay (high 60,
//!    medium 30, low/catastrophic 0; catastrophic is superseded by
//!    impediments and redirections). A synthetic operational id is
//!    emitted, independent of any registered flight.
//! 2. Per-flight consequences: every flight touching the airport whose
//!    schedule overlaps the impact window is impeded, except a flight
//!    that is airborne and headed *to* the affected airport during a
//!    catastrophe, which is diverted instead.
//!
//! Per-flight processing is independent; one failure never blocks the
//! remaining flights.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::clock::SharedClock;
use crate::diversion::DiversionStrategy;
use crate::events::{Event, EventKind};
use crate::metrics::CascadeMetrics;
use crate::registry::Registry;
use crate::types::{Flight, Severity};

/// Departure pushback applied to every impeded flight
const IMPEDIMENT_PUSHBACK_HOURS: i64 = 2;

/// Disruption window tested against flight schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactWindow {
    /// When the disruption begins
    pub start: DateTime<Utc>,
    /// When the disruption ends
    pub end: DateTime<Utc>,
}

impl ImpactWindow {
    /// Window starting at `start`, lasting `duration_minutes`
    pub fn new(start: DateTime<Utc>, duration_minutes: i64) -> Self {
        Self {
            start,
            end: start + Duration::minutes(duration_minutes),
        }
    }

    /// Whether a flight's schedule intersects this window
    ///
    /// A flight overlaps iff it departs before the window ends and
    /// arrives after it starts. Flights entirely before or entirely
    /// after the window never match.
    pub fn overlaps(&self, flight: &Flight) -> bool {
        flight.departure_time < self.end && flight.arrival_time > self.start
    }
}

/// Per-flight result of one impact evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpactOutcome {
    /// Departure pushed back; the new time is carried by the event
    Impeded {
        flight_id: String,
        new_departure_time: DateTime<Utc>,
    },
    /// Destination substituted mid-flight
    Redirected {
        flight_id: String,
        original_destination: String,
        new_destination: String,
    },
    /// Diversion wanted but no alternative airport exists
    NoAlternative { flight_id: String },
}

/// Translates disruptions into flight consequences
pub struct ImpactEvaluator {
    registry: Arc<Registry>,
    clock: SharedClock,
    strategy: Arc<dyn DiversionStrategy>,
    metrics: Option<Arc<CascadeMetrics>>,
}

impl ImpactEvaluator {
    /// Create an evaluator over a registry
    pub fn new(
        registry: Arc<Registry>,
        clock: SharedClock,
        strategy: Arc<dyn DiversionStrategy>,
    ) -> Self {
        Self {
            registry,
            clock,
            strategy,
            metrics: None,
        }
    }

    /// Record disruption metrics
    pub fn with_metrics(mut self, metrics: Arc<CascadeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe this evaluator to weather impacts on the bus
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> SubscriptionId {
        let evaluator = Arc::clone(self);
        bus.subscribe_fn(
            EventKind::WeatherImpactDetected,
            "impact-evaluator",
            move |bus, event| {
                if let Event::WeatherImpactDetected {
                    airport_code,
                    impact_type,
                    severity,
                    duration_minutes,
                    is_catastrophe,
                    timestamp,
                } = event
                {
                    evaluator.handle_weather_impact(bus, airport_code, impact_type, *severity);
                    evaluator.check_impeded_flights(
                        bus,
                        airport_code,
                        impact_type,
                        *duration_minutes,
                        *timestamp,
                        *is_catastrophe,
                    );
                }
                Ok(())
            },
        )
    }

    /// Airport-wide friction path
    ///
    /// Emits one `OperationalDelayDetected` with a synthetic id when
    /// the severity maps to a non-zero delay. Independent of the
    /// flights actually touching the airport.
    pub fn handle_weather_impact(
        &self,
        bus: &EventBus,
        airport_code: &str,
        impact_type: &str,
        severity: Severity,
    ) {
        let delay_minutes = severity_delay_minutes(severity);
        if delay_minutes == 0 {
            debug!(
                airport = %airport_code,
                severity = %severity,
                "no operational delay for severity"
            );
            return;
        }

        let now = self.clock.now();
        let flight_id = format!("FLIGHT-{}-{}", airport_code, now.timestamp_millis());
        info!(
            airport = %airport_code,
            delay_minutes,
            id = %flight_id,
            "operational delay detected"
        );
        bus.publish(Event::OperationalDelayDetected {
            flight_id,
            delay_minutes,
            reason: format!("Weather impact: {}", impact_type),
            timestamp: now,
        });
    }

    /// Per-flight consequence path
    ///
    /// Walks every flight touching the airport, tests the impact
    /// window, and impedes or diverts each overlapping flight. Returns
    /// one outcome per affected flight, including diversions that
    /// found no alternative airport.
    pub fn check_impeded_flights(
        &self,
        bus: &EventBus,
        airport_code: &str,
        impact_type: &str,
        duration_minutes: i64,
        impact_timestamp: DateTime<Utc>,
        is_catastrophe: bool,
    ) -> Vec<ImpactOutcome> {
        let window = ImpactWindow::new(impact_timestamp, duration_minutes);
        let now = self.clock.now();
        let mut outcomes = Vec::new();

        for flight in self.registry.flights_for_airport(airport_code) {
            if !window.overlaps(&flight) {
                continue;
            }

            if is_catastrophe && flight.is_active(now) && flight.destination == airport_code {
                if let Some(outcome) = self.redirect_flight(bus, &flight, airport_code, impact_type)
                {
                    outcomes.push(outcome);
                }
            } else if let Some(outcome) = self.impede_flight(bus, &flight, airport_code, impact_type)
            {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn impede_flight(
        &self,
        bus: &EventBus,
        flight: &Flight,
        airport_code: &str,
        impact_type: &str,
    ) -> Option<ImpactOutcome> {
        let new_departure_time = flight.departure_time + Duration::hours(IMPEDIMENT_PUSHBACK_HOURS);
        if let Err(err) = self.registry.mark_impeded(&flight.id) {
            warn!(flight_id = %flight.id, error = %err, "could not mark flight impeded");
            return None;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_flight_impeded();
        }
        info!(
            flight_id = %flight.id,
            airport = %airport_code,
            new_departure = %new_departure_time,
            "flight impeded"
        );
        bus.publish(Event::FlightImpeded {
            flight_id: flight.id.clone(),
            reason: format!("Weather impact: {} at {}", impact_type, airport_code),
            new_departure_time,
            timestamp: self.clock.now(),
        });
        Some(ImpactOutcome::Impeded {
            flight_id: flight.id.clone(),
            new_departure_time,
        })
    }

    fn redirect_flight(
        &self,
        bus: &EventBus,
        flight: &Flight,
        affected_airport: &str,
        impact_type: &str,
    ) -> Option<ImpactOutcome> {
        let airports = self.registry.airports();
        let alternative = match self.strategy.select_alternative(affected_airport, &airports) {
            Some(alternative) => alternative.clone(),
            None => {
                warn!(
                    flight_id = %flight.id,
                    airport = %affected_airport,
                    impact = %impact_type,
                    strategy = %self.strategy.name(),
                    "no alternative airport found for diversion"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_diversion_failure();
                }
                return Some(ImpactOutcome::NoAlternative {
                    flight_id: flight.id.clone(),
                });
            }
        };

        // Event first, then the record mutation; the event is the only
        // place the original destination survives.
        bus.publish(Event::FlightRedirected {
            flight_id: flight.id.clone(),
            original_destination: flight.destination.clone(),
            new_destination: alternative.code.clone(),
            reason: format!(
                "Catastrophic {} at {} - redirected to {}",
                impact_type, affected_airport, alternative.code
            ),
            timestamp: self.clock.now(),
        });

        let stored_reason = format!("Catastrophic {} at {}", impact_type, affected_airport);
        if let Err(err) = self
            .registry
            .apply_diversion(&flight.id, &alternative.code, stored_reason)
        {
            warn!(flight_id = %flight.id, error = %err, "could not apply diversion");
            return None;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_flight_redirected();
        }
        info!(
            flight_id = %flight.id,
            from = %flight.destination,
            to = %alternative.code,
            "flight redirected"
        );
        Some(ImpactOutcome::Redirected {
            flight_id: flight.id.clone(),
            original_destination: flight.destination.clone(),
            new_destination: alternative.code,
        })
    }
}

fn severity_delay_minutes(severity: Severity) -> i64 {
    match severity {
        Severity::High => 60,
        Severity::Medium => 30,
        Severity::Low | Severity::Catastrophic => 0,
    }
}
