//! Authoritative in-memory store for airports and flights
//!
//! The registry owns the records and nothing else: it publishes no
//! events (creation events are raised by the engine operations) and
//! keeps no global state. Listings are returned sorted by key so
//! iteration order is deterministic over the sharded maps; the
//! diversion policy depends on that.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::{CascadeError, Result};
use crate::types::{Airport, AirportSpec, Flight, FlightSpec};

/// Outcome of a flight registration
///
/// Creation never fails on unresolved airport references; the codes
/// that could not be attached are reported here so the caller can warn
/// without scraping logs.
#[derive(Debug, Clone)]
pub struct FlightCreation {
    /// The stored flight record
    pub flight: Flight,
    /// Airport codes referenced by the flight but not registered
    pub missing_airports: Vec<String>,
}

/// In-memory airport/flight store
pub struct Registry {
    airports: DashMap<String, Airport>,
    flights: DashMap<String, Flight>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            airports: DashMap::new(),
            flights: DashMap::new(),
        }
    }

    /// Insert a new airport
    ///
    /// Fails with `Conflict` if the code is already registered.
    pub fn create_airport(&self, spec: AirportSpec) -> Result<Airport> {
        match self.airports.entry(spec.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CascadeError::conflict(format!(
                "airport {} already exists",
                spec.code
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let airport = spec.into_airport();
                entry.insert(airport.clone());
                debug!(code = %airport.code, "airport registered");
                Ok(airport)
            }
        }
    }

    /// Insert a flight
    ///
    /// Inserts unconditionally; a duplicate id replaces the previous
    /// record. Referenced airports that exist get the flight id
    /// attached to their derived lists; missing ones are reported in
    /// the outcome instead of failing creation.
    pub fn create_flight(&self, spec: FlightSpec) -> FlightCreation {
        let flight = spec.into_flight();
        self.flights.insert(flight.id.clone(), flight.clone());

        let mut missing_airports = Vec::new();
        for code in [&flight.departure_point, &flight.destination] {
            match self.airports.get_mut(code.as_str()) {
                Some(mut airport) => {
                    if !airport.flights.contains(&flight.id) {
                        airport.flights.push(flight.id.clone());
                    }
                }
                None => missing_airports.push(code.clone()),
            }
        }

        debug!(
            id = %flight.id,
            departure = %flight.departure_point,
            destination = %flight.destination,
            missing = missing_airports.len(),
            "flight registered"
        );
        FlightCreation {
            flight,
            missing_airports,
        }
    }

    /// Re-insert a record loaded from persistence, flags and all
    pub fn restore_airport(&self, airport: Airport) {
        self.airports.insert(airport.code.clone(), airport);
    }

    /// Re-insert a record loaded from persistence, flags and all
    ///
    /// Re-attaches the flight id to the derived lists of airports that
    /// are already present, so callers should restore airports first.
    /// Persisted airport lists may lag per-record writes; this heals
    /// them on load.
    pub fn restore_flight(&self, flight: Flight) {
        for code in [&flight.departure_point, &flight.destination] {
            if let Some(mut airport) = self.airports.get_mut(code.as_str()) {
                if !airport.flights.contains(&flight.id) {
                    airport.flights.push(flight.id.clone());
                }
            }
        }
        self.flights.insert(flight.id.clone(), flight);
    }

    /// Look up one airport
    pub fn airport(&self, code: &str) -> Option<Airport> {
        self.airports.get(code).map(|a| a.clone())
    }

    /// All airports, sorted by code
    pub fn airports(&self) -> Vec<Airport> {
        let mut airports: Vec<Airport> = self.airports.iter().map(|a| a.clone()).collect();
        airports.sort_by(|a, b| a.code.cmp(&b.code));
        airports
    }

    /// Look up one flight
    pub fn flight(&self, id: &str) -> Option<Flight> {
        self.flights.get(id).map(|f| f.clone())
    }

    /// All flights, sorted by id
    pub fn flights(&self) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self.flights.iter().map(|f| f.clone()).collect();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        flights
    }

    /// Flights departing from or arriving at an airport, sorted by id
    ///
    /// Scans the flight table rather than trusting the airport's
    /// derived list, so it also finds flights whose airports were
    /// unregistered at creation time.
    pub fn flights_for_airport(&self, code: &str) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self
            .flights
            .iter()
            .filter(|f| f.touches(code))
            .map(|f| f.clone())
            .collect();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        flights
    }

    /// Flights with the impeded overlay set
    pub fn impeded_flights(&self) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self
            .flights
            .iter()
            .filter(|f| f.impeded)
            .map(|f| f.clone())
            .collect();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        flights
    }

    /// Flights with the redirected overlay set
    pub fn redirected_flights(&self) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self
            .flights
            .iter()
            .filter(|f| f.redirected)
            .map(|f| f.clone())
            .collect();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        flights
    }

    /// Flights airborne at `now`
    pub fn active_flights(&self, now: DateTime<Utc>) -> Vec<Flight> {
        let mut flights: Vec<Flight> = self
            .flights
            .iter()
            .filter(|f| f.is_active(now))
            .map(|f| f.clone())
            .collect();
        flights.sort_by(|a, b| a.id.cmp(&b.id));
        flights
    }

    /// Set the impeded overlay on a flight
    pub fn mark_impeded(&self, id: &str) -> Result<Flight> {
        match self.flights.get_mut(id) {
            Some(mut flight) => {
                flight.impeded = true;
                Ok(flight.clone())
            }
            None => Err(CascadeError::not_found(format!("flight {} not found", id))),
        }
    }

    /// Rewrite a flight's destination after a diversion
    ///
    /// Sets the redirected overlay and records the stored reason. The
    /// original destination is not retained here; it survives in the
    /// emitted event.
    pub fn apply_diversion(
        &self,
        id: &str,
        new_destination: &str,
        reason: impl Into<String>,
    ) -> Result<Flight> {
        match self.flights.get_mut(id) {
            Some(mut flight) => {
                flight.destination = new_destination.to_string();
                flight.redirected = true;
                flight.redirection_reason = Some(reason.into());
                Ok(flight.clone())
            }
            None => Err(CascadeError::not_found(format!("flight {} not found", id))),
        }
    }

    /// Number of registered airports
    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }

    /// Number of registered flights
    pub fn flight_count(&self) -> usize {
        self.flights.len()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("airports", &self.airports.len())
            .field("flights", &self.flights.len())
            .finish()
    }
}
