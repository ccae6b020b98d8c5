//! Alternative-airport selection for catastrophic diversions
//!
//! Selection policy is a trait so smarter policies (distance, capacity,
//! weather en route) can be plugged in later. The default reproduces
//! the placeholder behavior: first airport in registry iteration order
//! whose code differs from the affected one, with no geospatial
//! reasoning.

use crate::types::Airport;

/// Strategy for choosing where a diverted flight should land
pub trait DiversionStrategy: Send + Sync {
    /// Pick an alternative to the affected airport
    ///
    /// `airports` is the registry listing, already in deterministic
    /// (code-sorted) order. Returning `None` means there is nowhere to
    /// divert to; the caller leaves the flight untouched.
    fn select_alternative<'a>(&self, affected: &str, airports: &'a [Airport])
        -> Option<&'a Airport>;

    /// Strategy name for logs
    fn name(&self) -> &str;
}

/// First airport whose code is not the affected one
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailableStrategy;

impl DiversionStrategy for FirstAvailableStrategy {
    fn select_alternative<'a>(
        &self,
        affected: &str,
        airports: &'a [Airport],
    ) -> Option<&'a Airport> {
        airports.iter().find(|airport| airport.code != affected)
    }

    fn name(&self) -> &str {
        "first-available"
    }
}
