//! # Aero Cascade
//!
//! An event-driven flight disruption engine. Weather impacts fan out
//! over an in-process event bus into operational delays, impeded
//! departures, emergency redirections, and per-role notifications.
//!
//! ## Features
//!
//! - **Event Bus**: Synchronous in-process dispatch with re-entrant publish
//! - **Impact Evaluation**: Severity-driven delays, impact-window overlap
//!   checks, catastrophe redirection with pluggable alternative selection
//! - **Notifications**: Role-addressed fan-out, bounded history, live push
//! - **HTTP API**: Axum surface over the registry and notification history
//! - **Persistence**: State snapshots to memory or file stores
//! - **Metrics**: Prometheus-compatible metrics export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aero_cascade::{AirportSpec, CascadeBuilder, FlightSpec, Severity, WeatherImpactRequest};
//! use chrono::{Duration, Utc};
//!
//! #[tokio::main]
//! async fn main() -> aero_cascade::Result<()> {
//!     let engine = CascadeBuilder::new().build()?;
//!
//!     engine
//!         .register_airport(AirportSpec::new("GRU", "Guarulhos", "Sao Paulo", "Brazil"))
//!         .await?;
//!     engine
//!         .register_airport(AirportSpec::new("VCP", "Viracopos", "Campinas", "Brazil"))
//!         .await?;
//!
//!     let now = Utc::now();
//!     engine
//!         .register_flight(FlightSpec::new(
//!             "FL100",
//!             "VCP",
//!             "GRU",
//!             now - Duration::hours(1),
//!             now + Duration::hours(2),
//!             "AirDemo",
//!         ))
//!         .await?;
//!
//!     engine
//!         .trigger_weather_impact(WeatherImpactRequest::new(
//!             "GRU",
//!             "earthquake",
//!             Severity::Catastrophic,
//!             120,
//!         ))
//!         .await;
//!
//!     for notification in engine.notifications() {
//!         println!("{}: {}", notification.recipient, notification.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Serving the HTTP API
//!
//! ```rust,no_run
//! use aero_cascade::CascadeBuilder;
//!
//! #[tokio::main]
//! async fn main() -> aero_cascade::Result<()> {
//!     let engine = CascadeBuilder::new()
//!         .with_http_addr("0.0.0.0:3000")?
//!         .build()?;
//!     engine.run().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod bus;
pub mod clock;
pub mod diversion;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod metrics;
pub mod networking;
pub mod notify;
pub mod registry;
pub mod runtime;
pub mod storage;
pub mod types;

// Re-exports for ergonomic API
pub use builder::{CascadeBuilder, CascadeConfig};
pub use bus::{EventBus, SubscriptionId};
pub use clock::{Clock, SharedClock, SystemClock};
#[cfg(any(test, feature = "test-helpers"))]
pub use clock::ManualClock;
pub use diversion::{DiversionStrategy, FirstAvailableStrategy};
pub use error::{CascadeError, Result};
pub use evaluator::{ImpactEvaluator, ImpactOutcome, ImpactWindow};
pub use events::{Event, EventKind};
pub use metrics::CascadeMetrics;
pub use networking::{HttpServer, HttpServerConfig};
pub use notify::{
    NotificationGateway, NotificationOrchestrator, NotificationStore, NotificationStream,
    PushUpdate, PushedNotification, StoredNotification,
};
pub use registry::Registry;
pub use runtime::{Cascade, RuntimeState};
pub use storage::{FileStore, MemoryStore, StateStore};
pub use types::{
    Airport, AirportSpec, Flight, FlightSpec, NotificationKind, RecipientRole, Severity,
    WeatherImpactRequest,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::CascadeBuilder;
    pub use crate::error::Result;
    pub use crate::events::{Event, EventKind};
    pub use crate::runtime::Cascade;
    pub use crate::types::{AirportSpec, FlightSpec, Severity, WeatherImpactRequest};
}
