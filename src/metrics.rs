//! Metrics and monitoring for the cascade engine
//!
//! ## Table of Contents
//! - **CascadeMetrics**: Central Prometheus registry and counters
//! - **Timer**: Operation duration helper for HTTP instrumentation

use crate::error::{CascadeError, Result};
use crate::events::EventKind;
use crate::types::RecipientRole;
use prometheus::{Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry};

/// Core metrics for the cascade engine
pub struct CascadeMetrics {
    registry: Registry,

    // Dispatch metrics
    pub events_published: CounterVec,
    pub handler_failures: CounterVec,

    // Disruption metrics
    pub flights_impeded: Counter,
    pub flights_redirected: Counter,
    pub diversion_failures: Counter,

    // Notification metrics
    pub notifications_sent: CounterVec,
    pub notification_history: Gauge,

    // Registry metrics
    pub airports_registered: Gauge,
    pub flights_registered: Gauge,

    // Network metrics
    pub requests_total: CounterVec,
    pub request_duration: HistogramVec,
}

impl CascadeMetrics {
    /// Create a new metrics instance
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        // Dispatch metrics
        let events_published = CounterVec::new(
            Opts::new("cascade_events_published_total", "Total events published"),
            &["kind"],
        )?;
        let handler_failures = CounterVec::new(
            Opts::new(
                "cascade_handler_failures_total",
                "Event handlers that returned an error or panicked",
            ),
            &["kind"],
        )?;

        // Disruption metrics
        let flights_impeded = Counter::new(
            "cascade_flights_impeded_total",
            "Flights whose departure was pushed back",
        )?;
        let flights_redirected = Counter::new(
            "cascade_flights_redirected_total",
            "Flights diverted to an alternative destination",
        )?;
        let diversion_failures = Counter::new(
            "cascade_diversion_failures_total",
            "Diversions abandoned because no alternative airport existed",
        )?;

        // Notification metrics
        let notifications_sent = CounterVec::new(
            Opts::new(
                "cascade_notifications_sent_total",
                "Notifications emitted per recipient role",
            ),
            &["recipient"],
        )?;
        let notification_history = Gauge::new(
            "cascade_notification_history",
            "Notifications currently retained in history",
        )?;

        // Registry metrics
        let airports_registered = Gauge::new("cascade_airports", "Registered airports")?;
        let flights_registered = Gauge::new("cascade_flights", "Registered flights")?;

        // Network metrics
        let requests_total = CounterVec::new(
            Opts::new("cascade_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "cascade_http_request_duration_seconds",
                "HTTP request duration",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path"],
        )?;

        // Register all metrics
        registry.register(Box::new(events_published.clone()))?;
        registry.register(Box::new(handler_failures.clone()))?;
        registry.register(Box::new(flights_impeded.clone()))?;
        registry.register(Box::new(flights_redirected.clone()))?;
        registry.register(Box::new(diversion_failures.clone()))?;
        registry.register(Box::new(notifications_sent.clone()))?;
        registry.register(Box::new(notification_history.clone()))?;
        registry.register(Box::new(airports_registered.clone()))?;
        registry.register(Box::new(flights_registered.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            events_published,
            handler_failures,
            flights_impeded,
            flights_redirected,
            diversion_failures,
            notifications_sent,
            notification_history,
            airports_registered,
            flights_registered,
            requests_total,
            request_duration,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a published event
    pub fn record_event_published(&self, kind: EventKind) {
        self.events_published
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Record a handler failure (error return or panic)
    pub fn record_handler_failure(&self, kind: EventKind) {
        self.handler_failures
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Record an impeded flight
    pub fn record_flight_impeded(&self) {
        self.flights_impeded.inc();
    }

    /// Record a redirected flight
    pub fn record_flight_redirected(&self) {
        self.flights_redirected.inc();
    }

    /// Record a diversion with no alternative airport
    pub fn record_diversion_failure(&self) {
        self.diversion_failures.inc();
    }

    /// Record a notification addressed to one recipient
    pub fn record_notification_sent(&self, recipient: RecipientRole) {
        self.notifications_sent
            .with_label_values(&[recipient.as_str()])
            .inc();
    }

    /// Update the retained-history gauge
    pub fn set_notification_history(&self, len: usize) {
        self.notification_history.set(len as f64);
    }

    /// Update registry population gauges
    pub fn set_registry_sizes(&self, airports: usize, flights: usize) {
        self.airports_registered.set(airports as f64);
        self.flights_registered.set(flights as f64);
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.request_duration
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Gather all metrics as text
    pub fn gather_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| CascadeError::metrics(format!("Encode error: {}", e)))?;
        String::from_utf8(buffer).map_err(|e| CascadeError::metrics(format!("UTF8 error: {}", e)))
    }
}

/// Timer for measuring operation duration
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Start a new timer
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Get elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop and return elapsed seconds
    pub fn stop(self) -> f64 {
        self.elapsed_secs()
    }
}
