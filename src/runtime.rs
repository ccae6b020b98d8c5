//! Cascade runtime and HTTP surface
//!
//! ## Table of Contents
//! - **Cascade**: Main runtime struct
//! - **RuntimeState**: Lifecycle states

use crate::builder::CascadeConfig;
use crate::bus::EventBus;
use crate::clock::SharedClock;
use crate::diversion::DiversionStrategy;
use crate::error::{CascadeError, Result};
use crate::evaluator::ImpactEvaluator;
use crate::events::Event;
use crate::metrics::CascadeMetrics;
use crate::networking::{ErrorResponse, HttpServer, HttpState};
use crate::notify::{
    NotificationGateway, NotificationOrchestrator, NotificationStore, NotificationStream,
    StoredNotification,
};
use crate::registry::Registry;
use crate::storage::{keys, store_get_json, store_set_json, BoxedStateStore};
use crate::types::{
    Airport, AirportSpec, Flight, FlightSpec, NotificationKind, RecipientRole,
    WeatherImpactRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running normally
    Running,
    /// Shutting down
    ShuttingDown,
}

/// Main cascade runtime
///
/// Owns the bus, the registry, and the notification pipeline, and
/// exposes the registration, trigger, and query operations. The
/// evaluator and orchestrator are held by their bus subscriptions.
pub struct Cascade {
    config: CascadeConfig,
    state: Arc<RwLock<RuntimeState>>,
    start_time: Option<Instant>,

    // Core components
    bus: Arc<EventBus>,
    registry: Arc<Registry>,
    notifications: Arc<NotificationStore>,
    gateway: Arc<NotificationGateway>,
    store: BoxedStateStore,
    clock: SharedClock,
    metrics: Option<Arc<CascadeMetrics>>,

    // Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl Cascade {
    /// Create a new engine instance (use CascadeBuilder instead)
    pub(crate) fn new(
        config: CascadeConfig,
        store: BoxedStateStore,
        clock: SharedClock,
        strategy: Arc<dyn DiversionStrategy>,
        metrics: Option<Arc<CascadeMetrics>>,
    ) -> Self {
        let bus = match &metrics {
            Some(m) => Arc::new(EventBus::with_metrics(Arc::clone(m))),
            None => Arc::new(EventBus::new()),
        };
        let registry = Arc::new(Registry::new());

        let mut evaluator =
            ImpactEvaluator::new(Arc::clone(&registry), Arc::clone(&clock), strategy);
        if let Some(m) = &metrics {
            evaluator = evaluator.with_metrics(Arc::clone(m));
        }
        Arc::new(evaluator).attach(&bus);

        let mut orchestrator = NotificationOrchestrator::new(Arc::clone(&clock));
        if let Some(m) = &metrics {
            orchestrator = orchestrator.with_metrics(Arc::clone(m));
        }
        Arc::new(orchestrator).attach(&bus);

        // History before gateway so the record exists for live readers.
        let mut notifications = NotificationStore::with_capacity(config.history_capacity);
        if let Some(m) = &metrics {
            notifications = notifications.with_metrics(Arc::clone(m));
        }
        let notifications = Arc::new(notifications);
        notifications.attach(&bus);

        let gateway = Arc::new(NotificationGateway::with_capacity(
            Arc::clone(&clock),
            config.push_capacity,
        ));
        gateway.attach(&bus);

        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: Arc::new(RwLock::new(RuntimeState::Stopped)),
            start_time: None,
            bus,
            registry,
            notifications,
            gateway,
            store,
            clock,
            metrics,
            shutdown_tx,
        }
    }

    /// Get current runtime state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Get metrics instance
    pub fn metrics(&self) -> Option<&Arc<CascadeMetrics>> {
        self.metrics.as_ref()
    }

    /// Get the state store
    pub fn store(&self) -> &BoxedStateStore {
        &self.store
    }

    /// Get the event bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Run the engine with its HTTP surface
    pub async fn run(mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Starting;
        }

        info!(
            node_name = %self.config.node_name,
            "Starting cascade engine"
        );

        self.start_time = Some(Instant::now());

        // Load existing state from store
        self.load_state().await?;

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Running;
        }

        info!("Cascade engine running");

        // HTTP handlers reach the live engine through this Arc
        let engine = Arc::new(self);
        let http_router = engine.build_http_router();

        // Start HTTP server
        let http_server =
            HttpServer::new(engine.config.http_config.clone()).with_router(http_router);

        // Run until shutdown
        let mut shutdown_rx = engine.shutdown_tx.subscribe();

        tokio::select! {
            result = http_server.serve() => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server error");
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received");
            }
        }

        engine.shutdown().await?;

        Ok(())
    }

    /// Shutdown the engine
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == RuntimeState::Stopped {
                return Ok(());
            }
            *state = RuntimeState::ShuttingDown;
        }

        info!("Shutting down cascade engine");

        // Save state
        self.save_state().await?;

        // Send shutdown signal
        let _ = self.shutdown_tx.send(());

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Stopped;
        }

        info!("Cascade engine stopped");
        Ok(())
    }

    /// Signal shutdown
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Subscribe to shutdown signal
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    // State management

    /// Load registry contents and notification history from the store
    ///
    /// Public so embedders that never call [`Cascade::run`] can still
    /// resume from a previous process.
    pub async fn load_state(&self) -> Result<()> {
        let airport_keys = self.store.list_prefix(keys::AIRPORTS).await?;
        for key in airport_keys {
            if let Some(airport) = store_get_json::<Airport>(self.store.as_ref(), &key).await? {
                self.registry.restore_airport(airport);
            }
        }

        let flight_keys = self.store.list_prefix(keys::FLIGHTS).await?;
        for key in flight_keys {
            if let Some(flight) = store_get_json::<Flight>(self.store.as_ref(), &key).await? {
                self.registry.restore_flight(flight);
            }
        }

        if let Some(stored) =
            store_get_json::<Vec<StoredNotification>>(self.store.as_ref(), keys::NOTIFICATIONS)
                .await?
        {
            self.notifications.restore(stored);
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_registry_sizes(self.registry.airport_count(), self.registry.flight_count());
            metrics.set_notification_history(self.notifications.len());
        }

        info!(
            airports = self.registry.airport_count(),
            flights = self.registry.flight_count(),
            notifications = self.notifications.len(),
            "Loaded state from store"
        );
        Ok(())
    }

    /// Save registry contents and notification history to the store
    pub async fn save_state(&self) -> Result<()> {
        for airport in self.registry.airports() {
            let key = keys::airport(&airport.code);
            store_set_json(self.store.as_ref(), &key, &airport).await?;
        }

        for flight in self.registry.flights() {
            let key = keys::flight(&flight.id);
            store_set_json(self.store.as_ref(), &key, &flight).await?;
        }

        store_set_json(
            self.store.as_ref(),
            keys::NOTIFICATIONS,
            &self.notifications.all(),
        )
        .await?;
        self.store.flush().await?;

        info!(
            airports = self.registry.airport_count(),
            flights = self.registry.flight_count(),
            "Saved state to store"
        );
        Ok(())
    }

    // Registration

    /// Register an airport
    pub async fn register_airport(&self, spec: AirportSpec) -> Result<Airport> {
        let airport = self.registry.create_airport(spec)?;

        self.bus.publish(Event::AirportCreated {
            airport: airport.clone(),
            timestamp: self.clock.now(),
        });

        // The record is already registered, so persistence failures
        // only lose durability, not the airport.
        let key = keys::airport(&airport.code);
        if let Err(e) = store_set_json(self.store.as_ref(), &key, &airport).await {
            warn!(code = %airport.code, error = %e, "Failed to persist airport");
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_registry_sizes(self.registry.airport_count(), self.registry.flight_count());
        }

        info!(code = %airport.code, "Airport registered");
        Ok(airport)
    }

    /// Register a flight
    ///
    /// Unknown endpoint airports are allowed and logged, matching the
    /// registry's open referencing.
    pub async fn register_flight(&self, spec: FlightSpec) -> Result<Flight> {
        spec.validate()?;

        let creation = self.registry.create_flight(spec);
        for code in &creation.missing_airports {
            warn!(
                flight = %creation.flight.id,
                airport = %code,
                "Flight references unregistered airport"
            );
        }
        let flight = creation.flight;

        self.bus.publish(Event::FlightCreated {
            flight: flight.clone(),
            timestamp: self.clock.now(),
        });

        let key = keys::flight(&flight.id);
        if let Err(e) = store_set_json(self.store.as_ref(), &key, &flight).await {
            warn!(id = %flight.id, error = %e, "Failed to persist flight");
        }

        if let Some(metrics) = &self.metrics {
            metrics.set_registry_sizes(self.registry.airport_count(), self.registry.flight_count());
        }

        info!(id = %flight.id, "Flight registered");
        Ok(flight)
    }

    // Disruption trigger

    /// Publish a weather impact and run its consequences
    ///
    /// The whole cascade executes inside this call. Returns the number
    /// of subscribers that handled the impact event.
    pub async fn trigger_weather_impact(&self, request: WeatherImpactRequest) -> usize {
        let is_catastrophe = request.resolved_catastrophe();
        info!(
            airport = %request.airport_code,
            impact_type = %request.impact_type,
            severity = %request.severity,
            catastrophe = is_catastrophe,
            "Weather impact triggered"
        );

        let handled = self.bus.publish(Event::WeatherImpactDetected {
            airport_code: request.airport_code,
            impact_type: request.impact_type,
            severity: request.severity,
            duration_minutes: request.duration_minutes,
            is_catastrophe,
            timestamp: self.clock.now(),
        });

        if let Err(e) = self.save_state().await {
            warn!(error = %e, "Failed to save state after weather impact");
        }

        handled
    }

    // Queries

    /// List airports, code-sorted
    pub fn airports(&self) -> Vec<Airport> {
        self.registry.airports()
    }

    /// Get an airport by code
    pub fn airport(&self, code: &str) -> Option<Airport> {
        self.registry.airport(code)
    }

    /// List flights, id-sorted
    pub fn flights(&self) -> Vec<Flight> {
        self.registry.flights()
    }

    /// Get a flight by id
    pub fn flight(&self, id: &str) -> Option<Flight> {
        self.registry.flight(id)
    }

    /// List flights departing from or arriving at an airport
    pub fn flights_for_airport(&self, code: &str) -> Vec<Flight> {
        self.registry.flights_for_airport(code)
    }

    /// List impeded flights
    pub fn impeded_flights(&self) -> Vec<Flight> {
        self.registry.impeded_flights()
    }

    /// List redirected flights
    pub fn redirected_flights(&self) -> Vec<Flight> {
        self.registry.redirected_flights()
    }

    /// List flights currently in the air
    pub fn active_flights(&self) -> Vec<Flight> {
        self.registry.active_flights(self.clock.now())
    }

    /// Notification history, newest first
    pub fn notifications(&self) -> Vec<StoredNotification> {
        self.notifications.all()
    }

    /// Notification history filtered by derived category
    pub fn notifications_by_kind(&self, kind: NotificationKind) -> Vec<StoredNotification> {
        self.notifications.by_kind(kind)
    }

    /// Notification history filtered by recipient role
    pub fn notifications_by_recipient(&self, recipient: RecipientRole) -> Vec<StoredNotification> {
        self.notifications.by_recipient(recipient)
    }

    /// Subscribe to live notification pushes
    pub fn subscribe_notifications(&self) -> NotificationStream {
        self.gateway.subscribe()
    }

    // HTTP router

    /// Build the HTTP router over this engine
    pub fn build_http_router(self: &Arc<Self>) -> Router {
        let state = HttpState {
            app: Arc::new(RwLock::new(CascadeHttpState {
                engine: Arc::clone(self),
            })),
        };

        Router::new()
            .route("/airports", get(list_airports_handler))
            .route("/airports", post(create_airport_handler))
            .route("/airports/:code", get(get_airport_handler))
            .route("/airports/:code/flights", get(airport_flights_handler))
            .route("/flights", get(list_flights_handler))
            .route("/flights", post(create_flight_handler))
            .route("/flights/impeded", get(impeded_flights_handler))
            .route("/flights/redirected", get(redirected_flights_handler))
            .route("/flights/active", get(active_flights_handler))
            .route("/flights/:id", get(get_flight_handler))
            .route("/simulate-weather-impact", post(simulate_weather_handler))
            .route("/notifications", get(list_notifications_handler))
            .route("/notifications/by-type", get(notifications_by_type_handler))
            .route(
                "/notifications/by-recipient",
                get(notifications_by_recipient_handler),
            )
            .route("/events/status", get(events_status_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }
}

// HTTP state for handlers
struct CascadeHttpState {
    engine: Arc<Cascade>,
}

fn error_response(err: CascadeError) -> ErrorResponse {
    let status = match &err {
        CascadeError::Conflict(_) => StatusCode::CONFLICT,
        CascadeError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
        CascadeError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ErrorResponse::new(status, err.to_string())
}

#[derive(Debug, Deserialize)]
struct ByTypeQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ByRecipientQuery {
    recipient: Option<String>,
}

// HTTP handlers

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn ready_handler() -> StatusCode {
    StatusCode::OK
}

async fn create_airport_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Json(spec): Json<AirportSpec>,
) -> std::result::Result<Json<serde_json::Value>, ErrorResponse> {
    let app = state.app.read().await;
    let airport = app
        .engine
        .register_airport(spec)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({
        "message": "Airport created successfully",
        "airport": airport
    })))
}

async fn list_airports_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "airports": app.engine.airports() }))
}

async fn get_airport_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Path(code): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, ErrorResponse> {
    let app = state.app.read().await;
    match app.engine.airport(&code) {
        Some(airport) => Ok(Json(serde_json::json!({ "airport": airport }))),
        None => Err(ErrorResponse::not_found("Airport not found")),
    }
}

async fn airport_flights_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Path(code): Path<String>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "flights": app.engine.flights_for_airport(&code) }))
}

async fn create_flight_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Json(spec): Json<FlightSpec>,
) -> std::result::Result<Json<serde_json::Value>, ErrorResponse> {
    let app = state.app.read().await;
    let flight = app
        .engine
        .register_flight(spec)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({
        "message": "Flight created successfully",
        "flight": flight
    })))
}

async fn list_flights_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "flights": app.engine.flights() }))
}

async fn impeded_flights_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "flights": app.engine.impeded_flights() }))
}

async fn redirected_flights_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "flights": app.engine.redirected_flights() }))
}

async fn active_flights_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "flights": app.engine.active_flights() }))
}

async fn get_flight_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Path(id): Path<String>,
) -> std::result::Result<Json<serde_json::Value>, ErrorResponse> {
    let app = state.app.read().await;
    match app.engine.flight(&id) {
        Some(flight) => Ok(Json(serde_json::json!({ "flight": flight }))),
        None => Err(ErrorResponse::not_found("Flight not found")),
    }
}

async fn simulate_weather_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Json(request): Json<WeatherImpactRequest>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    app.engine.trigger_weather_impact(request).await;
    Json(serde_json::json!({ "message": "Weather impact simulated" }))
}

async fn list_notifications_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({ "notifications": app.engine.notifications() }))
}

async fn notifications_by_type_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Query(query): Query<ByTypeQuery>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    // Unknown or missing categories filter to nothing rather than error.
    let notifications = match query.kind.as_deref().and_then(NotificationKind::parse) {
        Some(kind) => app.engine.notifications_by_kind(kind),
        None => Vec::new(),
    };
    Json(serde_json::json!({ "notifications": notifications }))
}

async fn notifications_by_recipient_handler(
    State(state): State<HttpState<CascadeHttpState>>,
    Query(query): Query<ByRecipientQuery>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    let notifications = match query.recipient.as_deref().and_then(RecipientRole::parse) {
        Some(recipient) => app.engine.notifications_by_recipient(recipient),
        None => Vec::new(),
    };
    Json(serde_json::json!({ "notifications": notifications }))
}

async fn events_status_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> Json<serde_json::Value> {
    let app = state.app.read().await;
    Json(serde_json::json!({
        "message": "Events service is running",
        "timestamp": app.engine.clock.now()
    }))
}

async fn metrics_handler(
    State(state): State<HttpState<CascadeHttpState>>,
) -> std::result::Result<String, StatusCode> {
    let app = state.app.read().await;
    match app.engine.metrics() {
        Some(m) => m
            .gather_text()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR),
        None => Err(StatusCode::NOT_FOUND),
    }
}
