//! Event Dispatch Benchmarks
//!
//! Benchmarks covering:
//! - Publish throughput against growing subscriber fan-out
//! - Full disruption cascades over populated registries
//! - Subscription churn
//! - Notification history retention under eviction pressure

use aero_cascade::bus::EventBus;
use aero_cascade::clock::{SharedClock, SystemClock};
use aero_cascade::diversion::FirstAvailableStrategy;
use aero_cascade::evaluator::ImpactEvaluator;
use aero_cascade::events::{Event, EventKind};
use aero_cascade::notify::{NotificationOrchestrator, NotificationStore};
use aero_cascade::registry::Registry;
use aero_cascade::types::{AirportSpec, FlightSpec, RecipientRole, Severity};
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Instant;

/// Build a registry with N airports and M flights between them
fn seed_registry(airport_count: usize, flight_count: usize) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());

    for i in 0..airport_count {
        registry
            .create_airport(AirportSpec::new(
                format!("AP{:03}", i),
                format!("Airport {}", i),
                "Benchville",
                "Benchland",
            ))
            .unwrap();
    }

    let now = Utc::now();
    for i in 0..flight_count {
        registry.create_flight(FlightSpec::new(
            format!("FL{:04}", i),
            format!("AP{:03}", i % airport_count),
            format!("AP{:03}", (i + 1) % airport_count),
            now + Duration::minutes(30),
            now + Duration::hours(3),
            "BenchAir",
        ));
    }

    registry
}

/// Wire the full evaluation and notification chain onto a fresh bus
fn build_disruption_stage(airport_count: usize, flight_count: usize) -> Arc<EventBus> {
    let bus = Arc::new(EventBus::new());
    let registry = seed_registry(airport_count, flight_count);
    let clock: SharedClock = Arc::new(SystemClock);

    let evaluator = Arc::new(ImpactEvaluator::new(
        Arc::clone(&registry),
        Arc::clone(&clock),
        Arc::new(FirstAvailableStrategy),
    ));
    evaluator.attach(&bus);

    let orchestrator = Arc::new(NotificationOrchestrator::new(Arc::clone(&clock)));
    orchestrator.attach(&bus);

    let store = Arc::new(NotificationStore::new());
    store.attach(&bus);

    bus
}

fn delay_event() -> Event {
    Event::OperationalDelayDetected {
        flight_id: "FL0000".to_string(),
        delay_minutes: 30,
        reason: "Weather impact: storm".to_string(),
        timestamp: Utc::now(),
    }
}

/// Benchmark publish throughput against subscriber fan-out
fn bench_publish_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_throughput");

    for sub_count in [1, 8, 64, 256].iter() {
        group.bench_with_input(
            BenchmarkId::new("no_op_subscribers", sub_count),
            sub_count,
            |b, &sub_count| {
                let bus = EventBus::new();
                for i in 0..sub_count {
                    bus.subscribe_fn(
                        EventKind::OperationalDelayDetected,
                        format!("bench-{}", i),
                        |_, event| {
                            black_box(event.kind());
                            Ok(())
                        },
                    );
                }

                b.iter(|| {
                    for _ in 0..100 {
                        black_box(bus.publish(delay_event()));
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark end-to-end disruption cascades
fn bench_disruption_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("disruption_cascade");
    group.sample_size(10); // Fewer samples for longer benchmarks

    for flight_count in [100, 1000, 5000].iter() {
        group.bench_with_input(
            BenchmarkId::new("medium_storm", flight_count),
            flight_count,
            |b, &flight_count| {
                b.iter_custom(|iters| {
                    let mut total_duration = std::time::Duration::ZERO;

                    for _ in 0..iters {
                        // Fresh stage per iteration, flights mutate as
                        // they are impeded.
                        let bus = build_disruption_stage(10, flight_count);

                        let start = Instant::now();
                        let handled = bus.publish(Event::WeatherImpactDetected {
                            airport_code: "AP000".to_string(),
                            impact_type: "storm".to_string(),
                            severity: Severity::Medium,
                            duration_minutes: 120,
                            is_catastrophe: false,
                            timestamp: Utc::now(),
                        });
                        total_duration += start.elapsed();

                        black_box(handled);
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Benchmark subscribe/unsubscribe churn
fn bench_subscription_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription_churn");

    group.bench_function("subscribe_unsubscribe", |b| {
        let bus = EventBus::new();

        b.iter(|| {
            let id = bus.subscribe_fn(EventKind::FlightImpeded, "churn", |_, _| Ok(()));
            black_box(bus.unsubscribe(id));
        });
    });

    group.finish();
}

/// Benchmark history retention with eviction pressure
fn bench_notification_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification_history");

    group.bench_function("record_past_capacity", |b| {
        let store = NotificationStore::with_capacity(100);
        let now = Utc::now();

        b.iter(|| {
            for i in 0..1000 {
                black_box(store.record(
                    RecipientRole::Company,
                    format!("Flight FL{:04} delayed by 30 minutes due to snow", i),
                    now,
                ));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_publish_throughput,
    bench_disruption_cascade,
    bench_subscription_churn,
    bench_notification_history,
);

criterion_main!(benches);
