//! Disruption Cascade Walkthrough
//!
//! Run with: cargo run --example simulate

use aero_cascade::{AirportSpec, Cascade, CascadeBuilder, FlightSpec, Severity, WeatherImpactRequest};
use chrono::{Duration, Utc};

#[tokio::main]
async fn main() -> aero_cascade::Result<()> {
    let engine = CascadeBuilder::new().with_metrics(false).build()?;

    println!("=== Seeding airports and flights ===");
    for (code, name, city) in [
        ("GRU", "Guarulhos International", "Sao Paulo"),
        ("SDU", "Santos Dumont", "Rio de Janeiro"),
        ("VCP", "Viracopos International", "Campinas"),
    ] {
        let airport = engine
            .register_airport(AirportSpec::new(code, name, city, "Brazil"))
            .await?;
        println!("airport {} ({})", airport.code, airport.name);
    }

    let now = Utc::now();
    engine
        .register_flight(FlightSpec::new(
            "AC-101",
            "SDU",
            "GRU",
            now - Duration::hours(1),
            now + Duration::hours(2),
            "AeroDemo",
        ))
        .await?;
    engine
        .register_flight(FlightSpec::new(
            "AC-202",
            "GRU",
            "SDU",
            now + Duration::hours(1),
            now + Duration::hours(3),
            "AeroDemo",
        ))
        .await?;
    engine
        .register_flight(FlightSpec::new(
            "AC-303",
            "VCP",
            "SDU",
            now + Duration::hours(5),
            now + Duration::hours(7),
            "AeroDemo",
        ))
        .await?;
    println!("3 flights scheduled");

    println!("\n=== Medium storm at GRU, 120 minutes ===");
    engine
        .trigger_weather_impact(WeatherImpactRequest::new(
            "GRU",
            "storm",
            Severity::Medium,
            120,
        ))
        .await;
    report(&engine);

    println!("\n=== Catastrophic earthquake at GRU, 180 minutes ===");
    engine
        .trigger_weather_impact(WeatherImpactRequest::new(
            "GRU",
            "earthquake",
            Severity::Catastrophic,
            180,
        ))
        .await;
    report(&engine);

    Ok(())
}

fn report(engine: &Cascade) {
    for flight in engine.impeded_flights() {
        println!("impeded    {}", flight.id);
    }
    for flight in engine.redirected_flights() {
        println!(
            "redirected {} -> {} ({})",
            flight.id,
            flight.destination,
            flight.redirection_reason.as_deref().unwrap_or("-")
        );
    }

    let notifications = engine.notifications();
    println!("{} notifications on record, newest first:", notifications.len());
    for n in notifications.iter().take(5) {
        println!("  [{}] {}: {}", n.kind.as_str(), n.recipient, n.message);
    }
}
