//! HTTP Control Plane
//!
//! Run with: cargo run --example serve
//! Then: curl localhost:3000/health

use aero_cascade::CascadeBuilder;

#[tokio::main]
async fn main() -> aero_cascade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let engine = CascadeBuilder::new()
        .with_http_addr("0.0.0.0:3000")?
        .build()?;

    engine.run().await
}
