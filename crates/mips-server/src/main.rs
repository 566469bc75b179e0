//! mips-checkout HTTP Server
//!
//! Axum host for the MIPS off-site checkout: creates checkout sessions and
//! receives the processor's returns. Orders and payment records live in the
//! calling shop; nothing is persisted here.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mips_gateway::{CorrelationSigner, EndpointResolver, GatewayConfiguration, MipsGateway, Url};

use crate::handlers::{create_checkout, health_check, payment_callback, payment_return};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An unknown mode or a malformed endpoint is a configuration defect
    let gateway_config = GatewayConfiguration::from_env()?;
    let endpoints = EndpointResolver::from_env()?;

    let missing = gateway_config.missing_fields();
    if missing.is_empty() {
        tracing::info!(mode = %gateway_config.mode, "✓ MIPS configured");
    } else {
        tracing::warn!("⚠ MIPS credentials incomplete - checkout disabled");
        tracing::warn!("  Missing: {}", missing.join(", "));
    }

    let language = std::env::var("MIPS_LANGUAGE").unwrap_or_else(|_| "en".into());
    let mut gateway = MipsGateway::http(language).with_endpoints(endpoints);

    match std::env::var("MIPS_CORRELATION_SECRET") {
        Ok(secret) if !secret.is_empty() => {
            gateway = gateway.with_correlation(CorrelationSigner::new(secret.into_bytes()));
            tracing::info!("✓ Return URLs are signed");
        }
        _ => {
            tracing::warn!("⚠ MIPS_CORRELATION_SECRET not set - returns are matched by order id only");
        }
    }

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let public_base_url = Url::parse(
        &std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{addr}")),
    )?;
    anyhow::ensure!(
        !public_base_url.cannot_be_a_base(),
        "PUBLIC_BASE_URL must be an http(s) URL, got {public_base_url}"
    );

    // Build application state
    let state = AppState {
        provider: Arc::new(gateway),
        gateway_config: Arc::new(gateway_config),
        public_base_url,
    };

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 mips-checkout server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/checkout               - Create MIPS checkout session");
    tracing::info!("  GET  /payment/return/{{order_id}} - Browser return");
    tracing::info!("  POST /payment/return/{{order_id}} - Processor callback");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))

        // Checkout
        .route("/api/checkout", post(create_checkout))
        .route(
            "/payment/return/{order_id}",
            get(payment_return).post(payment_callback),
        )

        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
