// ============================================================================
// RPS ESCROW - WAGERING ESCROW SERVICE
// ============================================================================
//
// Players deposit into escrow, the arbiter resolves matches, winners
// withdraw. The ledger is the sole mutator of monetary state; every HTTP
// operation runs as one critical section against it.
//
// Run:  RPS_ARBITER_PUBKEY=<hex> cargo run
// Test: curl http://localhost:8080/health

use std::sync::Arc;

use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rps_escrow::auth;
use rps_escrow::config::Config;
use rps_escrow::escrow::ledger::EscrowLedger;
use rps_escrow::events::TracingSink;
use rps_escrow::routes::{router, AppState};
use rps_escrow::transfer::InMemoryTreasury;

// ============================================================================
// GRACEFUL SHUTDOWN
// ============================================================================

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("shutdown signal received");
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() {
    // ========================================================================
    // 1. INITIALIZE LOGGING
    // ========================================================================
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rps_escrow=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .init();

    // ========================================================================
    // 2. LOAD CONFIGURATION
    // ========================================================================
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let arbiter = match auth::derive_address(&config.arbiter_pubkey) {
        Ok(address) => address,
        Err(err) => {
            error!("invalid RPS_ARBITER_PUBKEY: {err}");
            std::process::exit(1);
        }
    };

    info!("rps-escrow starting");
    info!("  arbiter:     {arbiter}");
    info!("  minimum bet: {} units", config.minimum_bet);

    // ========================================================================
    // 3. BUILD THE LEDGER
    // ========================================================================
    let treasury = Arc::new(InMemoryTreasury::new());
    let ledger = EscrowLedger::new(
        arbiter,
        config.minimum_bet,
        treasury,
        Arc::new(TracingSink),
    )
    .into_shared();

    let state = AppState { ledger };

    // ========================================================================
    // 4. BUILD ROUTER & SERVE
    // ========================================================================
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!("listening on http://{}", config.bind_addr);
    info!("  GET  /health             - liveness");
    info!("  GET  /stats              - ledger totals");
    info!("  GET  /balance/:player    - escrow balance lookup");
    info!("  GET  /winnings/:player   - winnings lookup");
    info!("  POST /enroll             - deposit (player-signed)");
    info!("  POST /refund             - return deposit (player-signed)");
    info!("  POST /play               - resolve match (arbiter-signed)");
    info!("  POST /withdraw           - pay out winnings (player-signed)");

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server error: {err}");
        std::process::exit(1);
    }

    info!("server shutdown complete");
}
