//! Hostel mess-hall management backend.
//!
//! Students register, get approved, request date-range mess plans, and check
//! in to meals with short-lived signed QR codes that staff scan. Admins run
//! approvals, reports, and exports.
//!
//! # Layout
//! - [`routes`] — HTTP handlers, grouped per role
//! - [`models`] — SQLite row types and queries
//! - [`qr`] / [`meal`] — the signed-token check-in flow and meal windows
//! - [`auth`] — login tokens and role extractors

use std::{net::SocketAddr, time::Duration};

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tokio::{
    net::TcpListener,
    signal::{ctrl_c, unix::SignalKind, unix::signal},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod meal;
pub mod models;
pub mod qr;
pub mod routes;
pub mod state;

use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let cors = match &state.config.frontend_url {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .expect("Invalid FRONTEND_URL!"),
        ),
        None => cors.allow_origin(Any),
    };

    let app = routes::api_router().layer(cors).with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
