//! # Dr.MiMi games backend
//!
//! Scoring pipeline of the Dr.MiMi medical-education platform: score
//! ingestion, per-game progress, multi-period leaderboards and achievement
//! evaluation, served as a JSON API over an embedded SQLite store.
//!
//!
//!
//! # Pipeline
//!
//! A score submission flows through four steps, all inside one transaction:
//!
//! 1. Insert the immutable score row
//! 2. Update the (user, game) progress summary
//! 3. Upsert the four period leaderboard rows plus the `overall` aggregate
//! 4. Evaluate achievement rules and append anything newly earned
//!
//! The response carries the stored score and the achievements that fired.
//!
//!
//!
//! # Notes
//!
//! ## SQLite
//! User counts here are small (a single faculty's students), so an embedded
//! store behind one connection is enough. Counter updates go through
//! `ON CONFLICT DO UPDATE` upserts so two concurrent submissions cannot lose
//! an increment, and the submission pipeline runs in a single transaction:
//! a 200 means everything persisted, a 500 means nothing did.
//!
//! ## Leaderboard periods
//! `daily`/`weekly`/`monthly` are partitioning labels only. No job resets
//! them at calendar boundaries, so they accumulate like `alltime` does.
use std::time::Duration;

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod games;
pub mod models;
pub mod routes;
pub mod state;

use routes::{
    achievements_handler, cases_handler, leaderboard_handler, progress_handler, puzzles_handler,
    stats_handler, submit_score_handler,
};
use state::State;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = State::new();

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .route("/games/score", post(submit_score_handler))
        .route("/games/leaderboard", get(leaderboard_handler))
        .route("/games/progress/{user_id}", get(progress_handler))
        .route("/games/stats", get(stats_handler))
        .route("/games/achievements", get(achievements_handler))
        .route("/games/puzzles", get(puzzles_handler))
        .route("/games/cases", get(cases_handler))
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
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
