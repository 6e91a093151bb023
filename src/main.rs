//! # Interview Backend - Main Application Entry Point
//!
//! Actix-web server hosting the AI-assisted interview platform:
//!
//! ## Application Architecture:
//! - **config**: TOML + environment configuration
//! - **state**: shared application state, metrics, and interview stores
//! - **auth / candidates**: invite tokens and candidate profiles
//! - **audio**: PCM transcoding between the browser and the realtime API
//! - **interview**: the two WebSocket channels, the realtime orchestrator,
//!   the audio/video rendezvous, and transcript/report plumbing
//! - **handlers / health / middleware**: the REST surface around it
//!
//! ## Surfaces:
//! - `GET  /api/v1/health`, `GET /api/v1/metrics`
//! - `GET  /api/v1/config`, `PUT /api/v1/config`
//! - `PATCH /api/v1/interview/schedule`
//! - `WS   /ws/interview/audio`, `WS /ws/interview/video`

mod audio;
mod auth;
mod candidates;
mod config;
mod error;
mod handlers;
mod health;
mod interview;
mod middleware;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. Loads and validates configuration
/// 2. Sets up structured logging
/// 3. Builds the shared application state
/// 4. Starts the HTTP server with middleware and routes
/// 5. Waits for a shutdown signal and stops the server gracefully
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting interview-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}, files in {}",
        config.server.host, config.server.port, config.storage.files_dir
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        // Browser clients connect from the interview frontend's origin
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api/v1")
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route(
                        "/interview/schedule",
                        web::patch().to(handlers::schedule_interviews),
                    ),
            )
            .service(
                web::scope("/ws/interview")
                    .route("/audio", web::get().to(interview::audio_ws::interview_audio))
                    .route("/video", web::get().to(interview::video_ws::interview_video)),
            )
            // Health check at root level for load balancer probes
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system.
///
/// `RUST_LOG` controls verbosity; without it the default keeps this crate
/// at debug and the framework at info.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM and SIGINT and flip the shutdown flag.
///
/// Graceful shutdown lets in-flight requests finish and gives live
/// interview sessions a chance to finalize their transcripts.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Resolve once the shutdown flag has been set.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
