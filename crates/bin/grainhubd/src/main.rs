//! # grainhubd — grainhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Construct application services, injecting ports via traits
//! - Spawn the periodic reconciliation task
//! - Build the axum router, bind to a TCP port, and serve
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use grainhub_adapter_http_axum::auth::TokenVerifier;
use grainhub_adapter_http_axum::state::AppState;
use grainhub_adapter_mqtt::MqttCommandChannel;
use grainhub_adapter_storage_sqlite_sqlx::{
    Config as DbConfig, SqliteAuditLog, SqliteDeviceRegistry, SqliteTimerRepository,
};
use grainhub_app::services::dispatcher::Dispatcher;
use grainhub_app::services::reconciler::Reconciler;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database.url.clone(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let timer_repo = SqliteTimerRepository::new(pool.clone());
    let registry = SqliteDeviceRegistry::new(pool.clone());
    let audit_log = SqliteAuditLog::new(pool);

    // Transport
    let channel = Arc::new(MqttCommandChannel::new(config.mqtt.clone()));

    // Services
    let reconciler = Arc::new(Reconciler::new(
        timer_repo,
        registry,
        Arc::clone(&channel),
        config.reconciler_config(),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&channel),
        audit_log,
        config.dispatcher_config()?,
    ));
    let verifier = Arc::new(TokenVerifier::new(config.auth.jwt_secret.clone()));

    // Background reconciliation
    if config.scheduler.enabled {
        let scheduler = Arc::clone(&reconciler);
        let period = Duration::from_secs(config.scheduler.interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = scheduler.run_cycle(grainhub_domain::time::now()).await {
                    // The next tick recomputes the same targets.
                    tracing::warn!(error = %err, "reconciliation cycle failed");
                }
            }
        });
    }

    // HTTP
    let state = AppState::from_arcs(reconciler, dispatcher, verifier);
    let app = grainhub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    tracing::info!(%bind_addr, "grainhubd listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown signal received");
    }
}
