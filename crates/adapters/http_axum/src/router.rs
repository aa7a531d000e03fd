//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// The dispatch endpoints live at the root (the paths are part of the
/// external caller contract). Includes a [`TraceLayer`] that logs each HTTP
/// request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<TR, DR, CC, AS>(state: AppState<TR, DR, CC, AS>) -> Router
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .merge(crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
