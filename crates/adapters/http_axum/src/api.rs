//! HTTP handlers for the dispatch and scheduler trigger endpoints.

use axum::Router;
use axum::routing::post;

use grainhub_app::ports::{AuditSink, CommandChannel, DeviceRegistry, TimerRepository};

use crate::state::AppState;

pub mod check_timers;
pub mod run_manual;
pub mod simulate;

/// Routes consumed by the external operator UI.
pub fn routes<TR, DR, CC, AS>() -> Router<AppState<TR, DR, CC, AS>>
where
    TR: TimerRepository + Send + Sync + 'static,
    DR: DeviceRegistry + Send + Sync + 'static,
    CC: CommandChannel + Send + Sync + 'static,
    AS: AuditSink + Send + Sync + 'static,
{
    Router::new()
        .route("/run_manual", post(run_manual::handle))
        .route("/simulate_sensor", post(simulate::handle))
        .route("/check_timers", post(check_timers::handle))
}
